// パス: tests/repl_script.rs
// 役割: 実ファイルを使ったスクリプト読み込みと設定ファイルからのセッション構築を検証する
// 意図: バッチ実行で使う経路（FsIo・ReplConfig・ReplSession）を一通り通す
// 関連ファイル: src/repl/cmd.rs, src/config.rs, src/bin/kaleido.rs
use std::fs;
use std::io::Write;

use kaleido::config::{Engine, ReplConfig};
use kaleido::repl::{FsIo, LoadSummary, ReplSession};

fn write_script(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).unwrap();
    path
}

#[test]
/// スクリプトを読み込み、定義と式の結果が順に出力される。
fn loads_script_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(
        &dir,
        "fib.k",
        "# フィボナッチ\n\ndef fib(n)\n  if n < 3 then 1\n  else fib(n-1) + fib(n-2)\n\nfib(10)\n",
    );
    let config = ReplConfig {
        engine: Engine::Interp,
        ..ReplConfig::default()
    };
    let mut session = ReplSession::from_config(&config);
    let (mut out, mut err) = (Vec::new(), Vec::new());
    let summary = session.load(&path, &FsIo, &mut out, &mut err).unwrap();
    assert_eq!(summary, LoadSummary { units: 2, errors: 0 });
    assert_eq!(String::from_utf8(out).unwrap(), "defined fib/1\n55\n");
    assert!(err.is_empty());
    assert!(session.driver().is_bound("__anon_expr0"));
}

#[test]
/// 設定ファイルの接頭辞と JIT エンジンでセッションを構築する。
fn session_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "engine": "jit", "anon_prefix": "it", "history": false }}"#).unwrap();
    let config = ReplConfig::load(file.path()).unwrap();
    assert_eq!(config.history_path(), None);

    let dir = tempfile::tempdir().unwrap();
    let path = write_script(&dir, "calc.k", "extern sqrt(x)\nsqrt(16) + 1\n");
    let mut session = ReplSession::from_config(&config);
    let (mut out, mut err) = (Vec::new(), Vec::new());
    session.load(&path, &FsIo, &mut out, &mut err).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "extern sqrt/1\n5\n");
    assert!(session.driver().is_bound("it0"));
}

#[test]
/// 読めないファイルと途中で終わるファイルはエラーとして数えられる。
fn missing_and_truncated_scripts_report_errors() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = ReplSession::from_config(&ReplConfig {
        engine: Engine::Interp,
        ..ReplConfig::default()
    });
    let (mut out, mut err) = (Vec::new(), Vec::new());

    let missing = dir.path().join("nope.k");
    let summary = session.load(&missing, &FsIo, &mut out, &mut err).unwrap();
    assert_eq!(summary.errors, 1);

    let truncated = write_script(&dir, "cut.k", "def f(x)\n  x +\n");
    let summary = session.load(&truncated, &FsIo, &mut out, &mut err).unwrap();
    assert_eq!(summary, LoadSummary { units: 0, errors: 1 });
    let stderr = String::from_utf8(err).unwrap();
    assert!(stderr.contains("ファイルを開けません"));
    assert!(stderr.contains("末尾で入力が完結していません"));

    // 途中の入力は破棄され、次の入力は新しい構文として扱われる
    assert_eq!(session.prompt(), kaleido::repl::cmd::PROMPT_READY);
    assert!(!session.driver().is_bound("f"));
}
