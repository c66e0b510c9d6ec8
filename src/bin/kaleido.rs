// パス: src/bin/kaleido.rs
// 役割: コマンドライン引数と設定を解決して REPL を起動するエントリポイント
// 意図: スクリプト実行と対話実行を 1 つの実行ファイルで提供する
// 関連ファイル: src/repl/cmd.rs, src/config.rs, src/lib.rs
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use kaleido::config::{Engine, ReplConfig};
use kaleido::repl::line_editor::LineEditor;
use kaleido::repl::{run_repl_with, FsIo, ReplSession};

/// Kaleidoscope の対話環境。
#[derive(Debug, Parser)]
#[command(name = "kaleido-repl", version)]
struct Cli {
    /// 実行エンジン
    #[arg(long, value_enum)]
    engine: Option<Engine>,
    /// 匿名式に付ける名前の接頭辞
    #[arg(long)]
    anon_prefix: Option<String>,
    /// 設定ファイル (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
    /// 履歴を読み書きしない
    #[arg(long)]
    no_history: bool,
    /// スクリプトを実行したら対話に入らず終了する
    #[arg(long)]
    batch: bool,
    /// 対話の前に読み込むスクリプト
    files: Vec<PathBuf>,
}

impl Cli {
    fn resolve(&self) -> Result<ReplConfig, kaleido::config::ConfigError> {
        let mut config = match &self.config {
            Some(path) => ReplConfig::load(path)?,
            None => ReplConfig::default(),
        };
        if let Some(engine) = self.engine {
            config.engine = engine;
        }
        if let Some(prefix) = &self.anon_prefix {
            config.anon_prefix = prefix.clone();
        }
        if self.no_history {
            config.history = false;
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .try_init();

    let cli = Cli::parse();
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    };
    match run(&cli, &config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("REPL 実行中にエラーが発生しました: {}", err);
            ExitCode::FAILURE
        }
    }
}

/// スクリプトと対話を順に実行する。バッチ実行でエラーがあれば `false`。
fn run(cli: &Cli, config: &ReplConfig) -> io::Result<bool> {
    let mut session = ReplSession::from_config(config);
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();

    let mut errors = 0;
    for file in &cli.files {
        errors += session.load(file, &FsIo, &mut stdout, &mut stderr)?.errors;
    }
    if cli.batch {
        return Ok(errors == 0);
    }

    let mut editor = LineEditor::new(config.history_path())
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    run_repl_with(&mut editor, &FsIo, &mut session, &mut stdout, &mut stderr)?;
    Ok(true)
}
