// パス: src/repl/cmd.rs
// 役割: REPL のメインループ、コマンド解釈、スクリプト読み込み
// 意図: 準備状態の通知でプロンプトを切り替えつつ、入力行をドライバへ橋渡しする
// 関連ファイル: src/repl/driver.rs, src/repl/line_editor.rs, src/repl/printer.rs
//! Kaleidoscope REPL におけるコマンド処理と入出力を担当するモジュール。
//!
//! コマンド（`:` で始まる行）は新しいプロンプトでのみ解釈する。新しいプロンプトでの
//! 空行とコメント行は読み飛ばし、入力途中の行はすべてそのままドライバへ渡す。

use std::io::{self, Write};
use std::path::Path;
use std::sync::mpsc::{self, Receiver};

use tracing::{info, warn};

use crate::codegen::jit::JitEvaluator;
use crate::config::{Engine, ReplConfig};
use crate::evaluator::{Evaluator, Interpreter};
use crate::readiness::{ChannelObserver, ReadinessEvent};

use super::driver::{ReplDriver, Step};
use super::line_editor::{LineEditor, ReadResult};
use super::printer::{render_help, write_evaluation, write_prototypes, BANNER};

pub const PROMPT_READY: &str = "ready> ";
pub const PROMPT_CONTINUE: &str = "...> ";

/// 行単位の入力元。
pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadResult>;
    fn add_history(&mut self, _entry: &str) {}
    fn save_history(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LineSource for LineEditor {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadResult> {
        LineEditor::read_line(self, prompt)
    }

    fn add_history(&mut self, entry: &str) {
        LineEditor::add_history(self, entry);
    }

    fn save_history(&mut self) -> io::Result<()> {
        LineEditor::save_history(self)
    }
}

/// `:load` などで使うファイル読み込みの抽象。
pub trait ReplIo {
    fn read_to_string(&self, path: &Path) -> Result<String, String>;
}

/// 実際のファイルシステムにアクセスする標準実装。
pub struct FsIo;
impl ReplIo for FsIo {
    fn read_to_string(&self, path: &Path) -> Result<String, String> {
        std::fs::read_to_string(path).map_err(|e| {
            format!(
                "エラー: ファイルを開けません: {}: {}",
                path.display(),
                e
            )
        })
    }
}

/// REPL が解釈できるコマンド。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReplCommand {
    Help,
    Quit,
    Defs,
    Proto(String),
    Load(String),
    Invalid(String),
}

/// `:` で始まる行をコマンドとして解析する。それ以外は `None`。
pub(crate) fn parse_repl_command(input: &str) -> Option<ReplCommand> {
    let s = input.trim();
    if !s.starts_with(':') {
        return None;
    }
    let (head, rest) = match s.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (s, ""),
    };
    let cmd = match (head, rest.is_empty()) {
        (":help" | ":h", true) => ReplCommand::Help,
        (":quit" | ":q", true) => ReplCommand::Quit,
        (":defs", true) => ReplCommand::Defs,
        (":proto", false) => ReplCommand::Proto(rest.to_string()),
        (":load", false) => ReplCommand::Load(rest.to_string()),
        _ => ReplCommand::Invalid(s.to_string()),
    };
    Some(cmd)
}

/// 新しいプロンプトで読み飛ばす行（空行とコメントだけの行）。
fn is_filler(line: &str) -> bool {
    let t = line.trim();
    t.is_empty() || t.starts_with('#')
}

/// スクリプト読み込みの集計。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub units: usize,
    pub errors: usize,
}

/// ドライバと準備状態の受信側をまとめた対話セッション。
pub struct ReplSession<E: Evaluator> {
    driver: ReplDriver<E>,
    events: Receiver<ReadinessEvent>,
    partial: bool,
}

/// 設定に応じた評価器を用意する。JIT が初期化できない環境ではインタプリタに切り替える。
pub fn build_evaluator(engine: Engine) -> Box<dyn Evaluator> {
    match engine {
        Engine::Interp => Box::new(Interpreter::new()),
        Engine::Jit => match JitEvaluator::new() {
            Ok(jit) => Box::new(jit),
            Err(err) => {
                warn!(%err, "jit unavailable; falling back to interpreter");
                Box::new(Interpreter::new())
            }
        },
    }
}

impl ReplSession<Box<dyn Evaluator>> {
    pub fn from_config(config: &ReplConfig) -> Self {
        Self::new(build_evaluator(config.engine), &config.anon_prefix)
    }
}

impl<E: Evaluator> ReplSession<E> {
    pub fn new(evaluator: E, anon_prefix: &str) -> Self {
        let (tx, rx) = mpsc::channel();
        let mut driver = ReplDriver::new(evaluator, anon_prefix);
        driver.subscribe(ChannelObserver(tx));
        Self {
            driver,
            events: rx,
            partial: false,
        }
    }

    pub fn driver(&self) -> &ReplDriver<E> {
        &self.driver
    }

    /// 受信済みの通知を反映し、入力途中かどうかを返す。
    fn sync(&mut self) -> bool {
        for event in self.events.try_iter() {
            self.partial = event.is_partial;
        }
        self.partial
    }

    pub fn prompt(&mut self) -> &'static str {
        if self.sync() {
            PROMPT_CONTINUE
        } else {
            PROMPT_READY
        }
    }

    pub fn reset(&mut self) {
        self.driver.reset();
        self.sync();
    }

    /// 1 行をドライバへ渡し、結果を表示する。エラーが出たら `false`。
    pub fn feed<W: Write, R: Write>(
        &mut self,
        line: &str,
        out: &mut W,
        err: &mut R,
    ) -> io::Result<bool> {
        match self.driver.process_line(line) {
            Ok(Step::Pending) => Ok(true),
            Ok(Step::Done(ev)) => {
                write_evaluation(out, &ev)?;
                Ok(true)
            }
            Err(e) => {
                writeln!(err, "{}", e)?;
                Ok(false)
            }
        }
    }

    /// ファイルを 1 行ずつドライバへ流す。末尾で未完の入力は破棄する。
    pub fn load<I: ReplIo, W: Write, R: Write>(
        &mut self,
        path: &Path,
        io: &I,
        out: &mut W,
        err: &mut R,
    ) -> io::Result<LoadSummary> {
        let mut summary = LoadSummary::default();
        let text = match io.read_to_string(path) {
            Ok(text) => text,
            Err(msg) => {
                writeln!(err, "{}", msg)?;
                summary.errors += 1;
                return Ok(summary);
            }
        };
        for line in text.lines() {
            if !self.sync() && is_filler(line) {
                continue;
            }
            if self.feed(line, out, err)? {
                if !self.sync() {
                    summary.units += 1;
                }
            } else {
                summary.errors += 1;
            }
        }
        if self.sync() {
            writeln!(
                err,
                "エラー: {} の末尾で入力が完結していません",
                path.display()
            )?;
            summary.errors += 1;
            self.reset();
        }
        info!(path = %path.display(), units = summary.units, errors = summary.errors, "script loaded");
        Ok(summary)
    }

    fn execute<I: ReplIo, W: Write, R: Write>(
        &mut self,
        cmd: ReplCommand,
        io: &I,
        out: &mut W,
        err: &mut R,
    ) -> io::Result<()> {
        match cmd {
            ReplCommand::Help => render_help(out),
            ReplCommand::Defs => write_prototypes(out, self.driver.prototypes()),
            ReplCommand::Proto(name) => match self.driver.prototype(&name) {
                Some(proto) => match serde_json::to_string_pretty(proto) {
                    Ok(json) => writeln!(out, "{}", json),
                    Err(e) => writeln!(err, "エラー: JSON に変換できません: {}", e),
                },
                None => writeln!(err, "エラー: 未定義です: {}", name),
            },
            ReplCommand::Load(path) => {
                let summary = self.load(Path::new(&path), io, out, err)?;
                writeln!(
                    out,
                    "loaded {} ({} units, {} errors)",
                    path, summary.units, summary.errors
                )
            }
            ReplCommand::Invalid(s) => writeln!(err, "エラー: コマンド形式が不正です: {}", s),
            ReplCommand::Quit => Ok(()),
        }
    }
}

/// 対話ループ。`:quit` または入力終端で終わり、最後に履歴を保存する。
pub fn run_repl_with<S, I, E, W, R>(
    editor: &mut S,
    file_io: &I,
    session: &mut ReplSession<E>,
    out: &mut W,
    err: &mut R,
) -> io::Result<()>
where
    S: LineSource,
    I: ReplIo,
    E: Evaluator,
    W: Write,
    R: Write,
{
    writeln!(out, "{}", BANNER)?;
    loop {
        let prompt = session.prompt();
        match editor.read_line(prompt) {
            Ok(ReadResult::Line(line)) => {
                editor.add_history(&line);
                if prompt == PROMPT_READY {
                    if is_filler(&line) {
                        continue;
                    }
                    if let Some(cmd) = parse_repl_command(&line) {
                        if cmd == ReplCommand::Quit {
                            break;
                        }
                        session.execute(cmd, file_io, out, err)?;
                        continue;
                    }
                }
                session.feed(&line, out, err)?;
            }
            Ok(ReadResult::Interrupted) => session.reset(),
            Ok(ReadResult::Eof) => {
                if session.sync() {
                    writeln!(err, "入力途中で終端に達したため破棄しました")?;
                    session.reset();
                }
                writeln!(out)?;
                break;
            }
            Err(e) => {
                writeln!(err, "入力エラー: {}", e)?;
                break;
            }
        }
    }

    if let Err(e) = editor.save_history() {
        writeln!(err, "ヒストリーの保存に失敗しました: {}", e)?;
    }
    Ok(())
}
