// パス: src/repl/line_editor.rs
// 役割: rustyline を包んだ履歴付きの行入力
// 意図: 端末制御をライブラリに任せ、REPL ループには 3 種類の読み取り結果だけを見せる
// 関連ファイル: src/repl/cmd.rs, src/config.rs
use std::fs;
use std::io;
use std::path::PathBuf;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

/// 行入力が返す 3 種類の結果。空行 `Line("")` と入力終端 `Eof` は区別する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadResult {
    Line(String),
    Eof,
    Interrupted,
}

/// 履歴付きの行エディタ。
pub struct LineEditor {
    editor: DefaultEditor,
    history_path: Option<PathBuf>,
}

impl LineEditor {
    /// エディタを構築し、履歴ファイルがあれば読み込む。
    pub fn new(history_path: Option<PathBuf>) -> rustyline::Result<Self> {
        let mut editor = DefaultEditor::new()?;
        if let Some(path) = &history_path {
            // 初回起動時はファイルが無いので失敗は無視する
            if let Err(err) = editor.load_history(path) {
                debug!(path = %path.display(), %err, "history not loaded");
            }
        }
        Ok(Self {
            editor,
            history_path,
        })
    }

    pub fn read_line(&mut self, prompt: &str) -> io::Result<ReadResult> {
        classify(self.editor.readline(prompt))
    }

    /// 空行は履歴に残さない。
    pub fn add_history(&mut self, entry: &str) {
        if entry.trim().is_empty() {
            return;
        }
        let _ = self.editor.add_history_entry(entry);
    }

    pub fn save_history(&mut self) -> io::Result<()> {
        let Some(path) = &self.history_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        self.editor.save_history(path).map_err(into_io)
    }
}

fn classify(result: Result<String, ReadlineError>) -> io::Result<ReadResult> {
    match result {
        Ok(line) => Ok(ReadResult::Line(line)),
        Err(ReadlineError::Interrupted) => Ok(ReadResult::Interrupted),
        Err(ReadlineError::Eof) => Ok(ReadResult::Eof),
        Err(err) => Err(into_io(err)),
    }
}

fn into_io(err: ReadlineError) -> io::Error {
    match err {
        ReadlineError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::Other, other.to_string()),
    }
}
