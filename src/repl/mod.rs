// パス: src/repl/mod.rs
// 役割: REPL を構成するモジュール群のファサード
// 意図: 対話ループとドライバだけを公開し、表示や端末制御は内部に閉じる
// 関連ファイル: src/repl/cmd.rs, src/repl/driver.rs, src/bin/kaleido.rs
//! Kaleidoscope の対話環境。
//!
//! - `driver`: 行ごとの解析・命名・束縛
//! - `cmd`: メインループとコマンド解釈
//! - `line_editor`: rustyline による行入力
//! - `printer`: ユーザー向けの表示

pub mod cmd;
pub mod driver;
pub mod line_editor;
mod printer;

pub use cmd::{run_repl_with, FsIo, LineSource, LoadSummary, ReplIo, ReplSession};
pub use driver::{ReplDriver, ReplError, Step};
pub use line_editor::ReadResult;
