// パス: src/span.rs
// 役割: 入力テキスト上の位置範囲を表す不変値を定義する
// 意図: 字句解析・構文解析・プロトタイプ抽出で同じ位置表現を共有する
// 関連ファイル: src/lexer.rs, src/prototype.rs, src/errors.rs
//! ソース位置（スパン）
//!
//! - 行・列はいずれも 1 始まり。終端は排他的（最後の文字の次の桁）。
//! - バイトオフセットも併せて保持し、スニペット切り出しに利用する。

use std::fmt;

use serde::Serialize;

/// 入力中の開始位置から終了位置までを表す不変のスパン。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl SourceSpan {
    pub fn new(
        start: usize,
        end: usize,
        (start_line, start_col): (usize, usize),
        (end_line, end_col): (usize, usize),
    ) -> Self {
        Self {
            start,
            end,
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// 単一行上の範囲を簡便に構築する（テストや合成ノード向け）。
    pub fn on_line(line: usize, start_col: usize, end_col: usize) -> Self {
        Self {
            start: 0,
            end: 0,
            start_line: line,
            start_col,
            end_line: line,
            end_col,
        }
    }

    /// 2 つのスパンを覆う最小のスパンを返す。
    pub fn to(self, other: SourceSpan) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            start_line: self.start_line,
            start_col: self.start_col,
            end_line: other.end_line,
            end_col: other.end_col,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start_line == self.end_line {
            write!(f, "{}:{}-{}", self.start_line, self.start_col, self.end_col)
        } else {
            write!(
                f,
                "{}:{}-{}:{}",
                self.start_line, self.start_col, self.end_line, self.end_col
            )
        }
    }
}
