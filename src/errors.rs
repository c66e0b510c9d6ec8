// パス: src/errors.rs
// 役割: 利用者向け診断とコンポーネント間の契約違反を表すエラー型を定義する
// 意図: 構文・評価エラーは共通フォーマットで表示し、内部エラーは明確に区別する
// 関連ファイル: src/parser/mod.rs, src/prototype.rs, src/repl/driver.rs
//! エラー型の定義（共通フォーマット: \[CODE\] メッセージ @line:col）。

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};

use thiserror::Error;

use crate::span::SourceSpan;

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub msg: String,
    pub span: Option<SourceSpan>,
    pub snippet: Option<String>, // エラー行のスニペット（任意）
}

impl ErrorInfo {
    pub fn new(code: &'static str, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            span: None,
            snippet: None,
        }
    }
    pub fn at(code: &'static str, msg: impl Into<String>, span: SourceSpan) -> Self {
        Self {
            code,
            msg: msg.into(),
            span: Some(span),
            snippet: None,
        }
    }
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // 1行目: ヘッダ
        match self.span {
            Some(sp) => write!(
                f,
                "[{}] {} @line={},col={}",
                self.code, self.msg, sp.start_line, sp.start_col
            )?,
            None => write!(f, "[{}] {}", self.code, self.msg)?,
        }
        // 2行目以降: スニペットとキャレット（スパン幅ぶん）
        if let (Some(s), Some(sp)) = (&self.snippet, self.span) {
            let pad = " ".repeat(sp.start_col.saturating_sub(1));
            let width = if sp.start_line == sp.end_line {
                sp.end_col.saturating_sub(sp.start_col).max(1)
            } else {
                1
            };
            write!(f, "\n{}\n{}{}", s, pad, "^".repeat(width))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexerError(pub ErrorInfo);
impl LexerError {
    pub fn at(code: &'static str, msg: impl Into<String>, span: SourceSpan) -> Self {
        Self(ErrorInfo::at(code, msg, span))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError(pub ErrorInfo);
impl ParseError {
    pub fn new(code: &'static str, msg: impl Into<String>) -> Self {
        Self(ErrorInfo::new(code, msg))
    }
    pub fn at(code: &'static str, msg: impl Into<String>, span: SourceSpan) -> Self {
        Self(ErrorInfo::at(code, msg, span))
    }
    pub fn code(&self) -> &'static str {
        self.0.code
    }
    pub fn span(&self) -> Option<SourceSpan> {
        self.0.span
    }
}

impl From<LexerError> for ParseError {
    fn from(err: LexerError) -> Self {
        Self(err.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalError(pub ErrorInfo);
impl EvalError {
    pub fn new(code: &'static str, msg: impl Into<String>) -> Self {
        Self(ErrorInfo::new(code, msg))
    }
    pub fn code(&self) -> &'static str {
        self.0.code
    }
}

impl Display for LexerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}
impl StdError for LexerError {}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}
impl StdError for ParseError {}

impl Display for EvalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}
impl StdError for EvalError {}

/// コンポーネント間の契約違反。利用者の入力ミスではなく実装上の欠陥を示す。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("プロトタイプに識別子が 1 つもありません (文法契約違反)")]
    EmptyPrototype,
    #[error("未消費の構文 ({state}) が残ったまま次の行が投入されました")]
    UnconsumedConstruct { state: &'static str },
    #[error("匿名名の系列が枯渇しました (prefix: {prefix})")]
    NamesExhausted { prefix: String },
}
