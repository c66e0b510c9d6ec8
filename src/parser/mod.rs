// パス: src/parser/mod.rs
// 役割: トークン列からトップレベル構文を組み立てる再帰下降パーサのエントリポイント
// 意図: 「入力不足」と「構文誤り」を区別した解析結果を REPL へ返す
// 関連ファイル: src/parser/program.rs, src/parser/expr.rs, src/readiness.rs
//! 構文解析モジュール
//!
//! - 二項演算子は優先順位法（`< >` = 10, `+ -` = 20, `* /` = 40、すべて左結合）で解析する。
//! - 期待したトークンの位置に入力の終端（`EOF`）が来た場合は構文誤りではなく
//!   「入力不足」として報告する。以降に入力を足せば完成しうる接頭辞だからである。
//! - それ以外の不一致（完結後に残るトークンを含む）は `ParseError` になる。
//! - 式の入れ子と式木の高さは `MAX_EXPR_DEPTH` までに制限し、超えた時点で `PAR030` とする。
//!   追跡器は行ごとにバッファ全体を解析し直すため、深い入力でもスタックを使い切らないようにする。

use crate::ast::{BinOp, Expr, Ident, PrototypeNode, TopLevel};
use crate::errors::ParseError;
use crate::lexer::{lex, Token, TokenKind};

mod expr;
mod program;

/// 文法側が返す解析結果の 3 分類。
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Complete(TopLevel),
    Incomplete,
    SyntaxError(ParseError),
}

/// バッファ全体を 1 つのトップレベル構文として解析する文法の抽象。
///
/// 読み込み状態の追跡器はこの境界越しにのみ文法へ触れ、先読みを再実装しない。
pub trait Grammar {
    fn parse(&self, buffer: &str) -> ParseOutcome;
}

/// このクレートの字句解析器とパーサによる既定の文法実装。
#[derive(Debug, Clone, Copy, Default)]
pub struct KaleidoscopeGrammar;

impl Grammar for KaleidoscopeGrammar {
    fn parse(&self, buffer: &str) -> ParseOutcome {
        parse_top_level(buffer)
    }
}

/// 解析途中の失敗。`Incomplete` は入力終端に達したことだけを表す。
#[derive(Debug)]
pub(super) enum Failure {
    Incomplete,
    Syntax(ParseError),
}

impl From<ParseError> for Failure {
    fn from(err: ParseError) -> Self {
        Failure::Syntax(err)
    }
}

pub(super) type PResult<T> = Result<T, Failure>;

/// 式の入れ子の深さと式木の高さの上限。
pub const MAX_EXPR_DEPTH: usize = 256;

pub struct Parser {
    ts: Vec<Token>,
    i: usize,
    nesting: usize,
}

impl Parser {
    /// トークン列から新しいパーサインスタンスを構築する。末尾は `EOF` である必要がある。
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            ts: tokens,
            i: 0,
            nesting: 0,
        }
    }

    pub(super) fn peek(&self) -> &Token {
        // lex は必ず EOF を末尾に置くので、EOF を越えて進むことはない
        &self.ts[self.i.min(self.ts.len() - 1)]
    }

    pub(super) fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    pub(super) fn pop_any(&mut self) -> Token {
        let t = self.peek().clone();
        if t.kind != TokenKind::EOF {
            self.i += 1;
        }
        t
    }

    pub(super) fn pop(&mut self, kind: TokenKind) -> PResult<Token> {
        if self.peek_kind() == kind {
            return Ok(self.pop_any());
        }
        Err(self.unexpected(kind.describe()))
    }

    pub(super) fn accept(&mut self, kind: TokenKind) -> Option<Token> {
        if self.peek_kind() == kind {
            Some(self.pop_any())
        } else {
            None
        }
    }

    /// 現在のトークンが期待に合わないときの失敗を組み立てる。
    pub(super) fn unexpected(&self, expected: &str) -> Failure {
        let t = self.peek();
        if t.kind == TokenKind::EOF {
            return Failure::Incomplete;
        }
        Failure::Syntax(ParseError::at(
            "PAR001",
            format!(
                "{} を期待しましたが {} ({}) が現れました",
                expected,
                t.kind.describe(),
                t.value
            ),
            t.span,
        ))
    }

    /// 入れ子または式木の高さが上限を超えたときの失敗。入力を足しても直らない。
    pub(super) fn too_deep(&self) -> Failure {
        Failure::Syntax(ParseError::at(
            "PAR030",
            format!("式の入れ子が深すぎます (上限 {})", MAX_EXPR_DEPTH),
            self.peek().span,
        ))
    }
}

pub(super) fn ident_from_token(token: Token) -> Ident {
    Ident {
        text: token.value,
        span: token.span,
    }
}

/// バッファを 1 つのトップレベル構文として解析し、3 分類の結果を返す。
pub fn parse_top_level(src: &str) -> ParseOutcome {
    let ts = match lex(src) {
        Ok(ts) => ts,
        Err(e) => return ParseOutcome::SyntaxError(e.into()),
    };
    match Parser::new(ts).parse_top_level() {
        Ok(top) => ParseOutcome::Complete(top),
        Err(Failure::Incomplete) => ParseOutcome::Incomplete,
        Err(Failure::Syntax(e)) => ParseOutcome::SyntaxError(attach_snippet(e, src)),
    }
}

/// 単独の式を解析する（テストやツール向け）。入力不足もエラーとして扱う。
pub fn parse_expr(src: &str) -> Result<Expr, ParseError> {
    let ts = lex(src)?;
    let mut p = Parser::new(ts);
    let e = p.parse_expression().and_then(|e| {
        if p.peek_kind() == TokenKind::EOF {
            Ok(e)
        } else {
            Err(p.trailing_tokens())
        }
    });
    match e {
        Ok(e) => Ok(e),
        Err(Failure::Incomplete) => Err(ParseError::new("PAR002", "式が途中で終わっています")),
        Err(Failure::Syntax(err)) => Err(attach_snippet(err, src)),
    }
}

/// エラー位置の行テキストをスニペットとして添付する。
fn attach_snippet(err: ParseError, src: &str) -> ParseError {
    if err.0.snippet.is_some() {
        return err;
    }
    let Some(span) = err.0.span else {
        return err;
    };
    let line = src
        .split('\n')
        .nth(span.start_line.saturating_sub(1))
        .unwrap_or("");
    ParseError(err.0.with_snippet(line.trim_end_matches('\r')))
}

pub(super) fn binop_of(kind: TokenKind) -> Option<BinOp> {
    match kind {
        TokenKind::PLUS => Some(BinOp::Add),
        TokenKind::MINUS => Some(BinOp::Sub),
        TokenKind::STAR => Some(BinOp::Mul),
        TokenKind::SLASH => Some(BinOp::Div),
        TokenKind::LT => Some(BinOp::Lt),
        TokenKind::GT => Some(BinOp::Gt),
        _ => None,
    }
}

pub(super) fn proto_node(idents: Vec<Ident>) -> PrototypeNode {
    let span = match (idents.first(), idents.last()) {
        (Some(first), Some(last)) => first.span.to(last.span),
        _ => crate::span::SourceSpan::on_line(1, 1, 1),
    };
    PrototypeNode { idents, span }
}
