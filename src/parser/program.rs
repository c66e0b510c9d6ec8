// パス: src/parser/program.rs
// 役割: トップレベル構文（def / extern / 式）とプロトタイプの解析を担う
// 意図: 1 バッファ = 1 構文という REPL の前提をパーサ側で保証する
// 関連ファイル: src/parser/mod.rs, src/parser/expr.rs, src/prototype.rs

use super::*;

impl Parser {
    /// バッファ全体を 1 つのトップレベル構文として解析する。
    ///
    /// 末尾の `;` は 1 つだけ許容し、その後に残るトークンは構文エラーとする。
    pub(super) fn parse_top_level(&mut self) -> PResult<TopLevel> {
        while self.accept(TokenKind::SEMI).is_some() {}
        let top = match self.peek_kind() {
            TokenKind::EOF => return Err(Failure::Incomplete),
            TokenKind::DEF => self.parse_definition()?,
            TokenKind::EXTERN => self.parse_extern()?,
            _ => TopLevel::Expression {
                body: self.parse_expression()?,
            },
        };
        self.accept(TokenKind::SEMI);
        if self.peek_kind() != TokenKind::EOF {
            return Err(self.trailing_tokens());
        }
        Ok(top)
    }

    pub(super) fn trailing_tokens(&self) -> Failure {
        let t = self.peek();
        Failure::Syntax(ParseError::at(
            "PAR090",
            format!("構文の後に余分なトークンが残っています: {}", t.value),
            t.span,
        ))
    }

    fn parse_definition(&mut self) -> PResult<TopLevel> {
        self.pop(TokenKind::DEF)?;
        let proto = self.parse_prototype()?;
        let body = self.parse_expression()?;
        Ok(TopLevel::Definition { proto, body })
    }

    fn parse_extern(&mut self) -> PResult<TopLevel> {
        self.pop(TokenKind::EXTERN)?;
        let proto = self.parse_prototype()?;
        Ok(TopLevel::Extern { proto })
    }

    /// `name(a b c)` を識別子の並びとして読む。仮引数は空白区切り。
    fn parse_prototype(&mut self) -> PResult<PrototypeNode> {
        let name = self.pop(TokenKind::IDENT)?;
        let mut idents = vec![ident_from_token(name)];
        self.pop(TokenKind::LPAREN)?;
        while let Some(param) = self.accept(TokenKind::IDENT) {
            idents.push(ident_from_token(param));
        }
        self.pop(TokenKind::RPAREN)?;
        Ok(proto_node(idents))
    }
}
