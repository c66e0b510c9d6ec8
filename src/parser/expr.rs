// パス: src/parser/expr.rs
// 役割: 式（二項演算・呼び出し・if・for）の解析を担う
// 意図: 優先順位法による中置演算の解析を専用モジュールに切り分ける
// 関連ファイル: src/parser/program.rs, src/parser/mod.rs, src/ast.rs

use super::*;

/// 解析済みの式とその式木の高さ。
struct Node {
    expr: Expr,
    height: usize,
}

impl Parser {
    pub(super) fn parse_expression(&mut self) -> PResult<Expr> {
        Ok(self.expression()?.expr)
    }

    fn expression(&mut self) -> PResult<Node> {
        if self.nesting >= MAX_EXPR_DEPTH {
            return Err(self.too_deep());
        }
        self.nesting += 1;
        let result = self
            .parse_primary()
            .and_then(|lhs| self.parse_binop_rhs(0, lhs));
        self.nesting -= 1;
        result
    }

    /// 高さを検査してから式を確定する。
    fn node(&self, expr: Expr, height: usize) -> PResult<Node> {
        if height > MAX_EXPR_DEPTH {
            return Err(self.too_deep());
        }
        Ok(Node { expr, height })
    }

    /// `min_prec` 以上の演算子を左結合で畳み込む。
    fn parse_binop_rhs(&mut self, min_prec: u8, mut lhs: Node) -> PResult<Node> {
        loop {
            let Some(op) = binop_of(self.peek_kind()) else {
                return Ok(lhs);
            };
            if op.precedence() < min_prec {
                return Ok(lhs);
            }
            self.pop_any();
            let mut rhs = self.parse_primary()?;
            if let Some(next) = binop_of(self.peek_kind()) {
                if next.precedence() > op.precedence() {
                    rhs = self.parse_binop_rhs(op.precedence() + 1, rhs)?;
                }
            }
            let height = lhs.height.max(rhs.height) + 1;
            let expr = Expr::Binary {
                op,
                left: Box::new(lhs.expr),
                right: Box::new(rhs.expr),
            };
            lhs = self.node(expr, height)?;
        }
    }

    fn parse_primary(&mut self) -> PResult<Node> {
        match self.peek_kind() {
            TokenKind::NUMBER => self.parse_number(),
            TokenKind::IDENT => self.parse_identifier(),
            TokenKind::LPAREN => {
                self.pop_any();
                let e = self.expression()?;
                self.pop(TokenKind::RPAREN)?;
                Ok(e)
            }
            TokenKind::IF => self.parse_if(),
            TokenKind::FOR => self.parse_for(),
            _ => Err(self.unexpected("式")),
        }
    }

    fn parse_number(&mut self) -> PResult<Node> {
        let t = self.pop(TokenKind::NUMBER)?;
        let value = t.value.parse::<f64>().map_err(|e| {
            ParseError::at("PAR020", format!("数値リテラルが不正です: {}", e), t.span)
        })?;
        self.node(
            Expr::Number {
                value,
                span: t.span,
            },
            1,
        )
    }

    fn parse_identifier(&mut self) -> PResult<Node> {
        let t = self.pop(TokenKind::IDENT)?;
        if self.accept(TokenKind::LPAREN).is_none() {
            return self.node(
                Expr::Variable {
                    name: t.value,
                    span: t.span,
                },
                1,
            );
        }
        let mut args = Vec::new();
        let mut height = 0;
        if self.accept(TokenKind::RPAREN).is_none() {
            loop {
                let arg = self.expression()?;
                height = height.max(arg.height);
                args.push(arg.expr);
                if self.accept(TokenKind::RPAREN).is_some() {
                    break;
                }
                if self.accept(TokenKind::COMMA).is_none() {
                    return Err(self.unexpected("',' または ')'"));
                }
            }
        }
        self.node(
            Expr::Call {
                callee: ident_from_token(t),
                args,
            },
            height + 1,
        )
    }

    fn parse_if(&mut self) -> PResult<Node> {
        self.pop(TokenKind::IF)?;
        let cond = self.expression()?;
        self.pop(TokenKind::THEN)?;
        let then_branch = self.expression()?;
        self.pop(TokenKind::ELSE)?;
        let else_branch = self.expression()?;
        let height = cond
            .height
            .max(then_branch.height)
            .max(else_branch.height);
        self.node(
            Expr::If {
                cond: Box::new(cond.expr),
                then_branch: Box::new(then_branch.expr),
                else_branch: Box::new(else_branch.expr),
            },
            height + 1,
        )
    }

    /// `for i = start, end [, step] in body`
    fn parse_for(&mut self) -> PResult<Node> {
        self.pop(TokenKind::FOR)?;
        let var = ident_from_token(self.pop(TokenKind::IDENT)?);
        self.pop(TokenKind::EQUAL)?;
        let start = self.expression()?;
        self.pop(TokenKind::COMMA)?;
        let end = self.expression()?;
        let step = if self.accept(TokenKind::COMMA).is_some() {
            Some(self.expression()?)
        } else {
            None
        };
        self.pop(TokenKind::IN)?;
        let body = self.expression()?;
        let height = [&start, &end, &body]
            .iter()
            .map(|n| n.height)
            .chain(step.as_ref().map(|n| n.height))
            .max()
            .unwrap_or(0);
        self.node(
            Expr::For {
                var,
                start: Box::new(start.expr),
                end: Box::new(end.expr),
                step: step.map(|n| Box::new(n.expr)),
                body: Box::new(body.expr),
            },
            height + 1,
        )
    }
}
