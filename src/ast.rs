// パス: src/ast.rs
// 役割: Kaleidoscope の構文木とトップレベル構文を定義する
// 意図: パーサ・抽出器・評価器で共有する中立的な表現を提供する
// 関連ファイル: src/parser/mod.rs, src/prototype.rs, src/evaluator.rs
//! 抽象構文木（AST）
//!
//! 設計ノート:
//! - 呼び出し可能定義の頭部（`PrototypeNode`）は識別子トークンの並びのまま保持する。
//!   名前と仮引数への分解は `prototype::extract` の責務。
//! - 匿名のトップレベル式は名前を持たない。名前付けは REPL ドライバが行う。

use std::fmt;

use crate::span::SourceSpan;

/// 位置付きの識別子。
#[derive(Clone, Debug, PartialEq)]
pub struct Ident {
    pub text: String,
    pub span: SourceSpan,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Number {
        value: f64,
        span: SourceSpan,
    },
    Variable {
        name: String,
        span: SourceSpan,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        callee: Ident,
        args: Vec<Expr>,
    },
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    For {
        var: Ident,
        start: Box<Expr>,
        end: Box<Expr>,
        step: Option<Box<Expr>>,
        body: Box<Expr>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
        }
    }

    /// 結合の強さ。大きいほど強く結合する。
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Lt | BinOp::Gt => 10,
            BinOp::Add | BinOp::Sub => 20,
            BinOp::Mul | BinOp::Div => 40,
        }
    }
}

/// `def` / `extern` の頭部。先頭が名前、以降が仮引数（宣言順）。
#[derive(Clone, Debug, PartialEq)]
pub struct PrototypeNode {
    pub idents: Vec<Ident>,
    pub span: SourceSpan,
}

/// 1 回の入力で完結するトップレベル構文。
#[derive(Clone, Debug, PartialEq)]
pub enum TopLevel {
    Definition { proto: PrototypeNode, body: Expr },
    Extern { proto: PrototypeNode },
    Expression { body: Expr },
}

impl TopLevel {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, TopLevel::Expression { .. })
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number { value, .. } => write!(f, "{}", value),
            Expr::Variable { name, .. } => write!(f, "{}", name),
            Expr::Binary { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expr::Call { callee, args } => {
                write!(f, "{}(", callee.text)?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ")")
            }
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => write!(f, "if {} then {} else {}", cond, then_branch, else_branch),
            Expr::For {
                var,
                start,
                end,
                step,
                body,
            } => {
                write!(f, "for {} = {}, {}", var.text, start, end)?;
                if let Some(s) = step {
                    write!(f, ", {}", s)?;
                }
                write!(f, " in {}", body)
            }
        }
    }
}

impl fmt::Display for PrototypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut it = self.idents.iter();
        if let Some(name) = it.next() {
            write!(f, "{}", name.text)?;
        }
        let params: Vec<&str> = it.map(|i| i.text.as_str()).collect();
        write!(f, "({})", params.join(" "))
    }
}

impl fmt::Display for TopLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopLevel::Definition { proto, body } => write!(f, "def {} {}", proto, body),
            TopLevel::Extern { proto } => write!(f, "extern {}", proto),
            TopLevel::Expression { body } => write!(f, "{}", body),
        }
    }
}
