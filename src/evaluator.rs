// パス: src/evaluator.rs
// 役割: 名前付きの入力単位を束縛・評価する境界と木構造インタプリタを提供する
// 意図: REPL ドライバを実行エンジン（インタプリタ / JIT）から切り離す
// 関連ファイル: src/codegen/jit.rs, src/primitives.rs, src/repl/driver.rs
//! 評価器（evaluator）
//!
//! 要点:
//! - 値はすべて `f64`。`<` / `>` は真なら `1.0`、偽なら `0.0`。
//! - `if` は条件が `0.0` でなければ then 節。
//! - `for i = s, e, step in body` は body → step → e（現在の i で評価）の順に評価し、
//!   i を step だけ進め、e が `0.0` になったら抜ける。ループ式の値は `0.0`。
//! - 未定義の関数・変数の参照とアリティ不一致は束縛時に検出する（エンジン共通）。
//! - インタプリタは評価の入れ子（部分式と呼び出し）を `MAX_EVAL_DEPTH` 段までに制限する。
//! - 匿名式は評価に成功したときだけ名前空間へ登録する。

use std::collections::HashMap;

use crate::ast::{BinOp, Expr};
use crate::errors::EvalError;
use crate::primitives::{self, Primitive};
use crate::prototype::PrototypeDescriptor;

/// 部分式の評価と関数呼び出しを合わせた入れ子の上限。
const MAX_EVAL_DEPTH: usize = 512;

/// 束縛対象の本体。
#[derive(Clone, Debug, PartialEq)]
pub enum UnitBody {
    Function(Expr),
    Extern,
}

/// 名前が確定した入力単位。匿名式は合成名と引数なしのプロトタイプを持つ。
#[derive(Clone, Debug, PartialEq)]
pub struct NamedUnit {
    pub prototype: PrototypeDescriptor,
    pub body: UnitBody,
    pub anonymous: bool,
}

impl NamedUnit {
    pub fn name(&self) -> &str {
        &self.prototype.name
    }
}

/// 評価結果。
#[derive(Clone, Debug, PartialEq)]
pub enum Evaluation {
    Defined { name: String, arity: usize },
    Declared { name: String, arity: usize },
    Value { name: String, value: f64 },
}

/// 名前付き単位をセッションへ束縛し、必要なら評価する実行エンジン。
pub trait Evaluator {
    fn bind_and_evaluate(&mut self, unit: &NamedUnit) -> Result<Evaluation, EvalError>;
}

impl<E: Evaluator + ?Sized> Evaluator for Box<E> {
    fn bind_and_evaluate(&mut self, unit: &NamedUnit) -> Result<Evaluation, EvalError> {
        (**self).bind_and_evaluate(unit)
    }
}

/// 本体が参照する関数・変数がすべて解決できるかを検証する。
///
/// `arity_of` はセッションに束縛済みの呼び出し可能な名前のアリティを返す。
/// 定義中の関数自身は再帰呼び出しのために解決可能とみなす。
pub fn check_references(
    unit: &NamedUnit,
    arity_of: &dyn Fn(&str) -> Option<usize>,
) -> Result<(), EvalError> {
    let UnitBody::Function(body) = &unit.body else {
        return Ok(());
    };
    let mut scope: Vec<&str> = unit.prototype.param_names().collect();
    check_expr(body, &unit.prototype, arity_of, &mut scope)
}

fn check_expr<'a>(
    expr: &'a Expr,
    proto: &PrototypeDescriptor,
    arity_of: &dyn Fn(&str) -> Option<usize>,
    scope: &mut Vec<&'a str>,
) -> Result<(), EvalError> {
    match expr {
        Expr::Number { .. } => Ok(()),
        Expr::Variable { name, span } => {
            if scope.iter().any(|s| *s == name.as_str()) {
                Ok(())
            } else {
                Err(EvalError(crate::errors::ErrorInfo::at(
                    "EVAL001",
                    format!("未束縛の変数です: {}", name),
                    *span,
                )))
            }
        }
        Expr::Binary { left, right, .. } => {
            check_expr(left, proto, arity_of, scope)?;
            check_expr(right, proto, arity_of, scope)
        }
        Expr::Call { callee, args } => {
            let arity = if callee.text == proto.name {
                Some(proto.arity())
            } else {
                arity_of(&callee.text)
            };
            let Some(arity) = arity else {
                return Err(EvalError(crate::errors::ErrorInfo::at(
                    "EVAL002",
                    format!("未定義の関数です: {}", callee.text),
                    callee.span,
                )));
            };
            if arity != args.len() {
                return Err(EvalError(crate::errors::ErrorInfo::at(
                    "EVAL003",
                    format!(
                        "{} は {} 個の引数を取りますが {} 個渡されました",
                        callee.text,
                        arity,
                        args.len()
                    ),
                    callee.span,
                )));
            }
            args.iter()
                .try_for_each(|a| check_expr(a, proto, arity_of, scope))
        }
        Expr::If {
            cond,
            then_branch,
            else_branch,
        } => {
            check_expr(cond, proto, arity_of, scope)?;
            check_expr(then_branch, proto, arity_of, scope)?;
            check_expr(else_branch, proto, arity_of, scope)
        }
        Expr::For {
            var,
            start,
            end,
            step,
            body,
        } => {
            check_expr(start, proto, arity_of, scope)?;
            scope.push(&var.text);
            let result = check_expr(end, proto, arity_of, scope)
                .and_then(|_| match step {
                    Some(s) => check_expr(s, proto, arity_of, scope),
                    None => Ok(()),
                })
                .and_then(|_| check_expr(body, proto, arity_of, scope));
            scope.pop();
            result
        }
    }
}

/// 外部宣言をプリミティブ一覧に照合する。
pub fn resolve_extern(proto: &PrototypeDescriptor) -> Result<Primitive, EvalError> {
    let prim = primitives::lookup(&proto.name).ok_or_else(|| {
        EvalError::new(
            "EVAL020",
            format!("外部関数 {} は利用できません", proto.name),
        )
    })?;
    if prim.arity() != proto.arity() {
        return Err(EvalError::new(
            "EVAL021",
            format!(
                "外部関数 {} のアリティは {} です（宣言: {}）",
                proto.name,
                prim.arity(),
                proto.arity()
            ),
        ));
    }
    Ok(prim)
}

/// 同じ名前への再束縛を拒否する。
pub fn already_bound(name: &str) -> EvalError {
    EvalError::new("EVAL010", format!("{} は既に定義されています", name))
}

#[derive(Clone, Debug)]
enum Callable {
    User { params: Vec<String>, body: Expr },
    Native(Primitive),
}

/// 木構造を直接たどるインタプリタ。
#[derive(Debug, Default)]
pub struct Interpreter {
    callables: HashMap<String, Callable>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.callables.contains_key(name)
    }

    fn arity(&self, name: &str) -> Option<usize> {
        self.callables.get(name).map(|c| match c {
            Callable::User { params, .. } => params.len(),
            Callable::Native(p) => p.arity(),
        })
    }

    fn call(&self, name: &str, args: Vec<f64>, depth: usize) -> Result<f64, EvalError> {
        match self.callables.get(name) {
            Some(Callable::User { params, body }) => {
                let mut env: HashMap<String, f64> = params.iter().cloned().zip(args).collect();
                self.eval(body, &mut env, depth + 1)
            }
            Some(Callable::Native(p)) => p.call(&args).ok_or_else(|| {
                EvalError::new("EVAL003", format!("{} の引数の数が一致しません", name))
            }),
            None => Err(EvalError::new(
                "EVAL002",
                format!("未定義の関数です: {}", name),
            )),
        }
    }

    fn eval(
        &self,
        expr: &Expr,
        env: &mut HashMap<String, f64>,
        depth: usize,
    ) -> Result<f64, EvalError> {
        if depth > MAX_EVAL_DEPTH {
            return Err(EvalError::new(
                "EVAL030",
                format!("評価の入れ子が深すぎます (上限 {} 段)", MAX_EVAL_DEPTH),
            ));
        }
        let depth = depth + 1;
        match expr {
            Expr::Number { value, .. } => Ok(*value),
            Expr::Variable { name, .. } => env.get(name).copied().ok_or_else(|| {
                EvalError::new("EVAL001", format!("未束縛の変数です: {}", name))
            }),
            Expr::Binary { op, left, right } => {
                let l = self.eval(left, env, depth)?;
                let r = self.eval(right, env, depth)?;
                Ok(apply_binop(*op, l, r))
            }
            Expr::Call { callee, args } => {
                let values = args
                    .iter()
                    .map(|a| self.eval(a, env, depth))
                    .collect::<Result<Vec<f64>, EvalError>>()?;
                self.call(&callee.text, values, depth)
            }
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval(cond, env, depth)? != 0.0 {
                    self.eval(then_branch, env, depth)
                } else {
                    self.eval(else_branch, env, depth)
                }
            }
            Expr::For {
                var,
                start,
                end,
                step,
                body,
            } => {
                let start = self.eval(start, env, depth)?;
                let shadowed = env.insert(var.text.clone(), start);
                let result = self.eval_loop(&var.text, end, step.as_deref(), body, env, depth);
                match shadowed {
                    Some(old) => env.insert(var.text.clone(), old),
                    None => env.remove(&var.text),
                };
                result
            }
        }
    }

    fn eval_loop(
        &self,
        var: &str,
        end: &Expr,
        step: Option<&Expr>,
        body: &Expr,
        env: &mut HashMap<String, f64>,
        depth: usize,
    ) -> Result<f64, EvalError> {
        loop {
            self.eval(body, env, depth)?;
            let step = match step {
                Some(s) => self.eval(s, env, depth)?,
                None => 1.0,
            };
            let end = self.eval(end, env, depth)?;
            let current = env.get(var).copied().unwrap_or(0.0);
            env.insert(var.to_string(), current + step);
            if end == 0.0 {
                return Ok(0.0);
            }
        }
    }
}

pub(crate) fn apply_binop(op: BinOp, l: f64, r: f64) -> f64 {
    let truth = |b: bool| if b { 1.0 } else { 0.0 };
    match op {
        BinOp::Add => l + r,
        BinOp::Sub => l - r,
        BinOp::Mul => l * r,
        BinOp::Div => l / r,
        BinOp::Lt => truth(l < r),
        BinOp::Gt => truth(l > r),
    }
}

impl Evaluator for Interpreter {
    fn bind_and_evaluate(&mut self, unit: &NamedUnit) -> Result<Evaluation, EvalError> {
        let name = unit.name().to_string();
        if self.is_bound(&name) {
            return Err(already_bound(&name));
        }
        match &unit.body {
            UnitBody::Extern => {
                let prim = resolve_extern(&unit.prototype)?;
                self.callables.insert(name.clone(), Callable::Native(prim));
                Ok(Evaluation::Declared {
                    name,
                    arity: prim.arity(),
                })
            }
            UnitBody::Function(body) => {
                check_references(unit, &|n| self.arity(n))?;
                let params: Vec<String> = unit.prototype.param_names().map(String::from).collect();
                let arity = params.len();
                let callable = Callable::User {
                    params,
                    body: body.clone(),
                };
                if !unit.anonymous {
                    self.callables.insert(name.clone(), callable);
                    return Ok(Evaluation::Defined { name, arity });
                }
                let value = self.eval(body, &mut HashMap::new(), 0)?;
                self.callables.insert(name.clone(), callable);
                Ok(Evaluation::Value { name, value })
            }
        }
    }
}
