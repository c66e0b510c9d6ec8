// パス: src/repl/driver.rs
// 役割: 1 行ごとの入力を準備状態追跡器へ流し、完結した構文に名前を与えて評価器へ渡す
// 意図: 解析・命名・束縛を入出力から切り離し、対話ループとファイル読み込みで共有する
// 関連ファイル: src/readiness.rs, src/naming.rs, src/prototype.rs, src/evaluator.rs
//! REPL ドライバ
//!
//! - 定義と extern は宣言された名前で、匿名式は系列から取り出した未使用の名前で束縛する。
//! - 名前の系列はセッション開始時に 1 度だけ `begin` し、以後同じ走査を進める。
//! - 同時に処理中の構文は常に 1 つだけ。

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::ast::TopLevel;
use crate::errors::{EvalError, InternalError, ParseError};
use crate::evaluator::{Evaluation, Evaluator, NamedUnit, UnitBody};
use crate::naming::{self, AnonymousNames};
use crate::parser::{Grammar, KaleidoscopeGrammar};
use crate::prototype::{extract, PrototypeDescriptor};
use crate::readiness::{Finished, Readiness, ReadinessObserver, ReadinessTracker};

/// 1 行を処理した結果。
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// 構文が未完のため続きの行を待つ。
    Pending,
    Done(Evaluation),
}

#[derive(Debug, Error)]
pub enum ReplError {
    #[error("{0}")]
    Syntax(ParseError),
    #[error("{0}")]
    Eval(EvalError),
    #[error("internal error: {0}")]
    Internal(#[from] InternalError),
}

impl ReplError {
    /// 利用者向けエラーのコード。内部エラーは `INTERNAL`。
    pub fn code(&self) -> &'static str {
        match self {
            ReplError::Syntax(e) => e.code(),
            ReplError::Eval(e) => e.code(),
            ReplError::Internal(_) => "INTERNAL",
        }
    }
}

#[derive(Debug, Clone)]
struct Binding {
    prototype: PrototypeDescriptor,
    anonymous: bool,
}

pub struct ReplDriver<E, G = KaleidoscopeGrammar> {
    tracker: ReadinessTracker<G>,
    names: AnonymousNames,
    session: BTreeMap<String, Binding>,
    evaluator: E,
}

impl<E: Evaluator> ReplDriver<E, KaleidoscopeGrammar> {
    pub fn new(evaluator: E, anon_prefix: &str) -> Self {
        Self::with_grammar(evaluator, KaleidoscopeGrammar, anon_prefix)
    }
}

impl<E: Evaluator, G: Grammar> ReplDriver<E, G> {
    pub fn with_grammar(evaluator: E, grammar: G, anon_prefix: &str) -> Self {
        Self {
            tracker: ReadinessTracker::with_grammar(grammar),
            names: naming::begin(anon_prefix),
            session: BTreeMap::new(),
            evaluator,
        }
    }

    pub fn subscribe(&mut self, observer: impl ReadinessObserver + 'static) {
        self.tracker.subscribe(observer);
    }

    /// 入力途中かどうか（継続プロンプトを出すべきか）。
    pub fn is_partial(&self) -> bool {
        self.tracker.is_partial()
    }

    /// 蓄積中の入力を捨てる。
    pub fn reset(&mut self) {
        self.tracker.reset();
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.session.contains_key(name)
    }

    /// 利用者が定義・宣言したプロトタイプを名前順に返す。匿名式は含まない。
    pub fn prototypes(&self) -> impl Iterator<Item = &PrototypeDescriptor> {
        self.session
            .values()
            .filter(|b| !b.anonymous)
            .map(|b| &b.prototype)
    }

    pub fn prototype(&self, name: &str) -> Option<&PrototypeDescriptor> {
        self.session
            .get(name)
            .filter(|b| !b.anonymous)
            .map(|b| &b.prototype)
    }

    /// 1 行を処理する。
    pub fn process_line(&mut self, line: &str) -> Result<Step, ReplError> {
        let readiness = match self.tracker.feed(line) {
            Ok(r) => r,
            Err(err) => return Err(self.abort(err)),
        };
        if readiness == Readiness::Partial {
            return Ok(Step::Pending);
        }
        match self.tracker.take() {
            Some(Finished::Construct(top)) => self.bind(top).map(Step::Done),
            Some(Finished::Error(err)) => {
                warn!(code = err.code(), "syntax error; buffered input discarded");
                Err(ReplError::Syntax(err))
            }
            None => Ok(Step::Pending),
        }
    }

    fn bind(&mut self, top: TopLevel) -> Result<Evaluation, ReplError> {
        let unit = match top {
            TopLevel::Definition { proto, body } => NamedUnit {
                prototype: extract(&proto).map_err(|e| self.abort(e))?,
                body: UnitBody::Function(body),
                anonymous: false,
            },
            TopLevel::Extern { proto } => NamedUnit {
                prototype: extract(&proto).map_err(|e| self.abort(e))?,
                body: UnitBody::Extern,
                anonymous: false,
            },
            TopLevel::Expression { body } => {
                let name = self.next_anonymous_name().map_err(|e| self.abort(e))?;
                NamedUnit {
                    prototype: PrototypeDescriptor::nullary(name),
                    body: UnitBody::Function(body),
                    anonymous: true,
                }
            }
        };

        let evaluation = self
            .evaluator
            .bind_and_evaluate(&unit)
            .map_err(ReplError::Eval)?;
        debug!(name = unit.name(), anonymous = unit.anonymous, "unit bound");
        self.session.insert(
            unit.prototype.name.clone(),
            Binding {
                prototype: unit.prototype,
                anonymous: unit.anonymous,
            },
        );
        Ok(evaluation)
    }

    /// セッションでまだ使われていない次の匿名名。
    fn next_anonymous_name(&mut self) -> Result<String, InternalError> {
        loop {
            let name = self
                .names
                .next_name()
                .ok_or_else(|| InternalError::NamesExhausted {
                    prefix: self.names.prefix().to_string(),
                })?;
            if !self.session.contains_key(&name) {
                return Ok(name);
            }
            debug!(%name, "anonymous name already bound; skipping");
        }
    }

    /// 内部エラーで現在の単位を打ち切る。
    fn abort(&mut self, err: InternalError) -> ReplError {
        error!(%err, "aborting current unit");
        self.tracker.reset();
        ReplError::Internal(err)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use super::{ReplDriver, ReplError, Step};
    use crate::ast::{Expr, PrototypeNode, TopLevel};
    use crate::errors::InternalError;
    use crate::evaluator::{Evaluation, Interpreter};
    use crate::parser::{Grammar, ParseOutcome};
    use crate::readiness::ReadinessEvent;
    use crate::span::SourceSpan;

    fn driver(prefix: &str) -> ReplDriver<Interpreter> {
        ReplDriver::new(Interpreter::new(), prefix)
    }

    fn value(step: Step) -> (String, f64) {
        match step {
            Step::Done(Evaluation::Value { name, value }) => (name, value),
            other => panic!("value expected: {:?}", other),
        }
    }

    #[test]
    /// 複数行の定義のあと、匿名式が接頭辞付きの最初の名前で評価される。
    fn multi_line_definition_then_anonymous_expression() {
        let mut d = driver("expr");
        assert_eq!(d.process_line("def foo(a b)").unwrap(), Step::Pending);
        assert_eq!(d.process_line("").unwrap(), Step::Pending);
        assert_eq!(
            d.process_line("a+b").unwrap(),
            Step::Done(Evaluation::Defined {
                name: "foo".into(),
                arity: 2
            })
        );
        assert_eq!(value(d.process_line("3+4").unwrap()), ("expr0".into(), 7.0));
        assert_eq!(value(d.process_line("foo(1, 2)").unwrap()), ("expr1".into(), 3.0));
        let names: Vec<&str> = d.prototypes().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["foo"]);
        assert!(d.is_bound("expr1"));
    }

    #[test]
    /// 構文エラー後はバッファが破棄され、次の行は新しい入力として扱われる。
    fn syntax_error_discards_buffer() {
        let mut d = driver("e");
        assert_eq!(d.process_line("1 +").unwrap(), Step::Pending);
        let err = d.process_line(")").unwrap_err();
        assert!(matches!(err, ReplError::Syntax(_)));
        assert_eq!(value(d.process_line("2").unwrap()), ("e0".into(), 2.0));
    }

    #[test]
    /// 利用者が先に使った名前は匿名名として再利用しない。
    fn anonymous_names_skip_bound_user_names() {
        let mut d = driver("expr");
        d.process_line("def expr0() 5").unwrap();
        assert_eq!(value(d.process_line("expr0()").unwrap()), ("expr1".into(), 5.0));
        assert_eq!(value(d.process_line("1").unwrap()), ("expr2".into(), 1.0));
    }

    #[test]
    /// 評価エラーはそのまま返り、セッションは継続する。
    fn evaluator_errors_pass_through() {
        let mut d = driver("e");
        let err = d.process_line("nope(1)").unwrap_err();
        assert_eq!(err.code(), "EVAL002");
        d.process_line("def id(x) x").unwrap();
        let err = d.process_line("def id(y) y").unwrap_err();
        assert_eq!(err.code(), "EVAL010");
        // 失敗した匿名式も名前は消費済み
        assert_eq!(value(d.process_line("id(4)").unwrap()), ("e1".into(), 4.0));
        assert!(!d.is_partial());
    }

    #[test]
    /// 購読者は 1 構文あたり PARTIAL と COMPLETE を受け取る。
    fn observers_follow_the_construct() {
        let mut d = driver("e");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        d.subscribe(move |e: ReadinessEvent| sink.borrow_mut().push(e));
        d.process_line("def f(x)").unwrap();
        assert!(d.is_partial());
        d.process_line("  x * 2").unwrap();
        assert_eq!(
            seen.borrow().as_slice(),
            &[ReadinessEvent::PARTIAL, ReadinessEvent::COMPLETE]
        );
        assert_eq!(d.prototype("f").map(|p| p.arity()), Some(1));
    }

    /// 識別子の無いプロトタイプを返す壊れた文法。
    struct BrokenGrammar;
    impl Grammar for BrokenGrammar {
        fn parse(&self, _buffer: &str) -> ParseOutcome {
            let span = SourceSpan::on_line(1, 1, 1);
            ParseOutcome::Complete(TopLevel::Definition {
                proto: PrototypeNode {
                    idents: Vec::new(),
                    span,
                },
                body: Expr::Number { value: 0.0, span },
            })
        }
    }

    #[test]
    /// 文法の契約違反は内部エラーとして打ち切られ、何も束縛されない。
    fn grammar_contract_breach_is_internal_error() {
        let mut d = ReplDriver::with_grammar(Interpreter::new(), BrokenGrammar, "e");
        let err = d.process_line("anything").unwrap_err();
        assert!(matches!(
            err,
            ReplError::Internal(InternalError::EmptyPrototype)
        ));
        assert!(err.to_string().starts_with("internal error:"));
        assert_eq!(d.prototypes().count(), 0);
    }
}
