// パス: src/readiness.rs
// 役割: 行単位の入力を蓄積し、構文の完成・入力不足・構文誤りを判定する状態機械
// 意図: 継続プロンプトの切り替えに必要な準備状態の変化を観測者へ同期的に通知する
// 関連ファイル: src/parser/mod.rs, src/repl/driver.rs, src/repl/cmd.rs
//! 読み込み準備状態の追跡
//!
//! 状態: `Empty` → (`feed`) → `Accumulating` | `Complete` | `Error`。
//! `Complete` / `Error` は `take` で消費されると `Empty` に戻り、蓄積した
//! バッファは丸ごと破棄される（末尾行だけ削って再解析するような回復はしない）。
//!
//! 通知規則:
//! - 部分的でない分類から `Accumulating` に入ったとき `PARTIAL` を 1 回。
//! - 構文が完結（`Complete` / `Error`）するたびに `COMPLETE` を 1 回。
//!   `Complete -> Empty -> Complete` のように分類が変わらない場合も送る。
//!   観測者が構文の区切りを数えられるようにするため。
//! - `Accumulating -> Accumulating` では通知しない。
//! - 通知は `feed` が戻る前に、登録済みのすべての観測者へ届く。

use std::sync::mpsc::Sender;

use tracing::debug;

use crate::ast::TopLevel;
use crate::errors::{InternalError, ParseError};
use crate::parser::{Grammar, KaleidoscopeGrammar, ParseOutcome};

/// 準備状態の変化通知。共有可能な 2 つの定数だけが存在する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReadinessEvent {
    pub is_partial: bool,
}

impl ReadinessEvent {
    pub const PARTIAL: ReadinessEvent = ReadinessEvent { is_partial: true };
    pub const COMPLETE: ReadinessEvent = ReadinessEvent { is_partial: false };
}

/// 準備状態の変化を受け取る観測者。
pub trait ReadinessObserver {
    fn readiness_changed(&mut self, event: ReadinessEvent);
}

impl<F> ReadinessObserver for F
where
    F: FnMut(ReadinessEvent),
{
    fn readiness_changed(&mut self, event: ReadinessEvent) {
        self(event)
    }
}

/// チャネル経由で表示層へ通知を流す観測者。受信側が閉じていても追跡は止めない。
pub struct ChannelObserver(pub Sender<ReadinessEvent>);

impl ReadinessObserver for ChannelObserver {
    fn readiness_changed(&mut self, event: ReadinessEvent) {
        let _ = self.0.send(event);
    }
}

/// 追跡器の状態。
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerState {
    Empty,
    Accumulating,
    Complete(TopLevel),
    Error(ParseError),
}

impl TrackerState {
    fn label(&self) -> &'static str {
        match self {
            TrackerState::Empty => "empty",
            TrackerState::Accumulating => "accumulating",
            TrackerState::Complete(_) => "complete",
            TrackerState::Error(_) => "error",
        }
    }
}

/// `feed` の結果として呼び出し元に返す分類。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Partial,
    Complete,
    Error,
}

/// 完結した入力単位。`take` で 1 度だけ取り出せる。
#[derive(Debug, Clone, PartialEq)]
pub enum Finished {
    Construct(TopLevel),
    Error(ParseError),
}

pub struct ReadinessTracker<G = KaleidoscopeGrammar> {
    grammar: G,
    buffer: String,
    state: TrackerState,
    last_partial: bool,
    observers: Vec<Box<dyn ReadinessObserver>>,
}

impl ReadinessTracker<KaleidoscopeGrammar> {
    pub fn new() -> Self {
        Self::with_grammar(KaleidoscopeGrammar)
    }
}

impl Default for ReadinessTracker<KaleidoscopeGrammar> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Grammar> ReadinessTracker<G> {
    pub fn with_grammar(grammar: G) -> Self {
        Self {
            grammar,
            buffer: String::new(),
            state: TrackerState::Empty,
            last_partial: false,
            observers: Vec::new(),
        }
    }

    /// 観測者を登録する。登録順は配送順を保証しない。
    pub fn subscribe(&mut self, observer: impl ReadinessObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    /// 直近に通知した分類が「入力途中」かどうか。
    pub fn is_partial(&self) -> bool {
        self.last_partial
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// 1 行を追加してバッファ全体を再解析する。
    ///
    /// 完結した結果が未消費のまま呼ばれた場合は呼び出し側の契約違反として失敗する。
    pub fn feed(&mut self, line: &str) -> Result<Readiness, InternalError> {
        match self.state {
            TrackerState::Empty | TrackerState::Accumulating => {}
            ref finished => {
                return Err(InternalError::UnconsumedConstruct {
                    state: finished.label(),
                })
            }
        }
        self.buffer.push_str(line);
        self.buffer.push('\n');

        let (next, readiness) = match self.grammar.parse(&self.buffer) {
            ParseOutcome::Incomplete => (TrackerState::Accumulating, Readiness::Partial),
            ParseOutcome::Complete(top) => (TrackerState::Complete(top), Readiness::Complete),
            ParseOutcome::SyntaxError(err) => (TrackerState::Error(err), Readiness::Error),
        };
        debug!(from = self.state.label(), to = next.label(), "readiness transition");
        self.state = next;

        match readiness {
            Readiness::Partial if !self.last_partial => self.emit(ReadinessEvent::PARTIAL),
            Readiness::Partial => {}
            Readiness::Complete | Readiness::Error => self.emit(ReadinessEvent::COMPLETE),
        }
        Ok(readiness)
    }

    /// 完結した構文またはエラーを取り出し、バッファを破棄して `Empty` に戻る。
    pub fn take(&mut self) -> Option<Finished> {
        let finished = match std::mem::replace(&mut self.state, TrackerState::Empty) {
            TrackerState::Complete(top) => Finished::Construct(top),
            TrackerState::Error(err) => Finished::Error(err),
            pending => {
                self.state = pending;
                return None;
            }
        };
        self.buffer.clear();
        Some(finished)
    }

    /// 蓄積中の入力を破棄する（割り込み時など）。入力途中だった場合は `COMPLETE` を通知する。
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = TrackerState::Empty;
        if self.last_partial {
            self.emit(ReadinessEvent::COMPLETE);
        }
    }

    fn emit(&mut self, event: ReadinessEvent) {
        self.last_partial = event.is_partial;
        for observer in self.observers.iter_mut() {
            observer.readiness_changed(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::mpsc;

    use super::{
        ChannelObserver, Finished, Readiness, ReadinessEvent, ReadinessTracker, TrackerState,
    };
    use crate::ast::TopLevel;
    use crate::errors::InternalError;
    use crate::parser::{Grammar, ParseOutcome};

    fn recorded() -> (ReadinessTracker, Rc<RefCell<Vec<ReadinessEvent>>>) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let mut tracker = ReadinessTracker::new();
        tracker.subscribe(move |e: ReadinessEvent| sink.borrow_mut().push(e));
        (tracker, events)
    }

    #[test]
    /// 2 行に分かれた構文は PARTIAL と COMPLETE を 1 回ずつ通知する。
    fn two_line_construct_emits_partial_then_complete() {
        let (mut tracker, events) = recorded();
        assert_eq!(tracker.feed("def foo(a b)").unwrap(), Readiness::Partial);
        assert_eq!(events.borrow().as_slice(), &[ReadinessEvent::PARTIAL]);
        assert_eq!(tracker.feed("a + b").unwrap(), Readiness::Complete);
        assert_eq!(
            events.borrow().as_slice(),
            &[ReadinessEvent::PARTIAL, ReadinessEvent::COMPLETE]
        );
    }

    #[test]
    /// 入力途中が続く間は重複した通知を出さない。
    fn repeated_partial_lines_do_not_renotify() {
        let (mut tracker, events) = recorded();
        for line in ["def foo(a b)", "", "   ", "# comment"] {
            assert_eq!(tracker.feed(line).unwrap(), Readiness::Partial);
        }
        assert_eq!(tracker.state(), &TrackerState::Accumulating);
        assert_eq!(events.borrow().len(), 1);
        assert_eq!(tracker.feed("a * b").unwrap(), Readiness::Complete);
        assert_eq!(
            events.borrow().as_slice(),
            &[ReadinessEvent::PARTIAL, ReadinessEvent::COMPLETE]
        );
        assert!(!tracker.is_partial());
    }

    #[test]
    /// 1 行で完結した構文は COMPLETE のみを通知する。
    fn single_line_construct_emits_only_complete() {
        let (mut tracker, events) = recorded();
        assert_eq!(tracker.feed("3+4").unwrap(), Readiness::Complete);
        assert_eq!(events.borrow().as_slice(), &[ReadinessEvent::COMPLETE]);
        assert!(matches!(
            tracker.take(),
            Some(Finished::Construct(TopLevel::Expression { .. }))
        ));
        assert_eq!(tracker.state(), &TrackerState::Empty);
        assert!(tracker.buffer().is_empty());
    }

    #[test]
    /// エラー後のバッファは破棄され、次の行は新しいバッファで解析される。
    fn error_discards_buffer_atomically() {
        let (mut tracker, events) = recorded();
        assert_eq!(tracker.feed("1 +").unwrap(), Readiness::Partial);
        assert_eq!(tracker.feed(")").unwrap(), Readiness::Error);
        let Some(Finished::Error(err)) = tracker.take() else {
            panic!("error expected");
        };
        assert_eq!(err.code(), "PAR001");
        assert!(tracker.buffer().is_empty());

        assert_eq!(tracker.feed("2").unwrap(), Readiness::Complete);
        let Some(Finished::Construct(top)) = tracker.take() else {
            panic!("construct expected");
        };
        assert_eq!(top.to_string(), "2");
        assert_eq!(
            events.borrow().as_slice(),
            &[
                ReadinessEvent::PARTIAL,
                ReadinessEvent::COMPLETE,
                ReadinessEvent::COMPLETE
            ]
        );
    }

    #[test]
    /// 未消費の結果があるまま次の行を投入すると内部エラーになる。
    fn feeding_over_unconsumed_result_fails() {
        let mut tracker = ReadinessTracker::new();
        tracker.feed("1").unwrap();
        assert_eq!(
            tracker.feed("2"),
            Err(InternalError::UnconsumedConstruct { state: "complete" })
        );
        assert!(tracker.take().is_some());
        assert!(tracker.take().is_none());
    }

    #[test]
    /// 入力途中の take は何も返さず状態も保つ。
    fn take_while_accumulating_keeps_state() {
        let mut tracker = ReadinessTracker::new();
        tracker.feed("(1").unwrap();
        assert!(tracker.take().is_none());
        assert_eq!(tracker.state(), &TrackerState::Accumulating);
        assert_eq!(tracker.buffer(), "(1\n");
    }

    #[test]
    /// reset は入力途中だった場合のみ COMPLETE を通知する。
    fn reset_notifies_only_when_partial() {
        let (mut tracker, events) = recorded();
        tracker.reset();
        assert!(events.borrow().is_empty());
        tracker.feed("def f(x)").unwrap();
        tracker.reset();
        assert_eq!(
            events.borrow().as_slice(),
            &[ReadinessEvent::PARTIAL, ReadinessEvent::COMPLETE]
        );
        assert_eq!(tracker.state(), &TrackerState::Empty);
        assert_eq!(tracker.feed("f").unwrap(), Readiness::Complete);
    }

    #[test]
    /// 複数の観測者とチャネルの両方にすべての通知が届く。
    fn all_observers_and_channels_see_every_event() {
        let (mut tracker, events) = recorded();
        let (tx, rx) = mpsc::channel();
        tracker.subscribe(ChannelObserver(tx));
        tracker.feed("(1 +").unwrap();
        tracker.feed("2)").unwrap();
        let via_channel: Vec<ReadinessEvent> = rx.try_iter().collect();
        assert_eq!(via_channel, events.borrow().clone());
        assert_eq!(via_channel.len(), 2);
    }

    /// 行数だけで完結を決める検証用の文法。
    struct CountingGrammar(usize);
    impl Grammar for CountingGrammar {
        fn parse(&self, buffer: &str) -> ParseOutcome {
            if buffer.lines().count() >= self.0 {
                crate::parser::parse_top_level("0")
            } else {
                ParseOutcome::Incomplete
            }
        }
    }

    #[test]
    /// 文法の実装を差し替えても分類は文法の判断にのみ従う。
    fn grammar_seam_drives_classification() {
        let mut tracker = ReadinessTracker::with_grammar(CountingGrammar(3));
        assert_eq!(tracker.feed("x").unwrap(), Readiness::Partial);
        assert_eq!(tracker.feed("y").unwrap(), Readiness::Partial);
        assert_eq!(tracker.feed("z").unwrap(), Readiness::Complete);
        assert_eq!(tracker.buffer(), "x\ny\nz\n");
    }
}
