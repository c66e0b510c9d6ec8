// パス: tests/readiness_properties.rs
// 役割: 準備状態追跡器の通知規則とエラー後の回復を公開 API から検証する
// 意図: 継続プロンプトの切り替えに使う通知の回数・順序・配送先が回帰しないようにする
// 関連ファイル: src/readiness.rs, tests/test_support.rs
#[path = "test_support.rs"]
mod support;

use std::sync::mpsc;

use kaleido::readiness::{ChannelObserver, Finished, Readiness, ReadinessEvent, TrackerState};
use support::recorded_tracker;

#[test]
/// k 行に分かれた構文は、最初の未完行で PARTIAL、最終行で COMPLETE をそれぞれ 1 回通知する。
fn split_construct_notifies_partial_then_complete_once() {
    let cases: &[(&[&str], &str)] = &[
        (&["def foo(a b)", "a + b"], "2 行の定義"),
        (&["def foo(a b)", "", "a + b"], "空行を挟む定義"),
        (&["(1 +", "2", ")"], "括弧の途中で改行"),
        (&["def f(x)", "  if x < 1", "  then 0", "  else f(x - 1)"], "4 行の if"),
        (&["for i = 1,", " i < 3", " in", " i"], "for 式"),
        (&["extern sin(", "x)"], "extern"),
    ];
    for (lines, note) in cases {
        let (mut tracker, rec) = recorded_tracker();
        let (last, init) = lines.split_last().unwrap();
        for line in init {
            assert_eq!(tracker.feed(line).unwrap(), Readiness::Partial, "{note}: {line:?}");
            assert_eq!(rec.events(), vec![ReadinessEvent::PARTIAL], "{note}");
        }
        assert_eq!(tracker.feed(last).unwrap(), Readiness::Complete, "{note}");
        assert_eq!(
            rec.events(),
            vec![ReadinessEvent::PARTIAL, ReadinessEvent::COMPLETE],
            "{note}"
        );
        assert!(matches!(tracker.take(), Some(Finished::Construct(_))), "{note}");
    }
}

#[test]
/// 1 行で完結した構文は PARTIAL を伴わず COMPLETE だけを通知する。
fn single_line_constructs_never_notify_partial() {
    let (mut tracker, rec) = recorded_tracker();
    for line in ["3+4", "def id(x) x", "extern cos(x)", "1;"] {
        assert_eq!(tracker.feed(line).unwrap(), Readiness::Complete, "{line}");
        tracker.take();
    }
    assert_eq!(rec.partial_count(), 0);
    assert_eq!(rec.complete_count(), 4);
}

#[test]
/// エラー後の次の構文は新しいバッファで解析され、破棄した内容は混ざらない。
fn error_starts_a_fresh_buffer() {
    let (mut tracker, rec) = recorded_tracker();
    assert_eq!(tracker.feed("1 +").unwrap(), Readiness::Partial);
    assert_eq!(tracker.feed(")").unwrap(), Readiness::Error);
    assert!(matches!(tracker.state(), TrackerState::Error(_)));
    assert!(matches!(tracker.take(), Some(Finished::Error(_))));

    assert_eq!(tracker.feed("2").unwrap(), Readiness::Complete);
    assert_eq!(tracker.buffer(), "2\n");
    let Some(Finished::Construct(top)) = tracker.take() else {
        panic!("construct expected");
    };
    assert_eq!(top.to_string(), "2");
    assert_eq!(rec.complete_count(), 2);
}

#[test]
/// 構文エラーは 1 行目でも直ちに分類される。
fn immediate_syntax_errors() {
    for (line, code) in [(")", "PAR001"), ("1 2", "PAR090"), ("def 3(x) x", "PAR001"), ("4 $", "LEX090")] {
        let (mut tracker, rec) = recorded_tracker();
        assert_eq!(tracker.feed(line).unwrap(), Readiness::Error, "{line}");
        let Some(Finished::Error(err)) = tracker.take() else {
            panic!("error expected for {line}");
        };
        assert_eq!(err.code(), code, "{line}");
        assert_eq!(rec.events(), vec![ReadinessEvent::COMPLETE]);
    }
}

#[test]
/// 深い入れ子は 1 行でも複数行の蓄積でも、スタックを使い切らずに構文エラーになる。
fn deep_nesting_is_classified_as_error() {
    let (mut tracker, rec) = recorded_tracker();
    let line = format!("{}1{}", "(".repeat(2000), ")".repeat(2000));
    assert_eq!(tracker.feed(&line).unwrap(), Readiness::Error);
    let Some(Finished::Error(err)) = tracker.take() else {
        panic!("error expected");
    };
    assert_eq!(err.code(), "PAR030");

    let mut last = Readiness::Partial;
    let mut fed = 0;
    while last == Readiness::Partial {
        last = tracker.feed("(").unwrap();
        fed += 1;
        assert!(fed <= 300, "nesting limit never reached");
    }
    assert_eq!(last, Readiness::Error);
    assert!(matches!(tracker.take(), Some(Finished::Error(e)) if e.code() == "PAR030"));
    assert_eq!(rec.complete_count(), 2);
    assert_eq!(rec.partial_count(), 1);
}

#[test]
/// 通知は feed が戻る前に、クロージャとチャネルのすべての観測者へ同じ順序で届く。
fn delivery_is_synchronous_and_fans_out() {
    let (mut tracker, rec) = recorded_tracker();
    let (tx1, rx1) = mpsc::channel();
    let (tx2, rx2) = mpsc::channel();
    tracker.subscribe(ChannelObserver(tx1));
    tracker.subscribe(ChannelObserver(tx2));

    tracker.feed("def f(x)").unwrap();
    assert_eq!(rx1.try_recv(), Ok(ReadinessEvent::PARTIAL));
    assert_eq!(rx2.try_recv(), Ok(ReadinessEvent::PARTIAL));
    tracker.feed("x").unwrap();
    assert_eq!(rx1.try_recv(), Ok(ReadinessEvent::COMPLETE));
    assert_eq!(rx2.try_recv(), Ok(ReadinessEvent::COMPLETE));
    assert_eq!(rec.events().len(), 2);
    assert!(rx1.try_recv().is_err());
}

#[test]
/// 受信側を閉じたチャネルがあっても追跡は続く。
fn dropped_receiver_does_not_stop_tracking() {
    let (mut tracker, rec) = recorded_tracker();
    let (tx, rx) = mpsc::channel();
    tracker.subscribe(ChannelObserver(tx));
    drop(rx);
    assert_eq!(tracker.feed("(1").unwrap(), Readiness::Partial);
    assert_eq!(tracker.feed(")").unwrap(), Readiness::Complete);
    assert_eq!(rec.events().len(), 2);
}
