use std::{cell::Cell, rc::Rc, time::Duration};

use assert_call::{call, CallRecorder};

use super::*;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
#[should_panic(expected = "Only one `Runtime`")]
fn second_runtime_panics() {
    let _rt0 = Runtime::new();
    let _rt1 = Runtime::new();
}

#[test]
fn runtime_can_be_recreated_after_drop() {
    {
        let _rt = Runtime::new();
    }
    let rt = Runtime::with_manual_clock();
    assert_eq!(rt.clock_kind(), ClockKind::Manual);
}

#[test]
#[should_panic(expected = "`Runtime` is not created.")]
fn schedule_without_runtime_panics() {
    let _t = Timer::schedule(ms(10), || {});
}

#[test]
fn timers_fire_in_deadline_order() {
    let mut rt = Runtime::with_manual_clock();
    let mut cr = CallRecorder::new();
    let _t0 = Timer::schedule(ms(30), || call!("30"));
    let _t1 = Timer::schedule(ms(10), || call!("10"));
    let _t2 = Timer::schedule(ms(20), || call!("20"));
    assert_eq!(rt.pending_timers(), 3);

    rt.advance(ms(9)).unwrap();
    cr.verify(());
    assert_eq!(rt.advance(ms(30)).unwrap(), 3);
    cr.verify(["10", "20", "30"]);
    assert_eq!(rt.pending_timers(), 0);
}

#[test]
fn same_deadline_fires_in_schedule_order() {
    let mut rt = Runtime::with_manual_clock();
    let mut cr = CallRecorder::new();
    let _t0 = Timer::schedule(ms(10), || call!("a"));
    let _t1 = Timer::schedule(ms(10), || call!("b"));
    rt.advance(ms(10)).unwrap();
    cr.verify(["a", "b"]);
}

#[test]
fn zero_delay_fires_on_run_timers() {
    let mut rt = Runtime::with_manual_clock();
    let mut cr = CallRecorder::new();
    let t = Timer::schedule(Duration::ZERO, || call!("now"));
    assert!(t.is_pending());
    cr.verify(());
    assert_eq!(rt.run_timers().unwrap(), 1);
    cr.verify("now");
    assert!(!t.is_pending());
}

#[test]
fn drop_cancels_timer() {
    let mut rt = Runtime::with_manual_clock();
    let mut cr = CallRecorder::new();
    let t = Timer::schedule(ms(10), || call!("fired"));
    drop(t);
    assert_eq!(rt.pending_timers(), 0);
    rt.advance(ms(20)).unwrap();
    cr.verify(());
}

#[test]
fn cancel_after_fire_is_noop() {
    let mut rt = Runtime::with_manual_clock();
    let mut t = Timer::schedule(ms(10), || {});
    let _other = Timer::schedule(ms(50), || {});
    rt.advance(ms(10)).unwrap();
    t.cancel();
    assert_eq!(rt.pending_timers(), 1);
}

#[test]
fn deadline_is_reported_until_fired() {
    let mut rt = Runtime::with_manual_clock();
    let start = rt.now();
    let t = Timer::schedule(ms(10), || {});
    assert_eq!(t.deadline(), Some(start + ms(10)));
    assert_eq!(rt.next_deadline(), Some(start + ms(10)));
    rt.advance(ms(10)).unwrap();
    assert_eq!(t.deadline(), None);
    assert_eq!(rt.next_deadline(), None);
}

#[test]
fn callback_scheduled_timer_fires_within_advance() {
    let mut rt = Runtime::with_manual_clock();
    let count = Rc::new(Cell::new(0));
    let slot: Rc<Cell<Option<Timer>>> = Rc::new(Cell::new(None));
    let count0 = count.clone();
    let slot0 = slot.clone();
    let _t = Timer::schedule(ms(10), move || {
        count0.set(count0.get() + 1);
        let count1 = count0.clone();
        slot0.set(Some(Timer::schedule(ms(10), move || {
            count1.set(count1.get() + 1)
        })));
    });
    assert_eq!(rt.advance(ms(25)).unwrap(), 2);
    assert_eq!(count.get(), 2);
}

#[test]
fn manual_clock_moves_only_when_advanced() {
    let mut rt = Runtime::with_manual_clock();
    let start = rt.now();
    std::thread::sleep(ms(2));
    assert_eq!(rt.now(), start);
    rt.advance(ms(40)).unwrap();
    assert_eq!(rt.now(), start + ms(40));
}

#[test]
#[should_panic(expected = "requires a manual clock")]
fn advance_on_system_clock_panics() {
    let mut rt = Runtime::new();
    let _ = rt.advance(ms(1));
}

#[test]
fn panic_in_callback_is_reported_and_rest_stay_queued() {
    let mut rt = Runtime::with_manual_clock();
    let mut cr = CallRecorder::new();
    let _t0 = Timer::schedule(ms(10), || panic!("boom"));
    let _t1 = Timer::schedule(ms(10), || call!("after"));

    let e = rt.advance(ms(10)).unwrap_err();
    assert_eq!(e.message(), "boom");
    cr.verify(());
    assert_eq!(rt.pending_timers(), 1);

    assert_eq!(rt.run_timers().unwrap(), 1);
    cr.verify("after");
}

#[test]
fn runtime_drop_discards_callbacks() {
    let mut cr = CallRecorder::new();
    let t = {
        let _rt = Runtime::with_manual_clock();
        Timer::schedule(ms(10), || call!("fired"))
    };
    assert!(!t.is_pending());
    let mut rt = Runtime::with_manual_clock();
    let _live = Timer::schedule(ms(10), || call!("live"));
    drop(t);
    assert_eq!(rt.pending_timers(), 1);
    rt.advance(ms(10)).unwrap();
    cr.verify("live");
}

#[test]
fn wait_for_ready_jumps_manual_clock() {
    let mut rt = Runtime::with_manual_clock();
    let start = rt.now();
    let _t = Timer::schedule(ms(70), || {});
    futures::executor::block_on(rt.wait_for_ready());
    assert_eq!(rt.now(), start + ms(70));
    assert_eq!(rt.run_timers().unwrap(), 1);
}

#[test]
fn run_until_idle_drains_queue() {
    let mut rt = Runtime::with_manual_clock();
    let mut cr = CallRecorder::new();
    let _t0 = Timer::schedule(ms(5), || call!("5"));
    let _t1 = Timer::schedule(ms(500), || call!("500"));
    let count = futures::executor::block_on(rt.run_until_idle()).unwrap();
    assert_eq!(count, 2);
    cr.verify(["5", "500"]);
}

#[test]
fn overflowing_delay_saturates() {
    let mut rt = Runtime::with_manual_clock();
    let mut cr = CallRecorder::new();
    let t = Timer::schedule(Duration::MAX, || call!("fired"));
    assert!(t.deadline().is_some_and(|d| d > rt.now()));
    rt.advance(Duration::from_secs(86_400)).unwrap();
    cr.verify(());
    assert!(t.is_pending());
}
