use std::{
    cell::Cell,
    rc::Rc,
    time::{Duration, Instant},
};

use assert_call::{call, CallRecorder};
use futures::executor::block_on;
use pacer::{ClockKind, Debounce, Interval, Runtime, Throttle};
use pretty_assertions::assert_eq;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn debounce_fires_after_real_wait() {
    let mut rt = Runtime::new();
    assert_eq!(rt.clock_kind(), ClockKind::System);
    let mut cr = CallRecorder::new();
    let d = Debounce::new(|x: u32| call!("save {x}"), ms(20));
    let start = Instant::now();
    d.call(1);
    d.call(2);
    let count = block_on(rt.run_until_idle()).unwrap();
    assert!(start.elapsed() >= ms(20));
    assert_eq!(count, 1);
    cr.verify("save 2");
}

#[test]
fn throttle_trailing_call_fires_after_window() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let t = Throttle::new(|x: u32| call!("send {x}"), ms(15));
    t.call(1);
    t.call(2);
    t.call(3);
    cr.verify("send 1");
    block_on(rt.run_until_idle()).unwrap();
    cr.verify("send 3");
}

#[test]
fn interval_ticks_until_paused() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let i = Interval::new(|| {}, Some(ms(5)));
    let i0 = i.clone();
    let ticks = Rc::new(Cell::new(0));
    i.set_callback(move || {
        call!("tick");
        ticks.set(ticks.get() + 1);
        if ticks.get() == 3 {
            i0.set_period(None);
        }
    });
    block_on(rt.run_until_idle()).unwrap();
    cr.verify(["tick", "tick", "tick"]);
    assert!(!i.is_running());
}
