use std::{
    cell::RefCell,
    rc::{Rc, Weak},
    time::Duration,
};

use crate::Timer;


/// One-shot timer bound to a delay setting.
///
/// A timer is armed whenever the delay is set to `Some`, and re-armed only when the delay actually changes.
/// Setting `None` disarms it. The callback can be swapped at any time; the one set last is the one that fires.
///
/// Cloning shares the same state. When the last clone is dropped, the armed timer is canceled.
#[derive(Clone)]
pub struct Timeout(Rc<TimeoutNode>);

struct TimeoutNode {
    callback: RefCell<Box<dyn FnMut()>>,
    data: RefCell<TimeoutData>,
}

struct TimeoutData {
    delay: Option<Duration>,
    timer: Option<Timer>,
}

impl Timeout {
    pub fn new(callback: impl FnMut() + 'static, delay: Option<Duration>) -> Self {
        let this = Self(Rc::new(TimeoutNode {
            callback: RefCell::new(Box::new(callback)),
            data: RefCell::new(TimeoutData {
                delay: None,
                timer: None,
            }),
        }));
        this.set_delay(delay);
        this
    }

    pub fn delay(&self) -> Option<Duration> {
        self.0.data.borrow().delay
    }

    /// Changes the delay. The timer is canceled and re-armed only if the value differs.
    pub fn set_delay(&self, delay: Option<Duration>) {
        let old = {
            let mut d = self.0.data.borrow_mut();
            if d.delay == delay {
                return;
            }
            d.delay = delay;
            d.timer.take()
        };
        drop(old);
        if let Some(delay) = delay {
            let node = Rc::downgrade(&self.0);
            let timer = Timer::schedule(delay, move || TimeoutNode::fire(&node));
            self.0.data.borrow_mut().timer = Some(timer);
        }
    }

    /// Replaces the callback without touching the timer.
    pub fn set_callback(&self, callback: impl FnMut() + 'static) {
        *self.0.callback.borrow_mut() = Box::new(callback);
    }

    /// Cancels the armed timer. The delay setting is kept, so setting a different delay arms again.
    pub fn cancel(&self) {
        let old = self.0.data.borrow_mut().timer.take();
        drop(old);
    }

    pub fn is_pending(&self) -> bool {
        self.0
            .data
            .borrow()
            .timer
            .as_ref()
            .is_some_and(Timer::is_pending)
    }
}

impl TimeoutNode {
    fn fire(node: &Weak<Self>) {
        let Some(node) = node.upgrade() else {
            return;
        };
        let fired = node.data.borrow_mut().timer.take();
        drop(fired);
        (node.callback.borrow_mut())();
    }
}
