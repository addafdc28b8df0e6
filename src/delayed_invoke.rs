use std::{
    cell::RefCell,
    rc::{Rc, Weak},
    time::Duration,
};

use crate::Timer;


/// Re-triggerable "run after a delay" scheduler.
///
/// Each [`trigger`](Self::trigger) cancels the armed timer and arms a new one.
/// Both the callback and the delay are read through accessors, so the scheduler always uses
/// the values current at the time they are needed rather than the ones seen at construction:
/// the delay is read when triggered and the callback when the timer fires.
///
/// Cloning shares the same state. When the last clone is dropped, the armed timer is canceled.
#[derive(Clone)]
pub struct DelayedInvoke(Rc<DelayedInvokeNode>);

struct DelayedInvokeNode {
    callback: Box<dyn Fn() -> Box<dyn FnOnce()>>,
    delay: Box<dyn Fn() -> Duration>,
    timer: RefCell<Option<Timer>>,
}

impl DelayedInvoke {
    pub fn new<C>(
        callback: impl Fn() -> C + 'static,
        delay: impl Fn() -> Duration + 'static,
    ) -> Self
    where
        C: FnOnce() + 'static,
    {
        Self(Rc::new(DelayedInvokeNode {
            callback: Box::new(move || -> Box<dyn FnOnce()> { Box::new(callback()) }),
            delay: Box::new(delay),
            timer: RefCell::new(None),
        }))
    }

    /// Cancels the armed timer, if any, and arms a new one with the current delay.
    pub fn trigger(&self) {
        let delay = (self.0.delay)();
        let old = self.0.timer.borrow_mut().take();
        drop(old);
        let node = Rc::downgrade(&self.0);
        let timer = Timer::schedule(delay, move || DelayedInvokeNode::fire(&node));
        *self.0.timer.borrow_mut() = Some(timer);
    }

    pub fn cancel(&self) {
        let old = self.0.timer.borrow_mut().take();
        drop(old);
    }

    pub fn is_pending(&self) -> bool {
        self.0
            .timer
            .borrow()
            .as_ref()
            .is_some_and(Timer::is_pending)
    }
}

impl DelayedInvokeNode {
    fn fire(node: &Weak<Self>) {
        let Some(node) = node.upgrade() else {
            return;
        };
        let fired = node.timer.borrow_mut().take();
        drop(fired);
        let callback = (node.callback)();
        callback();
    }
}
