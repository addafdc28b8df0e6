use std::{
    cell::RefCell,
    rc::{Rc, Weak},
    time::Duration,
};

use crate::Timer;


/// Repeating timer bound to a period setting.
///
/// While the period is `Some`, the callback runs once per period.
/// Changing the period restarts the cadence from the time of the change; `None` pauses it.
/// A zero period is treated as paused.
///
/// Cloning shares the same state. When the last clone is dropped, the armed timer is canceled.
#[derive(Clone)]
pub struct Interval(Rc<IntervalNode>);

struct IntervalNode {
    callback: RefCell<Box<dyn FnMut()>>,
    data: RefCell<IntervalData>,
}

struct IntervalData {
    period: Option<Duration>,
    timer: Option<Timer>,
}

impl Interval {
    pub fn new(callback: impl FnMut() + 'static, period: Option<Duration>) -> Self {
        let this = Self(Rc::new(IntervalNode {
            callback: RefCell::new(Box::new(callback)),
            data: RefCell::new(IntervalData {
                period: None,
                timer: None,
            }),
        }));
        this.set_period(period);
        this
    }

    pub fn period(&self) -> Option<Duration> {
        self.0.data.borrow().period
    }

    pub fn set_period(&self, period: Option<Duration>) {
        let period = period.filter(|p| !p.is_zero());
        let old = {
            let mut d = self.0.data.borrow_mut();
            if d.period == period {
                return;
            }
            d.period = period;
            d.timer.take()
        };
        drop(old);
        IntervalNode::arm(&self.0);
    }

    pub fn set_callback(&self, callback: impl FnMut() + 'static) {
        *self.0.callback.borrow_mut() = Box::new(callback);
    }

    pub fn is_running(&self) -> bool {
        self.0.data.borrow().timer.is_some()
    }
}

impl IntervalNode {
    fn arm(this: &Rc<Self>) {
        let Some(period) = this.data.borrow().period else {
            return;
        };
        let node = Rc::downgrade(this);
        let timer = Timer::schedule(period, move || IntervalNode::fire(&node));
        let old = this.data.borrow_mut().timer.replace(timer);
        drop(old);
    }

    fn fire(node: &Weak<Self>) {
        let Some(node) = node.upgrade() else {
            return;
        };
        let fired = node.data.borrow_mut().timer.take();
        drop(fired);
        // The next tick is armed before the callback runs.
        Self::arm(&node);
        (node.callback.borrow_mut())();
    }
}
