use std::{
    cell::RefCell,
    rc::{Rc, Weak},
    time::{Duration, Instant},
};

use derive_ex::derive_ex;

use crate::{core::now, IntoDelay, Timer};


/// Limits a function to at most one run per `delay`.
///
/// A [`call`](Self::call) made when `delay` has elapsed since the last run executes the function immediately.
/// Otherwise the arguments are queued and a timer is armed for the rest of the window;
/// further calls in the same window replace the queued arguments, so only the latest queued call runs.
///
/// Cloning shares the same state. When the last clone is dropped, the queued call is canceled.
#[derive_ex(Clone, bound())]
pub struct Throttle<A: 'static, R: 'static>(Rc<ThrottleNode<A, R>>);

struct ThrottleNode<A, R> {
    f: RefCell<Box<dyn FnMut(A) -> R>>,
    delay: Duration,
    data: RefCell<ThrottleData<A, R>>,
}

struct ThrottleData<A, R> {
    timer: Option<Timer>,
    args: Option<A>,
    last_run: Option<Instant>,
    result: Option<R>,
}
impl<A, R> ThrottleData<A, R> {
    fn remaining(&self, now: Instant, delay: Duration) -> Option<Duration> {
        let last_run = self.last_run?;
        // `None` from `checked_duration_since` means the clock went backwards: run now.
        let elapsed = now.checked_duration_since(last_run)?;
        delay.checked_sub(elapsed).filter(|r| !r.is_zero())
    }
}

impl<A: 'static, R: 'static> Throttle<A, R> {
    /// Wraps `f`. Invalid delays are coerced to zero.
    pub fn new(f: impl FnMut(A) -> R + 'static, delay: impl IntoDelay) -> Self {
        Self(Rc::new(ThrottleNode {
            f: RefCell::new(Box::new(f)),
            delay: delay.into_delay(),
            data: RefCell::new(ThrottleData {
                timer: None,
                args: None,
                last_run: None,
                result: None,
            }),
        }))
    }

    pub fn delay(&self) -> Duration {
        self.0.delay
    }

    /// Runs the function now if the window has elapsed, otherwise queues `args`.
    ///
    /// Returns the most recent result, which is stale when this call was queued.
    pub fn call(&self, args: A) -> Option<R>
    where
        R: Clone,
    {
        let now = now();
        {
            let mut d = self.0.data.borrow_mut();
            // A call made from inside the function is queued behind it.
            let running = self.0.f.try_borrow_mut().is_err();
            let remaining = d
                .remaining(now, self.0.delay)
                .or(running.then_some(Duration::ZERO));
            if let Some(remaining) = remaining {
                if d.args.replace(args).is_some() {
                    tracing::debug!("throttle: queued call replaced");
                }
                if d.timer.is_none() {
                    let node = Rc::downgrade(&self.0);
                    d.timer = Some(Timer::schedule(remaining, move || {
                        ThrottleNode::fire(&node);
                    }));
                }
                return d.result.clone();
            }
        }
        self.0.run(args, now);
        self.last_result()
    }

    /// Drops the queued call, if any.
    pub fn cancel(&self) {
        let (timer, args) = {
            let mut d = self.0.data.borrow_mut();
            (d.timer.take(), d.args.take())
        };
        drop(timer);
        drop(args);
    }

    /// Returns `true` while a queued call is waiting for its window.
    pub fn is_pending(&self) -> bool {
        self.0.data.borrow().args.is_some()
    }

    pub fn last_result(&self) -> Option<R>
    where
        R: Clone,
    {
        self.0.data.borrow().result.clone()
    }
}

impl<A, R> ThrottleNode<A, R> {
    fn fire(node: &Weak<Self>) {
        let Some(node) = node.upgrade() else {
            return;
        };
        let (timer, args) = {
            let mut d = node.data.borrow_mut();
            (d.timer.take(), d.args.take())
        };
        drop(timer);
        if let Some(args) = args {
            node.run(args, now());
        }
    }

    fn run(&self, args: A, now: Instant) {
        let stale = {
            let mut d = self.data.borrow_mut();
            d.last_run = Some(now);
            // A queued call is superseded by one that runs immediately.
            (d.timer.take(), d.args.take())
        };
        drop(stale);
        let result = (self.f.borrow_mut())(args);
        self.data.borrow_mut().result = Some(result);
    }
}
