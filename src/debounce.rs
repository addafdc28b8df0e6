use std::{
    cell::RefCell,
    rc::{Rc, Weak},
    time::Duration,
};

use derive_ex::derive_ex;

use crate::{IntoDelay, Timer, DEFAULT_DEBOUNCE_WAIT};


/// Defers a function until calls stop arriving for a quiet period.
///
/// Each [`call`](Self::call) stores its arguments and restarts the wait.
/// When the wait elapses without another call, the function runs once with the arguments of the last call;
/// arguments of earlier calls are discarded.
///
/// The function never runs inside `call`. It runs from the [`Runtime`](crate::Runtime) when the timer fires.
///
/// Cloning shares the same state. When the last clone is dropped, the pending call is canceled.
#[derive_ex(Clone, bound())]
pub struct Debounce<A: 'static, R: 'static>(Rc<DebounceNode<A, R>>);

struct DebounceNode<A, R> {
    f: RefCell<Box<dyn FnMut(A) -> R>>,
    wait: Duration,
    data: RefCell<DebounceData<A, R>>,
}

struct DebounceData<A, R> {
    timer: Option<Timer>,
    args: Option<A>,
    result: Option<R>,
}

impl<A: 'static, R: 'static> Debounce<A, R> {
    /// Wraps `f` with the given wait.
    ///
    /// `None` selects [`DEFAULT_DEBOUNCE_WAIT`]; invalid values are coerced to zero.
    pub fn new(f: impl FnMut(A) -> R + 'static, wait: impl IntoDelay) -> Self {
        Self(Rc::new(DebounceNode {
            f: RefCell::new(Box::new(f)),
            wait: wait.into_delay_or(DEFAULT_DEBOUNCE_WAIT),
            data: RefCell::new(DebounceData {
                timer: None,
                args: None,
                result: None,
            }),
        }))
    }

    /// Wraps `f` with a wait of [`DEFAULT_DEBOUNCE_WAIT`].
    pub fn with_default_wait(f: impl FnMut(A) -> R + 'static) -> Self {
        Self::new(f, DEFAULT_DEBOUNCE_WAIT)
    }

    pub fn wait(&self) -> Duration {
        self.0.wait
    }

    /// Records `args` and restarts the wait.
    ///
    /// Returns the result of the last completed run, not of this call.
    pub fn call(&self, args: A) -> Option<R>
    where
        R: Clone,
    {
        let mut d = self.0.data.borrow_mut();
        if let Some(mut timer) = d.timer.take() {
            if timer.is_pending() {
                tracing::debug!("debounce: pending call superseded");
            }
            timer.cancel();
        }
        d.args = Some(args);
        let node = Rc::downgrade(&self.0);
        d.timer = Some(Timer::schedule(self.0.wait, move || {
            DebounceNode::fire(&node);
        }));
        d.result.clone()
    }

    /// Drops the pending call, if any.
    pub fn cancel(&self) {
        let (timer, args) = {
            let mut d = self.0.data.borrow_mut();
            (d.timer.take(), d.args.take())
        };
        drop(timer);
        drop(args);
    }

    /// Runs the pending call now instead of waiting.
    ///
    /// Called from inside the wrapped function, this does nothing and the pending call keeps its timer.
    ///
    /// Returns the result of the last completed run, which is the flushed call's result if one was pending.
    pub fn flush(&self) -> Option<R>
    where
        R: Clone,
    {
        self.0.run();
        self.last_result()
    }

    /// Returns `true` while a call is waiting to run.
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

impl<A, R> DebounceNode<A, R> {
    fn fire(node: &Weak<Self>) {
        if let Some(node) = node.upgrade() {
            node.run();
        }
    }

    fn run(&self) {
        // While the function is running, the pending call stays armed.
        let Ok(mut f) = self.f.try_borrow_mut() else {
            tracing::warn!("debounce: re-entrant run skipped");
            return;
        };
        let (timer, args) = {
            let mut d = self.data.borrow_mut();
            (d.timer.take(), d.args.take())
        };
        drop(timer);
        let Some(args) = args else {
            return;
        };
        let result = f(args);
        drop(f);
        self.data.borrow_mut().result = Some(result);
    }
}
