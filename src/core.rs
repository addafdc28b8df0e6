use std::{
    cell::RefCell,
    collections::BTreeMap,
    marker::PhantomData,
    mem::take,
    panic::{catch_unwind, AssertUnwindSafe},
    rc::Rc,
    thread::AccessError,
    time::{Duration, Instant},
};

use derive_ex::derive_ex;
use parse_display::Display;
use slabmap::SlabMap;

use crate::DeferredExecutionFault;

mod sleep;

#[cfg(test)]
mod tests;

thread_local! {
    static GLOBALS: RefCell<Globals> = RefCell::new(Globals::new());
}

struct Globals {
    is_runtime_exists: bool,
    epoch: u64,
    clock: Clock,
    timers: TimerQueue,
}
impl Globals {
    fn new() -> Self {
        Self {
            is_runtime_exists: false,
            epoch: 0,
            clock: Clock::System,
            timers: TimerQueue::new(),
        }
    }
    fn with<T>(f: impl FnOnce(&mut Self) -> T) -> T {
        GLOBALS.with(|g| f(&mut g.borrow_mut()))
    }
    fn try_with<T>(f: impl FnOnce(&mut Self) -> T) -> Result<T, AccessError> {
        GLOBALS.try_with(|g| f(&mut g.borrow_mut()))
    }
    fn assert_exists(&self) {
        if !self.is_runtime_exists {
            panic!("`Runtime` is not created.");
        }
    }
    fn now(&self) -> Instant {
        self.clock.now()
    }

    fn take_due(&mut self) -> Option<(usize, Box<dyn FnOnce()>)> {
        let now = self.now();
        self.timers.take_due(now)
    }
}

/// Source of the current time for a [`Runtime`].
#[derive(Debug, Clone, Copy, Display, PartialEq, Eq)]
pub enum ClockKind {
    /// Follows [`Instant::now`].
    #[display("system")]
    System,
    /// Moves only when the runtime is advanced.
    #[display("manual")]
    Manual,
}

#[derive(Clone, Copy)]
enum Clock {
    System,
    Manual(Instant),
}
impl Clock {
    fn now(&self) -> Instant {
        match self {
            Clock::System => Instant::now(),
            Clock::Manual(now) => *now,
        }
    }
    fn kind(&self) -> ClockKind {
        match self {
            Clock::System => ClockKind::System,
            Clock::Manual(_) => ClockKind::Manual,
        }
    }
}

/// Single-threaded event loop that owns the timer queue.
///
/// Every scheduling primitive in this crate arms its timers here,
/// and callbacks only ever run from this runtime's methods on the thread that created it.
/// Only one `Runtime` can exist in a thread at a time.
///
/// Dropping the runtime discards all pending timers without running them.
#[derive_ex(Default)]
#[default(Self::new())]
pub struct Runtime {
    _not_send: PhantomData<Rc<()>>,
}
impl Runtime {
    /// Creates a runtime driven by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Clock::System)
    }

    /// Creates a runtime whose clock only moves through [`advance`](Self::advance)
    /// and [`wait_for_ready`](Self::wait_for_ready).
    pub fn with_manual_clock() -> Self {
        Self::with_clock(Clock::Manual(Instant::now()))
    }

    fn with_clock(clock: Clock) -> Self {
        Globals::with(|g| {
            if g.is_runtime_exists {
                panic!("Only one `Runtime` can exist in the same thread at the same time.");
            }
            g.is_runtime_exists = true;
            g.epoch += 1;
            g.clock = clock;
        });
        tracing::debug!(clock = %clock.kind(), "runtime created");
        Self {
            _not_send: PhantomData,
        }
    }

    pub fn clock_kind(&self) -> ClockKind {
        Globals::with(|g| g.clock.kind())
    }

    /// Current time as seen by the timers.
    pub fn now(&self) -> Instant {
        Globals::with(|g| g.now())
    }

    /// Number of armed timers that have not fired yet.
    pub fn pending_timers(&self) -> usize {
        Globals::with(|g| g.timers.tasks.len())
    }

    /// Deadline of the earliest armed timer.
    pub fn next_deadline(&self) -> Option<Instant> {
        Globals::with(|g| g.timers.next_deadline())
    }

    /// Fires every timer whose deadline has been reached, in deadline order.
    ///
    /// Timers armed by a callback that are already due fire in the same call.
    ///
    /// Returns the number of callbacks that ran.
    /// If a callback panics, the remaining due timers stay queued and the panic is returned as an error.
    pub fn run_timers(&mut self) -> Result<usize, DeferredExecutionFault> {
        let mut count = 0;
        while let Some((index, callback)) = Globals::with(|g| g.take_due()) {
            tracing::trace!(timer = index, "timer fired");
            if let Err(payload) = catch_unwind(AssertUnwindSafe(callback)) {
                let fault = DeferredExecutionFault::from_panic(payload);
                tracing::error!(timer = index, %fault, "deferred callback panicked");
                return Err(fault);
            }
            count += 1;
        }
        Ok(count)
    }

    /// Moves the manual clock forward by `duration`, firing timers at their deadlines on the way.
    ///
    /// Panics if the runtime uses the system clock.
    pub fn advance(&mut self, duration: Duration) -> Result<usize, DeferredExecutionFault> {
        let target = Globals::with(|g| match g.clock {
            Clock::Manual(now) => deadline_after(now, duration),
            Clock::System => panic!("`Runtime::advance` requires a manual clock."),
        });
        let mut count = self.run_timers()?;
        while let Some(deadline) = self.next_deadline() {
            if deadline > target {
                break;
            }
            self.set_manual_now(deadline);
            count += self.run_timers()?;
        }
        self.set_manual_now(target);
        count += self.run_timers()?;
        Ok(count)
    }

    fn set_manual_now(&mut self, instant: Instant) {
        Globals::with(|g| {
            if let Clock::Manual(now) = &mut g.clock {
                if instant > *now {
                    *now = instant;
                }
            }
        })
    }

    /// Wait until the earliest armed timer is due.
    ///
    /// Returns immediately if no timer is armed.
    /// With a manual clock, the clock jumps to the deadline instead of waiting.
    pub async fn wait_for_ready(&mut self) {
        let Some(deadline) = self.next_deadline() else {
            return;
        };
        match self.clock_kind() {
            ClockKind::Manual => self.set_manual_now(deadline),
            ClockKind::System => sleep::sleep_until(deadline).await,
        }
    }

    /// Fires timers as they become due until none are armed.
    ///
    /// Returns the number of callbacks that ran.
    pub async fn run_until_idle(&mut self) -> Result<usize, DeferredExecutionFault> {
        let mut count = 0;
        loop {
            count += self.run_timers()?;
            if self.pending_timers() == 0 {
                return Ok(count);
            }
            self.wait_for_ready().await;
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        let timers = Globals::with(|g| {
            g.is_runtime_exists = false;
            g.epoch += 1;
            g.clock = Clock::System;
            take(&mut g.timers)
        });
        if !timers.tasks.is_empty() {
            tracing::debug!(discarded = timers.tasks.len(), "runtime dropped with armed timers");
        }
        // Callbacks may own `Timer`s whose drop reenters `Globals`.
        drop(timers);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TimerId {
    epoch: u64,
    index: usize,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Key {
    deadline: Instant,
    seq: u64,
}

struct TimerEntry {
    key: Key,
    /// `None` once the timer has fired.
    callback: Option<Box<dyn FnOnce()>>,
}

#[derive_ex(Default)]
#[default(Self::new())]
struct TimerQueue {
    next_seq: u64,
    tasks: BTreeMap<Key, usize>,
    entries: SlabMap<TimerEntry>,
}

impl TimerQueue {
    fn new() -> Self {
        Self {
            next_seq: 0,
            tasks: BTreeMap::new(),
            entries: SlabMap::new(),
        }
    }

    fn insert(&mut self, deadline: Instant, callback: Box<dyn FnOnce()>) -> usize {
        let key = Key {
            deadline,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        let index = self.entries.insert(TimerEntry {
            key,
            callback: Some(callback),
        });
        self.tasks.insert(key, index);
        index
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.tasks.first_key_value().map(|(key, _)| key.deadline)
    }

    fn take_due(&mut self, now: Instant) -> Option<(usize, Box<dyn FnOnce()>)> {
        let entry = self.tasks.first_entry()?;
        if entry.key().deadline > now {
            return None;
        }
        let index = entry.remove();
        let callback = self.entries.get_mut(index)?.callback.take()?;
        Some((index, callback))
    }

    fn is_pending(&self, index: usize) -> bool {
        self.entries
            .get(index)
            .is_some_and(|e| e.callback.is_some())
    }

    fn deadline(&self, index: usize) -> Option<Instant> {
        let e = self.entries.get(index)?;
        e.callback.as_ref().map(|_| e.key.deadline)
    }

    fn remove(&mut self, index: usize) -> Option<Box<dyn FnOnce()>> {
        let e = self.entries.remove(index)?;
        if e.callback.is_some() {
            self.tasks.remove(&e.key);
        }
        e.callback
    }
}

/// Returns the current time of the thread's runtime.
///
/// Panics if no [`Runtime`] exists.
pub(crate) fn now() -> Instant {
    Globals::with(|g| {
        g.assert_exists();
        g.now()
    })
}

/// `now + delay`, saturated to a far-future instant when the sum overflows.
fn deadline_after(now: Instant, delay: Duration) -> Instant {
    if let Some(deadline) = now.checked_add(delay) {
        return deadline;
    }
    tracing::debug!(?delay, "delay saturated");
    let mut delay = delay;
    loop {
        delay /= 2;
        if let Some(deadline) = now.checked_add(delay) {
            return deadline;
        }
    }
}

/// Handle to one callback armed in the runtime's timer queue.
///
/// Dropping the handle cancels the callback if it has not fired yet.
#[must_use = "dropping a `Timer` cancels it"]
pub struct Timer {
    id: Option<TimerId>,
}

impl Timer {
    /// Arms `f` to run once after `delay`.
    ///
    /// Panics if no [`Runtime`] exists.
    pub fn schedule(delay: Duration, f: impl FnOnce() + 'static) -> Self {
        let id = Globals::with(|g| {
            g.assert_exists();
            let deadline = deadline_after(g.now(), delay);
            TimerId {
                epoch: g.epoch,
                index: g.timers.insert(deadline, Box::new(f)),
            }
        });
        tracing::trace!(timer = id.index, ?delay, "timer armed");
        Self { id: Some(id) }
    }

    /// Returns `true` until the callback fires or the timer is canceled.
    pub fn is_pending(&self) -> bool {
        self.with_entry(|timers, index| timers.is_pending(index))
            .unwrap_or(false)
    }

    /// When the callback is due, or `None` if it is no longer pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.with_entry(|timers, index| timers.deadline(index))
            .flatten()
    }

    /// Cancels the callback. Does nothing if it already fired.
    pub fn cancel(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        let callback = Globals::try_with(|g| {
            if g.epoch == id.epoch {
                g.timers.remove(id.index)
            } else {
                None
            }
        });
        if let Ok(Some(callback)) = callback {
            tracing::trace!(timer = id.index, "timer canceled");
            // Dropped outside of `Globals` because captured state may own other timers.
            drop(callback);
        }
    }

    fn with_entry<T>(&self, f: impl FnOnce(&TimerQueue, usize) -> T) -> Option<T> {
        let id = self.id?;
        Globals::try_with(|g| (g.epoch == id.epoch).then(|| f(&g.timers, id.index)))
            .ok()
            .flatten()
    }
}
impl Drop for Timer {
    fn drop(&mut self) {
        self.cancel();
    }
}
impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("is_pending", &self.is_pending())
            .finish()
    }
}
