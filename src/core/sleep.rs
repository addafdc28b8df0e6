use std::{
    collections::BTreeMap,
    future::Future,
    pin::Pin,
    sync::{Condvar, LazyLock, Mutex, MutexGuard},
    task::{Context, Poll, Waker},
    time::Instant,
};

use slabmap::SlabMap;

static SLEEPER: LazyLock<Sleeper> = LazyLock::new(|| Sleeper {
    queue: Mutex::new(SleepQueue::new()),
    condvar: Condvar::new(),
});

/// Wakes tasks waiting for a system-clock deadline.
///
/// A single background thread owns the waiting; it only wakes wakers and never runs callbacks.
struct Sleeper {
    queue: Mutex<SleepQueue>,
    condvar: Condvar,
}
impl Sleeper {
    fn run_worker(&self) {
        let mut wakes = Vec::new();
        let mut queue = lock(&self.queue);
        loop {
            let now = Instant::now();
            let q = &mut *queue;
            while let Some(task) = q.tasks.first_entry() {
                if task.key().0 > now {
                    break;
                }
                if let Some(waker) = q.entries.get_mut(*task.get()).and_then(|e| e.waker.take()) {
                    wakes.push(waker);
                }
                task.remove();
            }
            if !wakes.is_empty() {
                drop(queue);
                for waker in wakes.drain(..) {
                    waker.wake();
                }
                queue = lock(&self.queue);
                continue;
            }
            queue = if let Some((&(deadline, _), _)) = queue.tasks.first_key_value() {
                let wait = deadline.saturating_duration_since(now);
                match self.condvar.wait_timeout(queue, wait) {
                    Ok((queue, _)) => queue,
                    Err(e) => e.into_inner().0,
                }
            } else {
                match self.condvar.wait(queue) {
                    Ok(queue) => queue,
                    Err(e) => e.into_inner(),
                }
            };
        }
    }
}

fn lock(queue: &Mutex<SleepQueue>) -> MutexGuard<'_, SleepQueue> {
    queue.lock().unwrap_or_else(|e| e.into_inner())
}

struct SleepQueue {
    next_seq: u64,
    tasks: BTreeMap<(Instant, u64), usize>,
    entries: SlabMap<SleepEntry>,
    thread_running: bool,
}

struct SleepEntry {
    key: (Instant, u64),
    /// `None` once the deadline has passed and the waker was woken.
    waker: Option<Waker>,
}

impl SleepQueue {
    fn new() -> Self {
        Self {
            next_seq: 0,
            tasks: BTreeMap::new(),
            entries: SlabMap::new(),
            thread_running: false,
        }
    }

    fn insert(&mut self, deadline: Instant, waker: Waker) -> usize {
        self.ensure_thread_running();
        let key = (deadline, self.next_seq);
        self.next_seq += 1;
        let notify = match self.tasks.first_key_value() {
            Some((first, _)) => key < *first,
            None => true,
        };
        let id = self.entries.insert(SleepEntry {
            key,
            waker: Some(waker),
        });
        self.tasks.insert(key, id);
        if notify {
            SLEEPER.condvar.notify_one();
        }
        id
    }

    fn ensure_thread_running(&mut self) {
        if self.thread_running {
            return;
        }
        self.thread_running = true;
        std::thread::spawn(|| SLEEPER.run_worker());
    }

    fn poll_or_remove(&mut self, id: usize, cx: &Context) -> Poll<()> {
        match self.entries.get_mut(id).and_then(|e| e.waker.as_mut()) {
            Some(waker) => {
                if !waker.will_wake(cx.waker()) {
                    *waker = cx.waker().clone();
                }
                Poll::Pending
            }
            _ => {
                self.remove(id);
                Poll::Ready(())
            }
        }
    }

    fn remove(&mut self, id: usize) {
        if let Some(e) = self.entries.remove(id) {
            self.tasks.remove(&e.key);
        }
    }
}

struct SleepUntil {
    deadline: Instant,
    id: Option<usize>,
}

impl Future for SleepUntil {
    type Output = ();
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mut queue = lock(&SLEEPER.queue);
        match this.id {
            Some(id) => {
                let poll = queue.poll_or_remove(id, cx);
                if poll.is_ready() {
                    this.id = None;
                }
                poll
            }
            None if this.deadline <= Instant::now() => Poll::Ready(()),
            None => {
                this.id = Some(queue.insert(this.deadline, cx.waker().clone()));
                Poll::Pending
            }
        }
    }
}
impl Drop for SleepUntil {
    fn drop(&mut self) {
        if let Some(id) = self.id {
            lock(&SLEEPER.queue).remove(id);
        }
    }
}

/// Completes once the system clock reaches `deadline`.
pub(crate) async fn sleep_until(deadline: Instant) {
    SleepUntil { deadline, id: None }.await
}
