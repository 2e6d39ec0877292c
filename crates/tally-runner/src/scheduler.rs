//! Scheduling port - deferred execution between tests
//!
//! The runner never starts the next test from inside a report. It hands a
//! [`Continuation`] to a [`Scheduler`], which must run it exactly once, after
//! the current call stack has unwound, in submission order.
//!
//! Two implementations ship here:
//! - [`ManualScheduler`] queues continuations until the host drains them.
//! - [`LocalScheduler`] spawns them onto the current tokio `LocalSet`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Work deferred to a later turn of the host loop
pub type Continuation = Box<dyn FnOnce() + 'static>;

/// Capability to run a continuation after yielding back to the host
pub trait Scheduler {
    fn defer(&self, continuation: Continuation);
}

/// FIFO scheduler drained explicitly by the host
///
/// Clones share one queue. Continuations are never run from inside
/// [`Scheduler::defer`]; they run when the host calls [`run_next`] or
/// [`run_until_idle`].
///
/// [`run_next`]: ManualScheduler::run_next
/// [`run_until_idle`]: ManualScheduler::run_until_idle
#[derive(Clone, Default)]
pub struct ManualScheduler {
    queue: Rc<RefCell<VecDeque<Continuation>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of continuations waiting to run
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Run the oldest pending continuation, if any
    pub fn run_next(&self) -> bool {
        // The borrow must end before the continuation runs: it may defer again.
        let next = self.queue.borrow_mut().pop_front();
        match next {
            Some(continuation) => {
                continuation();
                true
            }
            None => false,
        }
    }

    /// Run continuations until the queue is empty, including any deferred
    /// while draining. Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl Scheduler for ManualScheduler {
    fn defer(&self, continuation: Continuation) {
        self.queue.borrow_mut().push_back(continuation);
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Scheduler backed by `tokio::task::spawn_local`
///
/// Must be used from inside a `LocalSet` (for example under
/// `LocalSet::run_until` or `LocalSet::block_on`); `spawn_local` panics
/// anywhere else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalScheduler {
    delay: Duration,
}

impl LocalScheduler {
    /// Yield once before each continuation
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` before each continuation instead of yielding
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Scheduler for LocalScheduler {
    fn defer(&self, continuation: Continuation) {
        let delay = self.delay;
        tokio::task::spawn_local(async move {
            if delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(delay).await;
            }
            continuation();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tokio::task::LocalSet;

    #[test]
    fn test_manual_defer_is_not_inline() {
        let scheduler = ManualScheduler::new();
        let ran = Rc::new(Cell::new(false));
        let flag = ran.clone();

        scheduler.defer(Box::new(move || flag.set(true)));

        assert!(!ran.get());
        assert_eq!(scheduler.pending(), 1);
        assert!(scheduler.run_next());
        assert!(ran.get());
        assert!(!scheduler.run_next());
    }

    #[test]
    fn test_manual_preserves_order_and_drains_nested() {
        let scheduler = ManualScheduler::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let order = order.clone();
            let inner = scheduler.clone();
            scheduler.defer(Box::new(move || {
                order.borrow_mut().push(i);
                if i == 0 {
                    let order = order.clone();
                    inner.defer(Box::new(move || order.borrow_mut().push(10)));
                }
            }));
        }

        assert_eq!(scheduler.run_until_idle(), 4);
        assert_eq!(*order.borrow(), vec![0, 1, 2, 10]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_local_scheduler_runs_after_yield() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let ran = Rc::new(Cell::new(0));
                let scheduler = LocalScheduler::new();

                let first = ran.clone();
                scheduler.defer(Box::new(move || first.set(first.get() + 1)));
                let second = ran.clone();
                scheduler.defer(Box::new(move || second.set(second.get() + 10)));
                assert_eq!(ran.get(), 0);

                for _ in 0..10 {
                    tokio::task::yield_now().await;
                }
                assert_eq!(ran.get(), 11);
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_local_scheduler_with_delay() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let ran = Rc::new(Cell::new(false));
                let scheduler = LocalScheduler::new().with_delay(Duration::from_millis(50));
                assert_eq!(scheduler.delay(), Duration::from_millis(50));

                let flag = ran.clone();
                scheduler.defer(Box::new(move || flag.set(true)));

                tokio::time::sleep(Duration::from_millis(10)).await;
                assert!(!ran.get());
                tokio::time::sleep(Duration::from_millis(100)).await;
                assert!(ran.get());
            })
            .await;
    }
}
