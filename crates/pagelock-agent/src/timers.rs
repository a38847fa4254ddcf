//! Deferred callbacks in the page context (`setTimeout`)

use std::cell::RefCell;
use std::time::Duration;

/// Task scheduled to run later on the page's thread
pub type TimerTask = Box<dyn FnOnce()>;

/// Schedules tasks on the page's event loop
pub trait Timers {
    fn set_timeout(&self, delay: Duration, task: TimerTask);
}

/// Timers backed by the tokio runtime.
///
/// Tasks are spawned with `spawn_local`, so this must be used from within a
/// `tokio::task::LocalSet`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTimers;

impl Timers for TokioTimers {
    fn set_timeout(&self, delay: Duration, task: TimerTask) {
        tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            task();
        });
    }
}

/// Timers that only fire when asked to. Used where the page loop is driven
/// by hand.
#[derive(Default)]
pub struct QueuedTimers {
    pending: RefCell<Vec<(Duration, TimerTask)>>,
}

impl QueuedTimers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Run everything queued so far. Tasks queued while running are kept for
    /// the next call. Returns how many tasks ran.
    pub fn run_pending(&self) -> usize {
        let due: Vec<(Duration, TimerTask)> = self.pending.borrow_mut().drain(..).collect();
        let count = due.len();
        for (_, task) in due {
            task();
        }
        count
    }
}

impl Timers for QueuedTimers {
    fn set_timeout(&self, delay: Duration, task: TimerTask) {
        self.pending.borrow_mut().push((delay, task));
    }
}
