// ============================================================================
// spark-hooks - Pending Timer
// At most one live single-shot timeout per slot
// ============================================================================

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::core::types::TimerId;
use crate::host::scheduler::Scheduler;

/// Slot owning the token of one deferred update.
///
/// Scheduling always cancels the previous token first, and dropping the slot
/// cancels whatever is still pending.
pub struct PendingTimer {
    scheduler: Rc<dyn Scheduler>,
    live: Rc<Cell<Option<TimerId>>>,
}

impl PendingTimer {
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            live: Rc::new(Cell::new(None)),
        }
    }

    /// Replace the pending task with `task`, due after `delay`.
    pub fn schedule(&self, delay: Duration, task: impl FnOnce() + 'static) -> TimerId {
        self.cancel();

        let live = Rc::downgrade(&self.live);
        let id = self.scheduler.set_timeout(
            delay,
            Box::new(move || {
                // Fired: the token is spent before the task runs, so the
                // task may schedule the next one
                if let Some(live) = live.upgrade() {
                    live.set(None);
                }
                task();
            }),
        );
        self.live.set(Some(id));
        id
    }

    /// Cancel the pending task. Returns `true` if one was pending.
    pub fn cancel(&self) -> bool {
        match self.live.take() {
            Some(id) => self.scheduler.cancel(id),
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.live.get().is_some()
    }
}

impl Drop for PendingTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for PendingTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTimer")
            .field("live", &self.live.get())
            .finish()
    }
}
