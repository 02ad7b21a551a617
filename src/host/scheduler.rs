// ============================================================================
// spark-hooks - Scheduler
// Wall clock, timeouts, intervals and animation frames
// ============================================================================
//
// The host event loop is the only source of "later". Hooks never block; they
// hand a task to the scheduler and keep the returned id so they can cancel
// it. `VirtualScheduler` is a deterministic event loop: time only moves when
// a test calls `advance`, and due tasks run in (due time, scheduling order).
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

use crate::core::constants::FRAME_INTERVAL_MS;
use crate::core::types::{FrameFn, RepeatFn, TaskFn, TimerId};

// =============================================================================
// TRAITS
// =============================================================================

/// Wall clock in milliseconds since the Unix epoch (`Date.now()`).
pub trait Clock {
    fn now(&self) -> i64;
}

/// Timer and animation-frame scheduling (`setTimeout`, `setInterval`,
/// `requestAnimationFrame` and their cancel functions).
pub trait Scheduler: Clock {
    fn set_timeout(&self, delay: Duration, task: TaskFn) -> TimerId;

    fn set_interval(&self, period: Duration, task: RepeatFn) -> TimerId;

    /// The task receives the frame timestamp in milliseconds.
    fn request_animation_frame(&self, task: FrameFn) -> TimerId;

    /// Cancel any kind of scheduled task. Returns `false` if it already ran
    /// or was cancelled.
    fn cancel(&self, id: TimerId) -> bool;

    /// Number of tasks still scheduled.
    fn pending_count(&self) -> usize;
}

pub(crate) fn duration_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

// =============================================================================
// VIRTUAL SCHEDULER
// =============================================================================

enum Task {
    Timeout(TaskFn),
    Interval { period: i64, task: RepeatFn },
    Frame(FrameFn),
}

/// Deterministic scheduler driven by `advance`.
pub struct VirtualScheduler {
    now: Cell<i64>,
    next_id: Cell<u64>,
    next_seq: Cell<u64>,
    /// (due, seq) -> id; entries of cancelled tasks are skipped lazily
    queue: RefCell<BTreeMap<(i64, u64), TimerId>>,
    tasks: RefCell<HashMap<TimerId, Task>>,
}

impl VirtualScheduler {
    /// A scheduler whose clock starts at the epoch.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// A scheduler whose clock starts at `now` ms since the epoch.
    pub fn starting_at(now: i64) -> Self {
        Self {
            now: Cell::new(now),
            next_id: Cell::new(1),
            next_seq: Cell::new(0),
            queue: RefCell::new(BTreeMap::new()),
            tasks: RefCell::new(HashMap::new()),
        }
    }

    fn enqueue(&self, due: i64, id: TimerId) {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        self.queue.borrow_mut().insert((due, seq), id);
    }

    fn insert(&self, due: i64, task: Task) -> TimerId {
        let id = TimerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.tasks.borrow_mut().insert(id, task);
        self.enqueue(due, id);
        id
    }

    /// Pop the earliest queue entry due at or before `limit`.
    fn pop_due(&self, limit: i64) -> Option<(i64, TimerId)> {
        let mut queue = self.queue.borrow_mut();
        let (&key, _) = queue.iter().next()?;
        if key.0 > limit {
            return None;
        }
        queue.remove(&key).map(|id| (key.0, id))
    }

    /// Move the clock forward by `by`, running every task that falls due on
    /// the way, each with the clock set to its due time.
    pub fn advance(&self, by: Duration) {
        let target = self.now.get().saturating_add(duration_ms(by));
        self.run_until(target);
    }

    /// Move the clock to the absolute time `at` (never backwards).
    pub fn advance_to(&self, at: i64) {
        self.run_until(at.max(self.now.get()));
    }

    /// Run whatever is due right now without moving the clock.
    pub fn run_due(&self) {
        self.run_until(self.now.get());
    }

    fn run_until(&self, target: i64) {
        while let Some((due, id)) = self.pop_due(target) {
            self.now.set(due.max(self.now.get()));

            // Take the task out before running it: it may schedule or cancel
            let task = self.tasks.borrow_mut().remove(&id);
            match task {
                None => continue,
                Some(Task::Timeout(task)) => task(),
                Some(Task::Frame(task)) => task(due as f64),
                Some(Task::Interval { period, task }) => {
                    // Re-arm first so the task can cancel its own interval
                    self.tasks.borrow_mut().insert(
                        id,
                        Task::Interval {
                            period,
                            task: task.clone(),
                        },
                    );
                    self.enqueue(due + period, id);
                    task();
                }
            }
        }
        self.now.set(target);
    }
}

impl Default for VirtualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for VirtualScheduler {
    fn now(&self) -> i64 {
        self.now.get()
    }
}

impl Scheduler for VirtualScheduler {
    fn set_timeout(&self, delay: Duration, task: TaskFn) -> TimerId {
        let due = self.now.get().saturating_add(duration_ms(delay));
        self.insert(due, Task::Timeout(task))
    }

    fn set_interval(&self, period: Duration, task: RepeatFn) -> TimerId {
        // Zero periods are clamped so a tick always moves time forward
        let period = duration_ms(period).max(1);
        self.insert(self.now.get() + period, Task::Interval { period, task })
    }

    fn request_animation_frame(&self, task: FrameFn) -> TimerId {
        let now = self.now.get();
        let next_frame = (now.div_euclid(FRAME_INTERVAL_MS) + 1) * FRAME_INTERVAL_MS;
        self.insert(next_frame, Task::Frame(task))
    }

    fn cancel(&self, id: TimerId) -> bool {
        self.tasks.borrow_mut().remove(&id).is_some()
    }

    fn pending_count(&self) -> usize {
        self.tasks.borrow().len()
    }
}

impl fmt::Debug for VirtualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualScheduler")
            .field("now", &self.now.get())
            .field("pending", &self.tasks.borrow().len())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
