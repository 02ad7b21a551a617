// ============================================================================
// spark-hooks - Timer
// Stepwise count up or down with start/pause/reset controls
// ============================================================================

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::core::context;
use crate::core::types::TimerId;
use crate::host::scheduler::Scheduler;
use crate::host::window::Window;
use crate::macros::impl_lifecycle;
use crate::primitives::cell::{ReadCell, ValueCell};
use crate::primitives::lifecycle::Attachment;
use crate::reactivity::equality::safe_equals_f64;

/// Timer configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerOptions {
    /// Amount added (or removed) per tick; a tick happens every `step` seconds
    pub step: f64,
    pub count_down: bool,
}

impl Default for TimerOptions {
    fn default() -> Self {
        Self {
            step: 1.0,
            count_down: false,
        }
    }
}

impl TimerOptions {
    fn cadence(&self) -> Duration {
        Duration::try_from_secs_f64(self.step).unwrap_or(Duration::ZERO)
    }
}

struct TimerInner {
    window: Option<Window>,
    initial: f64,
    options: TimerOptions,
    time: ValueCell<f64>,
    running: ValueCell<bool>,
    ticker: Cell<Option<TimerId>>,
    attachment: Attachment,
}

impl TimerInner {
    fn tick(&self) {
        let TimerOptions { step, count_down } = self.options;
        let next = if count_down {
            self.time.get() - step
        } else {
            self.time.get() + step
        };

        if count_down && next <= 0.0 {
            self.time.set(0.0);
            self.stop();
            tracing::debug!("timer reached zero");
            return;
        }
        self.time.set(next);
    }

    fn start(self: &Rc<Self>) {
        if self.running.get() || !self.attachment.is_attached() {
            return;
        }
        let Some(window) = &self.window else {
            return;
        };

        let weak: Weak<Self> = Rc::downgrade(self);
        let id = window.scheduler().set_interval(
            self.options.cadence(),
            Rc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.tick();
                }
            }),
        );
        self.ticker.set(Some(id));
        self.running.set(true);
    }

    /// Cancel the schedule, if any, and mark the timer stopped.
    fn stop(&self) {
        if let (Some(id), Some(window)) = (self.ticker.take(), &self.window) {
            window.scheduler().cancel(id);
        }
        self.running.set(false);
    }

    fn attach(self: &Rc<Self>) {
        let weak: Weak<Self> = Rc::downgrade(self);
        self.attachment.attach(|teardown| {
            teardown.push(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.stop();
                }
            });
        });
    }
}

impl Drop for TimerInner {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A controllable stepping timer.
#[derive(Clone)]
pub struct Timer {
    inner: Rc<TimerInner>,
}

impl Timer {
    pub fn time(&self) -> ReadCell<f64> {
        self.inner.time.read_only()
    }

    pub fn get(&self) -> f64 {
        self.inner.time.get()
    }

    pub fn is_running(&self) -> ReadCell<bool> {
        self.inner.running.read_only()
    }

    /// Start ticking. No-op while running or inactive.
    pub fn start(&self) {
        self.inner.start();
    }

    /// Stop ticking, keeping the current time. No-op unless running.
    pub fn pause(&self) {
        if self.inner.running.get() {
            self.inner.stop();
        }
    }

    /// Stop and go back to the initial time.
    pub fn reset(&self) {
        self.inner.stop();
        self.inner.time.set(self.inner.initial);
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("time", &self.inner.time.get())
            .field("running", &self.inner.running.get())
            .field("options", &self.inner.options)
            .finish()
    }
}

impl_lifecycle!(Timer);

/// A timer starting at `initial`, stopped.
///
/// Counting down stops by itself at exactly zero. Deactivation pauses.
///
/// # Example
///
/// ```
/// use spark_hooks::{use_timer, MemoryHost, TimerOptions};
///
/// let host = MemoryHost::new();
/// let _guard = host.install();
///
/// let timer = use_timer(3.0, TimerOptions { count_down: true, ..Default::default() });
/// timer.start();
/// host.advance_ms(5_000);
/// assert_eq!(timer.get(), 0.0);
/// assert!(!timer.is_running().get());
/// ```
pub fn use_timer(initial: f64, options: TimerOptions) -> Timer {
    super::mount(Timer {
        inner: Rc::new(TimerInner {
            window: context::window(),
            initial,
            options,
            time: ValueCell::new_with_equals(initial, safe_equals_f64),
            running: ValueCell::new(false),
            ticker: Cell::new(None),
            attachment: Attachment::new(),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryHost;
    use crate::primitives::lifecycle::Lifecycle;

    #[test]
    fn counts_up_every_step_seconds() {
        let host = MemoryHost::new();
        let _guard = host.install();

        let timer = use_timer(0.0, TimerOptions::default());
        timer.start();
        assert!(timer.is_running().get());
        host.advance_ms(3_000);
        assert_eq!(timer.get(), 3.0);
    }

    #[test]
    fn step_sets_cadence_and_increment() {
        let host = MemoryHost::new();
        let _guard = host.install();

        let timer = use_timer(10.0, TimerOptions { step: 2.0, count_down: false });
        timer.start();
        host.advance_ms(3_999);
        assert_eq!(timer.get(), 12.0);
        host.advance_ms(1);
        assert_eq!(timer.get(), 14.0);
    }

    #[test]
    fn count_down_clamps_at_zero_and_stops() {
        let host = MemoryHost::new();
        let _guard = host.install();

        let timer = use_timer(5.0, TimerOptions { step: 2.0, count_down: true });
        timer.start();
        host.advance_ms(4_000);
        assert_eq!(timer.get(), 1.0);
        host.advance_ms(2_000);
        assert_eq!(timer.get(), 0.0);
        assert!(!timer.is_running().get());
        assert_eq!(host.scheduler().pending_count(), 0);
    }

    #[test]
    fn start_twice_keeps_one_schedule() {
        let host = MemoryHost::new();
        let _guard = host.install();

        let timer = use_timer(0.0, TimerOptions::default());
        timer.start();
        timer.start();
        assert_eq!(host.scheduler().pending_count(), 1);
        host.advance_ms(1_000);
        assert_eq!(timer.get(), 1.0);
    }

    #[test]
    fn pause_keeps_time_and_reset_restores_initial() {
        let host = MemoryHost::new();
        let _guard = host.install();

        let timer = use_timer(7.0, TimerOptions::default());
        timer.pause();
        assert!(!timer.is_running().get());

        timer.start();
        host.advance_ms(2_000);
        timer.pause();
        host.advance_ms(5_000);
        assert_eq!(timer.get(), 9.0);

        timer.start();
        host.advance_ms(500);
        timer.reset();
        assert_eq!(timer.get(), 7.0);
        assert!(!timer.is_running().get());
        assert_eq!(host.scheduler().pending_count(), 0);
    }

    #[test]
    fn deactivation_pauses() {
        let host = MemoryHost::new();
        let _guard = host.install();

        let timer = use_timer(0.0, TimerOptions::default());
        timer.start();
        timer.deactivate();
        assert!(!timer.is_running().get());

        timer.start();
        assert!(!timer.is_running().get());
        timer.activate();
        timer.start();
        host.advance_ms(1_000);
        assert_eq!(timer.get(), 1.0);
    }

    #[test]
    fn without_window_start_is_inert() {
        let timer = use_timer(1.0, TimerOptions::default());
        timer.start();
        assert!(!timer.is_running().get());
        assert_eq!(timer.get(), 1.0);
    }
}
