// ============================================================================
// spark-hooks - Countdown
// Days/hours/minutes/seconds left until a target instant
// ============================================================================

use std::fmt;
use std::rc::{Rc, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};

use crate::core::constants::{
    DEFAULT_COUNTDOWN_REFRESH, MS_PER_DAY, MS_PER_HOUR, MS_PER_MINUTE, MS_PER_SECOND,
};
use crate::core::context;
use crate::host::scheduler::Scheduler;
use crate::host::window::Window;
use crate::macros::impl_lifecycle;
use crate::primitives::cell::{ReadCell, ValueCell};
use crate::primitives::lifecycle::Attachment;

/// Time left, split into whole units. Never negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CountdownParts {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl CountdownParts {
    /// Split `remaining_ms`; anything already past is all zeros.
    pub fn from_remaining(remaining_ms: i64) -> Self {
        if remaining_ms < 0 {
            return Self::default();
        }
        Self {
            days: remaining_ms / MS_PER_DAY,
            hours: remaining_ms % MS_PER_DAY / MS_PER_HOUR,
            minutes: remaining_ms % MS_PER_HOUR / MS_PER_MINUTE,
            seconds: remaining_ms % MS_PER_MINUTE / MS_PER_SECOND,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Display for CountdownParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}d {:02}:{:02}:{:02}",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

/// Wall clock used when no window is installed.
fn system_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

struct CountdownInner {
    window: Option<Window>,
    target_ms: i64,
    cadence: Duration,
    /// Raw `target - now`, may be negative
    remaining: ValueCell<i64>,
    attachment: Attachment,
}

impl CountdownInner {
    fn now(&self) -> i64 {
        self.window.as_ref().map_or_else(system_now, Window::now)
    }

    fn refresh(&self) {
        self.remaining.set(self.target_ms.saturating_sub(self.now()));
    }

    fn attach(self: &Rc<Self>) {
        let Some(window) = self.window.clone() else {
            return;
        };
        let weak: Weak<Self> = Rc::downgrade(self);

        self.attachment.attach(|teardown| {
            self.refresh();

            let scheduler = window.scheduler().clone();
            let id = scheduler.set_interval(
                self.cadence,
                Rc::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.refresh();
                    }
                }),
            );
            teardown.push(move || {
                scheduler.cancel(id);
            });
        });
    }
}

/// A live countdown.
#[derive(Clone)]
pub struct Countdown {
    inner: Rc<CountdownInner>,
}

impl Countdown {
    /// Milliseconds until the target as of the last refresh; negative once
    /// it has passed.
    pub fn remaining(&self) -> ReadCell<i64> {
        self.inner.remaining.read_only()
    }

    pub fn parts(&self) -> CountdownParts {
        CountdownParts::from_remaining(self.inner.remaining.get())
    }

    pub fn target_ms(&self) -> i64 {
        self.inner.target_ms
    }
}

impl fmt::Debug for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Countdown")
            .field("target_ms", &self.inner.target_ms)
            .field("cadence", &self.inner.cadence)
            .field("parts", &self.parts())
            .finish()
    }
}

impl_lifecycle!(Countdown);

/// Count down to `target_ms` (milliseconds since the Unix epoch), refreshing
/// every `refresh` (1 s when `None`).
///
/// # Example
///
/// ```
/// use spark_hooks::{use_countdown, MemoryHost};
///
/// let host = MemoryHost::new();
/// let _guard = host.install();
///
/// let launch = use_countdown(host.now() + 90_061_000, None);
/// let parts = launch.parts();
/// assert_eq!((parts.days, parts.hours, parts.minutes, parts.seconds), (1, 1, 1, 1));
///
/// host.advance_ms(2_000);
/// assert_eq!(launch.parts().seconds, 59);
/// ```
pub fn use_countdown(target_ms: i64, refresh: Option<Duration>) -> Countdown {
    let inner = CountdownInner {
        window: context::window(),
        target_ms,
        cadence: refresh.unwrap_or(DEFAULT_COUNTDOWN_REFRESH),
        remaining: ValueCell::new(0),
        attachment: Attachment::new(),
    };
    inner.refresh();
    super::mount(Countdown {
        inner: Rc::new(inner),
    })
}

/// Count down to `target`.
pub fn use_countdown_until(target: DateTime<Utc>, refresh: Option<Duration>) -> Countdown {
    use_countdown(target.timestamp_millis(), refresh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryHost;
    use crate::primitives::lifecycle::Lifecycle;
    use rstest::rstest;

    #[rstest]
    #[case(0, (0, 0, 0, 0))]
    #[case(999, (0, 0, 0, 0))]
    #[case(1_000, (0, 0, 0, 1))]
    #[case(3_661_000, (0, 1, 1, 1))]
    #[case(2 * MS_PER_DAY + 59_999, (2, 0, 0, 59))]
    #[case(-1, (0, 0, 0, 0))]
    #[case(-5 * MS_PER_DAY, (0, 0, 0, 0))]
    fn splits_remaining_time(#[case] remaining: i64, #[case] expected: (i64, i64, i64, i64)) {
        let p = CountdownParts::from_remaining(remaining);
        assert_eq!((p.days, p.hours, p.minutes, p.seconds), expected);
    }

    #[test]
    fn past_target_is_all_zero() {
        let host = MemoryHost::new();
        let _guard = host.install();

        let countdown = use_countdown(host.now() - 10_000, None);
        assert!(countdown.parts().is_zero());
        assert_eq!(countdown.remaining().get(), -10_000);
    }

    #[test]
    fn extreme_targets_saturate() {
        let host = MemoryHost::new();
        let _guard = host.install();

        let past = use_countdown(i64::MIN, None);
        assert_eq!(past.remaining().get(), i64::MIN);
        assert!(past.parts().is_zero());
        host.advance_ms(1_000);
        assert!(past.parts().is_zero());

        let far = use_countdown(i64::MAX, None);
        assert!(far.remaining().get() > 0);
        assert!(far.parts().days > 0);
    }

    #[test]
    fn refreshes_on_cadence() {
        let host = MemoryHost::new();
        let _guard = host.install();

        let countdown = use_countdown(host.now() + 10_000, Some(Duration::from_millis(500)));
        host.advance_ms(499);
        assert_eq!(countdown.remaining().get(), 10_000);
        host.advance_ms(1);
        assert_eq!(countdown.remaining().get(), 9_500);

        host.advance_ms(20_000);
        assert!(countdown.parts().is_zero());
    }

    #[test]
    fn until_accepts_chrono_instant() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let target = DateTime::<Utc>::from_timestamp_millis(host.now() + 61_000).unwrap();

        let countdown = use_countdown_until(target, None);
        assert_eq!(countdown.parts(), CountdownParts { days: 0, hours: 0, minutes: 1, seconds: 1 });
        assert_eq!(countdown.parts().to_string(), "0d 00:01:01");
    }

    #[test]
    fn reactivation_catches_up() {
        let host = MemoryHost::new();
        let _guard = host.install();
        let countdown = use_countdown(host.now() + 60_000, None);

        countdown.deactivate();
        host.advance_ms(30_000);
        assert_eq!(countdown.remaining().get(), 60_000);
        countdown.activate();
        assert_eq!(countdown.remaining().get(), 30_000);
    }
}
