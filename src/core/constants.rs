// ============================================================================
// spark-hooks - Constants
// Defaults shared by the hooks and the in-memory host
// ============================================================================

use std::time::Duration;

// =============================================================================
// CALENDAR ARITHMETIC
// =============================================================================

/// Milliseconds in one second
pub const MS_PER_SECOND: i64 = 1_000;

/// Milliseconds in one minute
pub const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;

/// Milliseconds in one hour
pub const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;

/// Milliseconds in one day (`864e5`)
pub const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

// =============================================================================
// COOKIES
// =============================================================================

/// Cookie lifetime when `CookieOptions::days` is not overridden
pub const DEFAULT_COOKIE_DAYS: f64 = 7.0;

/// Cookie path when `CookieOptions::path` is not overridden
pub const DEFAULT_COOKIE_PATH: &str = "/";

/// `expires=` value that deletes a cookie
pub const EXPIRED_COOKIE_DATE: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// Format of `Date.prototype.toUTCString()`
pub const COOKIE_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

// =============================================================================
// TIMING
// =============================================================================

/// Countdown refresh cadence
pub const DEFAULT_COUNTDOWN_REFRESH: Duration = Duration::from_millis(1_000);

/// Long-press threshold
pub const DEFAULT_LONG_PRESS_DELAY: Duration = Duration::from_millis(400);

/// Idle time after the last scroll event before `is_scrolling` clears
pub const DEFAULT_SCROLL_IDLE: Duration = Duration::from_millis(150);

/// Animation-frame cadence of the virtual scheduler (~60 Hz)
pub const FRAME_INTERVAL_MS: i64 = 16;

// =============================================================================
// EVENT NAMES
// =============================================================================

pub const EVENT_KEYDOWN: &str = "keydown";
pub const EVENT_KEYUP: &str = "keyup";
pub const EVENT_MOUSEDOWN: &str = "mousedown";
pub const EVENT_MOUSEUP: &str = "mouseup";
pub const EVENT_MOUSEENTER: &str = "mouseenter";
pub const EVENT_MOUSELEAVE: &str = "mouseleave";
pub const EVENT_TOUCHSTART: &str = "touchstart";
pub const EVENT_TOUCHEND: &str = "touchend";
pub const EVENT_TOUCHCANCEL: &str = "touchcancel";
pub const EVENT_RESIZE: &str = "resize";
pub const EVENT_SCROLL: &str = "scroll";
pub const EVENT_POPSTATE: &str = "popstate";
pub const EVENT_STORAGE: &str = "storage";
pub const EVENT_CHANGE: &str = "change";

// =============================================================================
// TESTS
// =============================================================================
