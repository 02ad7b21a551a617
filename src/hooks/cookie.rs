// ============================================================================
// spark-hooks - Cookie-Backed State
// One named cookie mirrored into a value cell
// ============================================================================

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};

use crate::core::constants::{
    COOKIE_DATE_FORMAT, DEFAULT_COOKIE_DAYS, DEFAULT_COOKIE_PATH, EXPIRED_COOKIE_DATE, MS_PER_DAY,
};
use crate::core::context;
use crate::core::error::HookError;
use crate::host::cookie::CookieJar;
use crate::host::window::Window;
use crate::macros::impl_lifecycle;
use crate::primitives::cell::{ReadCell, ValueCell};
use crate::primitives::lifecycle::Attachment;

// =============================================================================
// OPTIONS
// =============================================================================

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

/// Attributes applied when writing the cookie.
#[derive(Debug, Clone, PartialEq)]
pub struct CookieOptions {
    /// Lifetime in days; fractional values are honoured
    pub days: f64,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub same_site: SameSite,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            days: DEFAULT_COOKIE_DAYS,
            path: DEFAULT_COOKIE_PATH.to_string(),
            domain: None,
            secure: false,
            same_site: SameSite::Lax,
        }
    }
}

/// `Date.prototype.toUTCString()` of `at_ms`.
fn utc_string(at_ms: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(at_ms).map(|at| at.format(COOKIE_DATE_FORMAT).to_string())
}

/// Build the `document.cookie` assignment for `name=value` with `options`.
fn assignment(name: &str, value: &str, options: &CookieOptions, now: i64) -> String {
    let lifetime = (options.days * MS_PER_DAY as f64) as i64;
    let expires = utc_string(now.saturating_add(lifetime))
        .unwrap_or_else(|| EXPIRED_COOKIE_DATE.to_string());

    let mut parts = vec![
        format!("{name}={}", urlencoding::encode(value)),
        format!("expires={expires}"),
        format!("path={}", options.path),
    ];
    if let Some(domain) = &options.domain {
        parts.push(format!("domain={domain}"));
    }
    if options.secure {
        parts.push("secure".to_string());
    }
    parts.push(format!("SameSite={}", options.same_site.as_str()));
    parts.join("; ")
}

/// Find `name` in a `"a=1; b=2"` cookie string and percent-decode its value.
///
/// The value is everything after the first `=`, so values containing `=`
/// survive.
fn find_cookie(cookies: &str, name: &str) -> Option<Result<String, HookError>> {
    let raw = cookies
        .split("; ")
        .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))?;
    Some(
        urlencoding::decode(raw)
            .map(|decoded| decoded.into_owned())
            .map_err(|source| HookError::CookieDecode {
                name: name.to_string(),
                source,
            }),
    )
}

// =============================================================================
// BRIDGE
// =============================================================================

struct CookieInner {
    name: String,
    initial: String,
    window: Option<Window>,
    value: ValueCell<Option<String>>,
    /// Path and domain of the last write, used by `remove`
    scope: RefCell<(String, Option<String>)>,
    attachment: Attachment,
}

impl CookieInner {
    fn read(&self) -> Option<String> {
        let Some(window) = &self.window else {
            return Some(self.initial.clone());
        };
        match find_cookie(&window.cookies().cookie_string(), &self.name) {
            Some(Ok(value)) => Some(value),
            None => Some(self.initial.clone()),
            Some(Err(err)) => {
                tracing::warn!(name = %self.name, error = %err, "error reading cookie");
                Some(self.initial.clone())
            }
        }
    }

    fn write(&self, value: String, options: &CookieOptions) {
        let Some(window) = &self.window else {
            return;
        };
        let text = assignment(&self.name, &value, options, window.now());
        match window.cookies().set_cookie(&text) {
            Ok(()) => {
                *self.scope.borrow_mut() = (options.path.clone(), options.domain.clone());
                self.value.set(Some(value));
            }
            Err(err) => tracing::warn!(name = %self.name, error = %err, "error setting cookie"),
        }
    }

    fn remove(&self) {
        let Some(window) = &self.window else {
            return;
        };
        let (path, domain) = self.scope.borrow().clone();
        let mut text = format!("{}=; expires={EXPIRED_COOKIE_DATE}; path={path}", self.name);
        if let Some(domain) = domain {
            text.push_str(&format!("; domain={domain}"));
        }
        if let Err(err) = window.cookies().set_cookie(&text) {
            tracing::warn!(name = %self.name, error = %err, "error deleting cookie");
        }
        self.value.set(None);
    }

    /// Cookies have no change notification; activation re-reads the jar.
    fn attach(self: &Rc<Self>) {
        if self.window.is_none() {
            return;
        }
        self.attachment.attach(|_| {
            self.value.set(self.read());
        });
    }
}

// =============================================================================
// HANDLE
// =============================================================================

/// State persisted in one cookie. `None` once removed.
#[derive(Clone)]
pub struct CookieState {
    inner: Rc<CookieInner>,
}

impl CookieState {
    pub fn get(&self) -> Option<String> {
        self.inner.value.get()
    }

    pub fn value(&self) -> ReadCell<Option<String>> {
        self.inner.value.read_only()
    }

    /// Write the cookie with default attributes (7 days, path `/`, Lax).
    pub fn set(&self, value: impl Into<String>) {
        self.inner.write(value.into(), &CookieOptions::default());
    }

    /// Write the cookie with explicit attributes.
    pub fn set_with(&self, value: impl Into<String>, options: &CookieOptions) {
        self.inner.write(value.into(), options);
    }

    /// Expire the cookie and set the value to `None`.
    pub fn remove(&self) {
        self.inner.remove();
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }
}

impl fmt::Debug for CookieState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieState")
            .field("name", &self.inner.name)
            .field("value", &self.inner.value)
            .finish()
    }
}

impl_lifecycle!(CookieState);

/// State persisted in the cookie `name`, starting from `initial` when the
/// cookie is not set.
///
/// # Example
///
/// ```
/// use spark_hooks::{use_cookie_state, MemoryHost};
///
/// let host = MemoryHost::new();
/// let _guard = host.install();
///
/// let consent = use_cookie_state("consent", "unknown");
/// consent.set("granted");
/// assert_eq!(consent.get().as_deref(), Some("granted"));
///
/// consent.remove();
/// assert_eq!(consent.get(), None);
/// ```
pub fn use_cookie_state(name: &str, initial: &str) -> CookieState {
    let inner = CookieInner {
        name: name.to_string(),
        initial: initial.to_string(),
        window: context::window(),
        value: ValueCell::new(Some(initial.to_string())),
        scope: RefCell::new((DEFAULT_COOKIE_PATH.to_string(), None)),
        attachment: Attachment::new(),
    };
    let seeded = inner.read();
    inner.value.set(seeded);

    super::mount(CookieState {
        inner: Rc::new(inner),
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::{MemoryHost, MEMORY_HOST_EPOCH_MS};
    use tracing_test::traced_test;

    #[test]
    fn reads_existing_cookie_and_decodes() {
        let host = MemoryHost::new();
        let _guard = host.install();
        host.cookies().set_cookie("greeting=hello%20world").unwrap();

        let greeting = use_cookie_state("greeting", "hi");
        assert_eq!(greeting.get().as_deref(), Some("hello world"));
    }

    #[test]
    fn value_keeps_everything_after_first_equals() {
        let host = MemoryHost::new();
        let _guard = host.install();
        host.cookies().set_cookie("token=a=b=c").unwrap();

        let token = use_cookie_state("token", "");
        assert_eq!(token.get().as_deref(), Some("a=b=c"));
    }

    #[test]
    fn prefix_names_do_not_match() {
        let host = MemoryHost::new();
        let _guard = host.install();
        host.cookies().set_cookie("session_id=1").unwrap();

        let session = use_cookie_state("session", "none");
        assert_eq!(session.get().as_deref(), Some("none"));
    }

    #[test]
    fn set_writes_default_attributes() {
        let host = MemoryHost::new();
        let _guard = host.install();

        let c = use_cookie_state("theme", "light");
        c.set("dark mode");

        let stored = host.cookies().get("theme").unwrap();
        assert_eq!(stored.value, "dark%20mode");
        assert_eq!(stored.path, "/");
        assert_eq!(stored.same_site.as_deref(), Some("Lax"));
        assert!(!stored.secure);
        // toUTCString has second precision
        assert_eq!(stored.expires, Some(MEMORY_HOST_EPOCH_MS + 7 * MS_PER_DAY));
        assert_eq!(c.get().as_deref(), Some("dark mode"));
    }

    #[test]
    fn set_with_options() {
        let host = MemoryHost::new();
        let _guard = host.install();

        let c = use_cookie_state("sid", "");
        c.set_with(
            "abc",
            &CookieOptions {
                days: 1.0,
                path: "/app".into(),
                domain: Some("example.com".into()),
                secure: true,
                same_site: SameSite::Strict,
            },
        );

        let stored = host.cookies().get("sid").unwrap();
        assert_eq!(stored.path, "/app");
        assert_eq!(stored.domain.as_deref(), Some("example.com"));
        assert!(stored.secure);
        assert_eq!(stored.same_site.as_deref(), Some("Strict"));
        assert_eq!(stored.expires, Some(MEMORY_HOST_EPOCH_MS + MS_PER_DAY));
    }

    #[test]
    fn remove_expires_cookie_and_clears_to_none() {
        let host = MemoryHost::new();
        let _guard = host.install();

        let c = use_cookie_state("k", "init");
        c.set("v");
        c.remove();

        assert_eq!(c.get(), None);
        assert!(!host.cookies().cookie_string().contains("k=v"));
    }

    #[test]
    fn remove_uses_path_of_last_write() {
        let host = MemoryHost::new();
        let _guard = host.install();

        let c = use_cookie_state("k", "");
        c.set_with(
            "v",
            &CookieOptions {
                path: "/app".into(),
                ..CookieOptions::default()
            },
        );
        c.remove();
        assert!(host.cookies().is_empty());
    }

    #[test]
    fn cookie_expires_with_time() {
        let host = MemoryHost::new();
        let _guard = host.install();

        let c = use_cookie_state("short", "");
        c.set_with(
            "v",
            &CookieOptions {
                days: 0.5,
                ..CookieOptions::default()
            },
        );
        host.advance(std::time::Duration::from_secs(13 * 3600));
        assert!(host.cookies().get("short").is_none());
    }

    #[test]
    #[traced_test]
    fn invalid_percent_encoding_falls_back() {
        let host = MemoryHost::new();
        let _guard = host.install();
        host.cookies().set_cookie("bad=%FF%FE").unwrap();

        let c = use_cookie_state("bad", "fallback");
        assert_eq!(c.get().as_deref(), Some("fallback"));
        assert!(logs_contain("error reading cookie"));
    }

    #[test]
    fn without_window_set_is_a_no_op() {
        let c = use_cookie_state("k", "init");
        c.set("v");
        assert_eq!(c.get().as_deref(), Some("init"));
        c.remove();
        assert_eq!(c.get().as_deref(), Some("init"));
    }

    #[test]
    fn reactivation_rereads_the_jar() {
        use crate::primitives::lifecycle::Lifecycle;

        let host = MemoryHost::new();
        let _guard = host.install();

        let c = use_cookie_state("k", "init");
        c.deactivate();
        host.cookies().set_cookie("k=external").unwrap();
        c.activate();
        assert_eq!(c.get().as_deref(), Some("external"));
    }
}
