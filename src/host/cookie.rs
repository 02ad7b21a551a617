// ============================================================================
// spark-hooks - Cookies
// `document.cookie` adapter
// ============================================================================
//
// The cookie API is two strings: reading yields `"a=1; b=2"` for every live
// cookie visible to the page, writing takes one `name=value; attr; attr`
// assignment. `MemoryCookieJar` implements the parts of RFC 6265 storage
// the hooks depend on: replacement by (name, path, domain) and expiry.
// ============================================================================

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use chrono::DateTime;

use crate::core::constants::{DEFAULT_COOKIE_PATH, MS_PER_SECOND};
use crate::core::error::Result;
use crate::host::scheduler::Clock;

/// The `document.cookie` accessor pair.
pub trait CookieJar {
    /// `"name=value; name2=value2"` of every live cookie.
    fn cookie_string(&self) -> String;

    /// Apply one cookie assignment (`"name=value; path=/; expires=..."`).
    fn set_cookie(&self, assignment: &str) -> Result<()>;
}

// =============================================================================
// MEMORY COOKIE JAR
// =============================================================================

/// A cookie as stored by the jar.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub domain: Option<String>,
    /// Expiry in ms since the epoch; `None` for session cookies
    pub expires: Option<i64>,
    pub secure: bool,
    pub same_site: Option<String>,
}

impl StoredCookie {
    fn is_expired(&self, now: i64) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }

    fn same_slot(&self, other: &StoredCookie) -> bool {
        self.name == other.name && self.path == other.path && self.domain == other.domain
    }
}

/// Parse one assignment. Unknown attributes are ignored, as browsers do.
fn parse_assignment(assignment: &str, now: i64) -> StoredCookie {
    let mut parts = assignment.split(';');
    let pair = parts.next().unwrap_or_default();
    let (name, value) = match pair.split_once('=') {
        Some((name, value)) => (name.trim(), value.trim()),
        None => ("", pair.trim()),
    };

    let mut cookie = StoredCookie {
        name: name.to_string(),
        value: value.to_string(),
        path: DEFAULT_COOKIE_PATH.to_string(),
        domain: None,
        expires: None,
        secure: false,
        same_site: None,
    };
    let mut max_age = None;

    for attribute in parts {
        let (key, val) = match attribute.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (attribute.trim(), ""),
        };
        match key.to_ascii_lowercase().as_str() {
            "expires" => match DateTime::parse_from_rfc2822(val) {
                Ok(at) => cookie.expires = Some(at.timestamp_millis()),
                Err(err) => tracing::debug!(value = val, error = %err, "ignoring unparsable expires"),
            },
            "max-age" => max_age = val.parse::<i64>().ok(),
            "path" if val.starts_with('/') => cookie.path = val.to_string(),
            "domain" if !val.is_empty() => {
                cookie.domain = Some(val.trim_start_matches('.').to_ascii_lowercase());
            }
            "secure" => cookie.secure = true,
            "samesite" => cookie.same_site = Some(val.to_string()),
            _ => {}
        }
    }

    // Max-Age wins over Expires
    if let Some(seconds) = max_age {
        cookie.expires = Some(now.saturating_add(seconds.saturating_mul(MS_PER_SECOND)));
    }
    cookie
}

/// In-memory cookie jar keyed by (name, path, domain).
pub struct MemoryCookieJar {
    clock: Rc<dyn Clock>,
    cookies: RefCell<Vec<StoredCookie>>,
}

impl MemoryCookieJar {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            cookies: RefCell::new(Vec::new()),
        }
    }

    fn purge_expired(&self) {
        let now = self.clock.now();
        self.cookies.borrow_mut().retain(|c| !c.is_expired(now));
    }

    /// The first live cookie named `name`.
    pub fn get(&self, name: &str) -> Option<StoredCookie> {
        self.purge_expired();
        self.cookies.borrow().iter().find(|c| c.name == name).cloned()
    }

    /// Every live cookie, in creation order.
    pub fn cookies(&self) -> Vec<StoredCookie> {
        self.purge_expired();
        self.cookies.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.purge_expired();
        self.cookies.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CookieJar for MemoryCookieJar {
    fn cookie_string(&self) -> String {
        self.purge_expired();
        self.cookies
            .borrow()
            .iter()
            .map(|c| {
                if c.name.is_empty() {
                    c.value.clone()
                } else {
                    format!("{}={}", c.name, c.value)
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn set_cookie(&self, assignment: &str) -> Result<()> {
        let now = self.clock.now();
        let cookie = parse_assignment(assignment, now);

        let mut cookies = self.cookies.borrow_mut();
        let existing = cookies.iter().position(|c| c.same_slot(&cookie));

        if cookie.is_expired(now) {
            if let Some(index) = existing {
                cookies.remove(index);
            }
            tracing::trace!(name = %cookie.name, "cookie expired by assignment");
            return Ok(());
        }

        match existing {
            Some(index) => cookies[index] = cookie,
            None => cookies.push(cookie),
        }
        Ok(())
    }
}

impl fmt::Debug for MemoryCookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCookieJar")
            .field("cookies", &self.cookies.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::scheduler::VirtualScheduler;
    use std::time::Duration;

    fn jar() -> (Rc<VirtualScheduler>, MemoryCookieJar) {
        // 2023-11-14T22:13:20Z
        let clock = Rc::new(VirtualScheduler::starting_at(1_700_000_000_000));
        let jar = MemoryCookieJar::new(clock.clone());
        (clock, jar)
    }

    #[test]
    fn assignments_accumulate_into_cookie_string() {
        let (_clock, jar) = jar();
        jar.set_cookie("a=1; path=/").unwrap();
        jar.set_cookie("b=two%20words").unwrap();
        assert_eq!(jar.cookie_string(), "a=1; b=two%20words");
    }

    #[test]
    fn same_name_and_path_replaces() {
        let (_clock, jar) = jar();
        jar.set_cookie("theme=light; path=/").unwrap();
        jar.set_cookie("theme=dark; path=/").unwrap();
        jar.set_cookie("theme=blue; path=/admin").unwrap();
        assert_eq!(jar.len(), 2);
        assert_eq!(jar.get("theme").unwrap().value, "dark");
    }

    #[test]
    fn past_expiry_deletes() {
        let (_clock, jar) = jar();
        jar.set_cookie("sid=abc; path=/").unwrap();
        jar.set_cookie("sid=; expires=Thu, 01 Jan 1970 00:00:00 GMT; path=/")
            .unwrap();
        assert!(jar.is_empty());
        assert_eq!(jar.cookie_string(), "");
    }

    #[test]
    fn cookies_expire_as_time_passes() {
        let (clock, jar) = jar();
        jar.set_cookie("short=1; max-age=60").unwrap();
        jar.set_cookie("long=1; expires=Fri, 01 Jan 2100 00:00:00 GMT").unwrap();

        clock.advance(Duration::from_secs(61));
        assert_eq!(jar.cookie_string(), "long=1");
    }

    #[test]
    fn attributes_are_recorded() {
        let (_clock, jar) = jar();
        jar.set_cookie("c=1; path=/app; domain=.Example.com; secure; SameSite=Strict")
            .unwrap();
        let c = jar.get("c").unwrap();
        assert_eq!(c.path, "/app");
        assert_eq!(c.domain.as_deref(), Some("example.com"));
        assert!(c.secure);
        assert_eq!(c.same_site.as_deref(), Some("Strict"));
    }
}
