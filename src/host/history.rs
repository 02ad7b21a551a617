// ============================================================================
// spark-hooks - History
// Location and the session history stack
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;

use crate::core::error::{HookError, Result};
use crate::host::dom::{Event, EventTarget};

// =============================================================================
// LOCATION
// =============================================================================

/// The same-origin part of a URL.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub pathname: String,
    /// Query string including the leading `?`, or empty
    pub search: String,
    /// Fragment including the leading `#`, or empty
    pub hash: String,
}

impl Location {
    /// Parse a path-relative URL such as `/list?page=2#top`.
    pub fn parse(url: &str) -> Self {
        let (rest, hash) = match url.find('#') {
            Some(i) => (&url[..i], &url[i..]),
            None => (url, ""),
        };
        let (pathname, search) = match rest.find('?') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, ""),
        };
        Self {
            pathname: if pathname.is_empty() { "/" } else { pathname }.to_string(),
            search: if search == "?" { "" } else { search }.to_string(),
            hash: if hash == "#" { "" } else { hash }.to_string(),
        }
    }

    /// Resolve `url` against this location: a bare `?query` or `#hash`
    /// keeps the current path.
    pub fn resolve(&self, url: &str) -> Result<Self> {
        if url.starts_with('?') {
            let mut next = Self::parse(&format!("{}{}", self.pathname, url));
            if !url.contains('#') {
                next.hash.clear();
            }
            return Ok(next);
        }
        if url.starts_with('#') {
            return Ok(Self {
                hash: Self::parse(url).hash,
                ..self.clone()
            });
        }
        if url.starts_with('/') && !url.starts_with("//") {
            return Ok(Self::parse(url));
        }
        Err(HookError::Navigation {
            url: url.to_string(),
            reason: "only same-origin paths can be pushed".into(),
        })
    }

    /// `pathname + search + hash`
    pub fn href(&self) -> String {
        format!("{}{}{}", self.pathname, self.search, self.hash)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.href())
    }
}

// =============================================================================
// HISTORY
// =============================================================================

/// `window.location` plus `history.pushState` / `replaceState`.
///
/// Neither push nor replace dispatches `popstate`; only traversal does.
pub trait History {
    fn location(&self) -> Location;

    fn push_state(&self, url: &str) -> Result<()>;

    fn replace_state(&self, url: &str) -> Result<()>;

    /// Number of entries in the session history.
    fn len(&self) -> usize;
}

/// In-memory session history; traversal dispatches `popstate` on the window
/// event target it was built with.
pub struct MemoryHistory {
    window_target: EventTarget,
    entries: RefCell<Vec<Location>>,
    index: Cell<usize>,
}

impl MemoryHistory {
    pub fn new(window_target: EventTarget, initial_url: &str) -> Self {
        Self {
            window_target,
            entries: RefCell::new(vec![Location::parse(initial_url)]),
            index: Cell::new(0),
        }
    }

    pub fn back(&self) -> bool {
        self.go(-1)
    }

    pub fn forward(&self) -> bool {
        self.go(1)
    }

    /// Move `delta` entries through the stack. Out-of-range moves do nothing.
    pub fn go(&self, delta: isize) -> bool {
        let len = self.entries.borrow().len();
        let Some(next) = self.index.get().checked_add_signed(delta) else {
            return false;
        };
        if delta == 0 || next >= len {
            return false;
        }
        self.index.set(next);
        tracing::trace!(index = next, "history traversal");
        self.window_target.dispatch_event(&Event::popstate());
        true
    }

    /// Every entry's href, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().iter().map(Location::href).collect()
    }

    pub fn index(&self) -> usize {
        self.index.get()
    }
}

impl History for MemoryHistory {
    fn location(&self) -> Location {
        self.entries.borrow()[self.index.get()].clone()
    }

    fn push_state(&self, url: &str) -> Result<()> {
        let next = self.location().resolve(url)?;
        let mut entries = self.entries.borrow_mut();
        entries.truncate(self.index.get() + 1);
        entries.push(next);
        self.index.set(entries.len() - 1);
        Ok(())
    }

    fn replace_state(&self, url: &str) -> Result<()> {
        let next = self.location().resolve(url)?;
        self.entries.borrow_mut()[self.index.get()] = next;
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

impl fmt::Debug for MemoryHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryHistory")
            .field("entries", &self.entries())
            .field("index", &self.index.get())
            .finish()
    }
}
