// ============================================================================
// spark-hooks - Media Queries
// `matchMedia` adapter
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::core::constants::EVENT_CHANGE;
use crate::host::dom::{Event, EventTarget, ListenerOptions, ListenerRegistration};

/// `window.matchMedia`.
pub trait MediaMatcher {
    fn match_media(&self, query: &str) -> MediaQueryList;
}

struct MediaQueryListInner {
    media: String,
    matches: Cell<bool>,
    target: EventTarget,
}

/// A live media query: current match state plus `change` notifications.
#[derive(Clone)]
pub struct MediaQueryList {
    inner: Rc<MediaQueryListInner>,
}

impl MediaQueryList {
    pub fn new(media: &str, matches: bool) -> Self {
        Self {
            inner: Rc::new(MediaQueryListInner {
                media: media.to_string(),
                matches: Cell::new(matches),
                target: EventTarget::new(),
            }),
        }
    }

    pub fn media(&self) -> &str {
        &self.inner.media
    }

    pub fn matches(&self) -> bool {
        self.inner.matches.get()
    }

    pub fn event_target(&self) -> &EventTarget {
        &self.inner.target
    }

    /// `addEventListener("change", ...)`
    pub fn add_change_listener(&self, listener: impl Fn(&Event) + 'static) -> ListenerRegistration {
        self.inner
            .target
            .add_event_listener(EVENT_CHANGE, listener, ListenerOptions::default())
    }

    /// Update the match state, dispatching `change` if it flipped.
    pub fn set_matches(&self, matches: bool) {
        if self.inner.matches.replace(matches) != matches {
            self.inner.target.dispatch_event(&Event::media_change(matches));
        }
    }
}

impl fmt::Debug for MediaQueryList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaQueryList")
            .field("media", &self.inner.media)
            .field("matches", &self.inner.matches.get())
            .finish()
    }
}

/// Media matcher whose answers are set by the test. Every query starts out
/// not matching; repeated lookups of one query share a list.
#[derive(Default)]
pub struct MemoryMediaMatcher {
    lists: RefCell<HashMap<String, MediaQueryList>>,
}

impl MemoryMediaMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip `query`, notifying every list handed out for it.
    pub fn set_matches(&self, query: &str, matches: bool) {
        let list = self.match_media(query);
        list.set_matches(matches);
    }
}

impl MediaMatcher for MemoryMediaMatcher {
    fn match_media(&self, query: &str) -> MediaQueryList {
        self.lists
            .borrow_mut()
            .entry(query.to_string())
            .or_insert_with(|| MediaQueryList::new(query, false))
            .clone()
    }
}

impl fmt::Debug for MemoryMediaMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryMediaMatcher")
            .field("queries", &self.lists.borrow().len())
            .finish()
    }
}
