// ============================================================================
// spark-hooks - Media Query
// `matchMedia` state mirrored into a value cell
// ============================================================================

use std::fmt;
use std::rc::{Rc, Weak};

use crate::core::context;
use crate::host::dom::EventKind;
use crate::host::media::{MediaMatcher, MediaQueryList};
use crate::macros::impl_lifecycle;
use crate::primitives::cell::{ReadCell, ValueCell};
use crate::primitives::lifecycle::Attachment;

struct MediaQueryInner {
    query: String,
    list: Option<MediaQueryList>,
    matches: ValueCell<bool>,
    attachment: Attachment,
}

impl MediaQueryInner {
    fn attach(self: &Rc<Self>) {
        let Some(list) = self.list.clone() else {
            return;
        };
        let weak: Weak<Self> = Rc::downgrade(self);

        self.attachment.attach(|teardown| {
            self.matches.set(list.matches());
            teardown.hold(list.add_change_listener(move |event| {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if let EventKind::MediaChange { matches } = event.kind() {
                    inner.matches.set(*matches);
                }
            }));
        });
    }
}

/// Whether a media query currently matches.
#[derive(Clone)]
pub struct MediaQuery {
    inner: Rc<MediaQueryInner>,
}

impl MediaQuery {
    pub fn matches(&self) -> ReadCell<bool> {
        self.inner.matches.read_only()
    }

    pub fn is_match(&self) -> bool {
        self.inner.matches.get()
    }

    pub fn query(&self) -> &str {
        &self.inner.query
    }
}

impl fmt::Debug for MediaQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaQuery")
            .field("query", &self.inner.query)
            .field("matches", &self.inner.matches.get())
            .finish()
    }
}

impl_lifecycle!(MediaQuery);

/// Track `query` (e.g. `"(prefers-color-scheme: dark)"`). Without a window or
/// `matchMedia` the result is always `false`.
///
/// # Example
///
/// ```
/// use spark_hooks::{use_media_query, MemoryHost};
///
/// let host = MemoryHost::new();
/// let _guard = host.install();
///
/// let wide = use_media_query("(min-width: 768px)");
/// assert!(!wide.is_match());
///
/// host.media().unwrap().set_matches("(min-width: 768px)", true);
/// assert!(wide.is_match());
/// ```
pub fn use_media_query(query: &str) -> MediaQuery {
    let list = context::window()
        .and_then(|window| window.media().map(|media| media.match_media(query)));
    if list.is_none() {
        tracing::debug!(query, "matchMedia unavailable");
    }

    let matches = list.as_ref().is_some_and(MediaQueryList::matches);
    super::mount(MediaQuery {
        inner: Rc::new(MediaQueryInner {
            query: query.to_string(),
            list,
            matches: ValueCell::new(matches),
            attachment: Attachment::new(),
        }),
    })
}
