// ============================================================================
// spark-hooks - In-Memory Host
// A complete, deterministic window for tests, benches and headless use
// ============================================================================

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::core::context::{install_window, WindowGuard};
use crate::host::cookie::MemoryCookieJar;
use crate::host::dom::{Document, Event, EventTarget};
use crate::host::history::MemoryHistory;
use crate::host::media::MemoryMediaMatcher;
use crate::host::observer::MemoryObservers;
use crate::host::scheduler::{Clock, VirtualScheduler};
use crate::host::storage::{MemoryStorage, Storage, StorageArea};
use crate::host::window::Window;

/// Clock reading the host starts at: 2023-11-14T22:13:20Z.
pub const MEMORY_HOST_EPOCH_MS: i64 = 1_700_000_000_000;

/// A `Window` built entirely from in-memory primitives, with typed access to
/// each of them so tests can drive time, navigation, storage and observers.
///
/// # Example
///
/// ```
/// use spark_hooks::{use_window_size, MemoryHost};
///
/// let host = MemoryHost::new();
/// let _guard = host.install();
///
/// let size = use_window_size();
/// host.window().resize_to(375.0, 812.0);
/// assert_eq!(size.get().width, 375.0);
/// ```
pub struct MemoryHost {
    window: Window,
    scheduler: Rc<VirtualScheduler>,
    history: Rc<MemoryHistory>,
    cookies: Rc<MemoryCookieJar>,
    local_storage: Option<Rc<MemoryStorage>>,
    session_storage: Option<Rc<MemoryStorage>>,
    media: Option<Rc<MemoryMediaMatcher>>,
    observers: Option<Rc<MemoryObservers>>,
}

impl MemoryHost {
    /// A host at `/` with every primitive available.
    pub fn new() -> Self {
        Self::with_url("/")
    }

    /// A host whose current location is `url`.
    pub fn with_url(url: &str) -> Self {
        Self::build(url, true)
    }

    /// A host without storage, media queries or observers.
    pub fn bare() -> Self {
        Self::build("/", false)
    }

    fn build(url: &str, full: bool) -> Self {
        let target = EventTarget::new();
        let scheduler = Rc::new(VirtualScheduler::starting_at(MEMORY_HOST_EPOCH_MS));
        let history = Rc::new(MemoryHistory::new(target.clone(), url));
        let clock: Rc<dyn Clock> = scheduler.clone();
        let cookies = Rc::new(MemoryCookieJar::new(clock));

        let mut builder = Window::builder(target, scheduler.clone(), history.clone(), cookies.clone())
            .document(Document::new());

        let (local_storage, session_storage, media, observers) = if full {
            let local = Rc::new(MemoryStorage::new(StorageArea::Local));
            let session = Rc::new(MemoryStorage::new(StorageArea::Session));
            let media = Rc::new(MemoryMediaMatcher::new());
            let observers = Rc::new(MemoryObservers::new());
            builder = builder
                .local_storage(local.clone())
                .session_storage(session.clone())
                .media(media.clone())
                .observers(observers.clone());
            (Some(local), Some(session), Some(media), Some(observers))
        } else {
            (None, None, None, None)
        };

        Self {
            window: builder.build(),
            scheduler,
            history,
            cookies,
            local_storage,
            session_storage,
            media,
            observers,
        }
    }

    /// Install this host's window as the thread's global.
    pub fn install(&self) -> WindowGuard {
        install_window(self.window.clone())
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn document(&self) -> &Document {
        self.window.document()
    }

    pub fn scheduler(&self) -> &Rc<VirtualScheduler> {
        &self.scheduler
    }

    pub fn history(&self) -> &Rc<MemoryHistory> {
        &self.history
    }

    pub fn cookies(&self) -> &Rc<MemoryCookieJar> {
        &self.cookies
    }

    pub fn storage(&self, area: StorageArea) -> Option<&Rc<MemoryStorage>> {
        match area {
            StorageArea::Local => self.local_storage.as_ref(),
            StorageArea::Session => self.session_storage.as_ref(),
        }
    }

    pub fn media(&self) -> Option<&Rc<MemoryMediaMatcher>> {
        self.media.as_ref()
    }

    pub fn observers(&self) -> Option<&Rc<MemoryObservers>> {
        self.observers.as_ref()
    }

    /// Current clock reading.
    pub fn now(&self) -> i64 {
        self.scheduler.now()
    }

    /// Let `by` pass, running every timer and frame that falls due.
    pub fn advance(&self, by: Duration) {
        self.scheduler.advance(by);
    }

    /// Shorthand for `advance(Duration::from_millis(ms))`.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Simulate another tab writing `key` (or removing it, with `None`):
    /// the area is updated and a `storage` event is dispatched on the window.
    pub fn external_storage_write(&self, area: StorageArea, key: &str, value: Option<&str>) {
        let Some(storage) = self.storage(area) else {
            return;
        };
        let outcome = match value {
            Some(value) => storage.set_item(key, value),
            None => storage.remove_item(key),
        };
        if let Err(err) = outcome {
            tracing::warn!(key, error = %err, "simulated external write rejected");
            return;
        }
        self.window
            .dispatch_event(Event::storage(area, Some(key), value));
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryHost")
            .field("window", &self.window)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}
