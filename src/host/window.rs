// ============================================================================
// spark-hooks - Window
// The global scope bundle every hook reads its primitives from
// ============================================================================

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::core::constants::{EVENT_RESIZE, EVENT_SCROLL};
use crate::host::cookie::CookieJar;
use crate::host::dom::{Document, Event, EventTarget, ListenerOptions, ListenerRegistration};
use crate::host::history::{History, Location};
use crate::host::media::MediaMatcher;
use crate::host::observer::ObserverFactory;
use crate::host::scheduler::Scheduler;
use crate::host::storage::{Storage, StorageArea};

struct WindowInner {
    target: EventTarget,
    document: Document,
    history: Rc<dyn History>,
    cookies: Rc<dyn CookieJar>,
    scheduler: Rc<dyn Scheduler>,
    local_storage: Option<Rc<dyn Storage>>,
    session_storage: Option<Rc<dyn Storage>>,
    media: Option<Rc<dyn MediaMatcher>>,
    observers: Option<Rc<dyn ObserverFactory>>,
    inner_size: Cell<(f64, f64)>,
    scroll: Cell<(f64, f64)>,
}

/// The host global. Clones share one window.
///
/// Document, history, cookies and the scheduler are always present; storage,
/// media queries and observers may be missing, in which case the hooks that
/// need them fall back to their initial values.
#[derive(Clone)]
pub struct Window {
    inner: Rc<WindowInner>,
}

impl Window {
    /// Start building a window around its event target. The target is taken
    /// up front so a history can be wired to dispatch `popstate` on it.
    pub fn builder(
        target: EventTarget,
        scheduler: Rc<dyn Scheduler>,
        history: Rc<dyn History>,
        cookies: Rc<dyn CookieJar>,
    ) -> WindowBuilder {
        WindowBuilder {
            target,
            document: Document::new(),
            history,
            cookies,
            scheduler,
            local_storage: None,
            session_storage: None,
            media: None,
            observers: None,
            inner_size: (1024.0, 768.0),
        }
    }

    pub fn event_target(&self) -> &EventTarget {
        &self.inner.target
    }

    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    pub fn history(&self) -> &Rc<dyn History> {
        &self.inner.history
    }

    pub fn location(&self) -> Location {
        self.inner.history.location()
    }

    pub fn cookies(&self) -> &Rc<dyn CookieJar> {
        &self.inner.cookies
    }

    pub fn scheduler(&self) -> &Rc<dyn Scheduler> {
        &self.inner.scheduler
    }

    /// `Date.now()`
    pub fn now(&self) -> i64 {
        self.inner.scheduler.now()
    }

    pub fn storage(&self, area: StorageArea) -> Option<Rc<dyn Storage>> {
        match area {
            StorageArea::Local => self.inner.local_storage.clone(),
            StorageArea::Session => self.inner.session_storage.clone(),
        }
    }

    pub fn media(&self) -> Option<&Rc<dyn MediaMatcher>> {
        self.inner.media.as_ref()
    }

    pub fn observers(&self) -> Option<&Rc<dyn ObserverFactory>> {
        self.inner.observers.as_ref()
    }

    pub fn add_event_listener(
        &self,
        event_type: &str,
        listener: impl Fn(&Event) + 'static,
        options: ListenerOptions,
    ) -> ListenerRegistration {
        self.inner
            .target
            .add_event_listener(event_type, listener, options)
    }

    pub fn dispatch_event(&self, event: Event) {
        self.inner.target.dispatch_event(&event);
    }

    // -------------------------------------------------------------------------
    // Viewport
    // -------------------------------------------------------------------------

    pub fn inner_width(&self) -> f64 {
        self.inner.inner_size.get().0
    }

    pub fn inner_height(&self) -> f64 {
        self.inner.inner_size.get().1
    }

    /// Resize the viewport and dispatch `resize`.
    pub fn resize_to(&self, width: f64, height: f64) {
        self.inner.inner_size.set((width, height));
        self.dispatch_event(Event::new(EVENT_RESIZE));
    }

    pub fn scroll_x(&self) -> f64 {
        self.inner.scroll.get().0
    }

    pub fn scroll_y(&self) -> f64 {
        self.inner.scroll.get().1
    }

    /// Scroll the viewport and dispatch `scroll`.
    pub fn scroll_to(&self, x: f64, y: f64) {
        self.inner.scroll.set((x, y));
        self.dispatch_event(Event::new(EVENT_SCROLL));
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("location", &self.location().href())
            .field("inner_size", &self.inner.inner_size.get())
            .field("local_storage", &self.inner.local_storage.is_some())
            .field("session_storage", &self.inner.session_storage.is_some())
            .field("media", &self.inner.media.is_some())
            .field("observers", &self.inner.observers.is_some())
            .finish()
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Assembles a `Window`; optional primitives default to absent.
pub struct WindowBuilder {
    target: EventTarget,
    document: Document,
    history: Rc<dyn History>,
    cookies: Rc<dyn CookieJar>,
    scheduler: Rc<dyn Scheduler>,
    local_storage: Option<Rc<dyn Storage>>,
    session_storage: Option<Rc<dyn Storage>>,
    media: Option<Rc<dyn MediaMatcher>>,
    observers: Option<Rc<dyn ObserverFactory>>,
    inner_size: (f64, f64),
}

impl WindowBuilder {
    pub fn document(mut self, document: Document) -> Self {
        self.document = document;
        self
    }

    pub fn local_storage(mut self, storage: Rc<dyn Storage>) -> Self {
        self.local_storage = Some(storage);
        self
    }

    pub fn session_storage(mut self, storage: Rc<dyn Storage>) -> Self {
        self.session_storage = Some(storage);
        self
    }

    pub fn media(mut self, media: Rc<dyn MediaMatcher>) -> Self {
        self.media = Some(media);
        self
    }

    pub fn observers(mut self, observers: Rc<dyn ObserverFactory>) -> Self {
        self.observers = Some(observers);
        self
    }

    pub fn inner_size(mut self, width: f64, height: f64) -> Self {
        self.inner_size = (width, height);
        self
    }

    pub fn build(self) -> Window {
        Window {
            inner: Rc::new(WindowInner {
                target: self.target,
                document: self.document,
                history: self.history,
                cookies: self.cookies,
                scheduler: self.scheduler,
                local_storage: self.local_storage,
                session_storage: self.session_storage,
                media: self.media,
                observers: self.observers,
                inner_size: Cell::new(self.inner_size),
                scroll: Cell::new((0.0, 0.0)),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::host::memory::MemoryHost;
    use crate::host::storage::StorageArea;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn resize_to_dispatches_resize() {
        let host = MemoryHost::new();
        let window = host.window();
        let hits = Rc::new(Cell::new(0));
        let _reg = window.add_event_listener(
            "resize",
            {
                let hits = hits.clone();
                move |_| hits.set(hits.get() + 1)
            },
            Default::default(),
        );

        window.resize_to(800.0, 600.0);
        assert_eq!((window.inner_width(), window.inner_height()), (800.0, 600.0));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn optional_primitives_may_be_absent() {
        let host = MemoryHost::bare();
        assert!(host.window().storage(StorageArea::Local).is_none());
        assert!(host.window().media().is_none());
        assert!(host.window().observers().is_none());
    }
}
