// ============================================================================
// spark-hooks - Viewport
// Window scroll offset and inner size
// ============================================================================

use std::fmt;
use std::rc::{Rc, Weak};

use crate::core::constants::{EVENT_RESIZE, EVENT_SCROLL};
use crate::core::context;
use crate::host::dom::ListenerOptions;
use crate::host::window::Window;
use crate::hooks::element_size::Size;
use crate::macros::impl_lifecycle;
use crate::primitives::cell::{ReadCell, ValueCell};
use crate::primitives::lifecycle::Attachment;

/// A scroll offset in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

/// Keep `cell` equal to `read(window)`, re-reading on every `event_type`.
///
/// The cell is re-synced on attach, so values that changed while detached
/// are picked up immediately.
fn mirror<T, S>(
    owner: &Rc<S>,
    window: &Window,
    attachment: &Attachment,
    event_type: &'static str,
    options: ListenerOptions,
    cell: fn(&S) -> &ValueCell<T>,
    read: fn(&Window) -> T,
) where
    T: Clone + 'static,
    S: 'static,
{
    let weak: Weak<S> = Rc::downgrade(owner);
    attachment.attach(|teardown| {
        cell(owner).set(read(window));

        let source = window.clone();
        teardown.hold(window.add_event_listener(
            event_type,
            move |_| {
                if let Some(owner) = weak.upgrade() {
                    cell(&owner).set(read(&source));
                }
            },
            options,
        ));
    });
}

// =============================================================================
// SCROLL POSITION
// =============================================================================

struct ScrollInner {
    window: Option<Window>,
    offset: ValueCell<Offset>,
    attachment: Attachment,
}

impl ScrollInner {
    fn offset(&self) -> &ValueCell<Offset> {
        &self.offset
    }

    fn read(window: &Window) -> Offset {
        Offset {
            x: window.scroll_x(),
            y: window.scroll_y(),
        }
    }

    fn attach(self: &Rc<Self>) {
        let Some(window) = self.window.clone() else {
            return;
        };
        mirror(
            self,
            &window,
            &self.attachment,
            EVENT_SCROLL,
            ListenerOptions::passive(),
            Self::offset,
            Self::read,
        );
    }
}

/// The window scroll offset.
#[derive(Clone)]
pub struct ScrollPosition {
    inner: Rc<ScrollInner>,
}

impl ScrollPosition {
    pub fn get(&self) -> Offset {
        self.inner.offset.get()
    }

    pub fn value(&self) -> ReadCell<Offset> {
        self.inner.offset.read_only()
    }
}

impl fmt::Debug for ScrollPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScrollPosition").field(&self.inner.offset.get()).finish()
    }
}

impl_lifecycle!(ScrollPosition);

/// Track `window.scrollX` / `window.scrollY`. Reads `(0, 0)` without a window.
pub fn use_scroll_position() -> ScrollPosition {
    let window = context::window();
    let offset = window.as_ref().map(ScrollInner::read).unwrap_or_default();
    super::mount(ScrollPosition {
        inner: Rc::new(ScrollInner {
            window,
            offset: ValueCell::new(offset),
            attachment: Attachment::new(),
        }),
    })
}

// =============================================================================
// WINDOW SIZE
// =============================================================================

struct WindowSizeInner {
    window: Option<Window>,
    size: ValueCell<Size>,
    attachment: Attachment,
}

impl WindowSizeInner {
    fn size(&self) -> &ValueCell<Size> {
        &self.size
    }

    fn read(window: &Window) -> Size {
        Size {
            width: window.inner_width(),
            height: window.inner_height(),
        }
    }

    fn attach(self: &Rc<Self>) {
        let Some(window) = self.window.clone() else {
            return;
        };
        mirror(
            self,
            &window,
            &self.attachment,
            EVENT_RESIZE,
            ListenerOptions::default(),
            Self::size,
            Self::read,
        );
    }
}

/// The window inner size.
#[derive(Clone)]
pub struct WindowSize {
    inner: Rc<WindowSizeInner>,
}

impl WindowSize {
    pub fn get(&self) -> Size {
        self.inner.size.get()
    }

    pub fn value(&self) -> ReadCell<Size> {
        self.inner.size.read_only()
    }
}

impl fmt::Debug for WindowSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WindowSize").field(&self.inner.size.get()).finish()
    }
}

impl_lifecycle!(WindowSize);

/// Track `window.innerWidth` / `window.innerHeight`. Reads `0 x 0` without a
/// window.
pub fn use_window_size() -> WindowSize {
    let window = context::window();
    let size = window.as_ref().map(WindowSizeInner::read).unwrap_or_default();
    super::mount(WindowSize {
        inner: Rc::new(WindowSizeInner {
            window,
            size: ValueCell::new(size),
            attachment: Attachment::new(),
        }),
    })
}
