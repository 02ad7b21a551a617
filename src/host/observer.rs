// ============================================================================
// spark-hooks - Observers
// `ResizeObserver` and `IntersectionObserver` adapters
// ============================================================================
//
// An observer is created with its callback and then pointed at targets.
// Entries arrive asynchronously from the host's layout pass, so the
// in-memory registry delivers them only when a test asks it to.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::host::dom::Element;

// =============================================================================
// ENTRIES
// =============================================================================

/// A `DOMRectReadOnly`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn sized(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }
}

/// One `ResizeObserverEntry`.
#[derive(Debug, Clone)]
pub struct ResizeEntry {
    pub target: Element,
    pub content_rect: Rect,
}

/// One `IntersectionObserverEntry`.
#[derive(Debug, Clone)]
pub struct IntersectionEntry {
    pub target: Element,
    pub is_intersecting: bool,
    pub intersection_ratio: f64,
    pub bounding_client_rect: Rect,
    /// Host timestamp in ms
    pub time: f64,
}

/// Options of an intersection observer.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionOptions {
    pub threshold: Vec<f64>,
    /// `None` observes against the viewport
    pub root: Option<Element>,
    pub root_margin: String,
    /// Stop updating after the first intersecting entry (hook-level option;
    /// hosts ignore it)
    pub freeze_once_visible: bool,
}

impl Default for IntersectionOptions {
    fn default() -> Self {
        Self {
            threshold: vec![0.0],
            root: None,
            root_margin: "0%".to_string(),
            freeze_once_visible: false,
        }
    }
}

pub type ResizeCallback = Rc<dyn Fn(&[ResizeEntry])>;
pub type IntersectionCallback = Rc<dyn Fn(&[IntersectionEntry])>;

// =============================================================================
// TRAITS
// =============================================================================

/// A live observer instance.
pub trait Observer {
    fn observe(&self, target: &Element);

    fn unobserve(&self, target: &Element);

    /// Stop observing every target. The observer stays usable.
    fn disconnect(&self);
}

/// Creates observers (`new ResizeObserver(cb)`, `new IntersectionObserver(cb, opts)`).
pub trait ObserverFactory {
    fn resize_observer(&self, callback: ResizeCallback) -> Box<dyn Observer>;

    fn intersection_observer(
        &self,
        callback: IntersectionCallback,
        options: &IntersectionOptions,
    ) -> Box<dyn Observer>;
}

// =============================================================================
// MEMORY OBSERVERS
// =============================================================================

enum ObserverCallback {
    Resize(ResizeCallback),
    Intersection(IntersectionCallback),
}

struct ObserverState {
    callback: ObserverCallback,
    targets: RefCell<Vec<Element>>,
    options: Option<IntersectionOptions>,
}

impl ObserverState {
    fn observes(&self, target: &Element) -> bool {
        self.targets.borrow().iter().any(|t| t.ptr_eq(target))
    }
}

/// Observer handle handed to hooks. Dropping it disconnects.
struct MemoryObserver {
    state: Rc<ObserverState>,
}

impl Observer for MemoryObserver {
    fn observe(&self, target: &Element) {
        if !self.state.observes(target) {
            self.state.targets.borrow_mut().push(target.clone());
        }
    }

    fn unobserve(&self, target: &Element) {
        self.state.targets.borrow_mut().retain(|t| !t.ptr_eq(target));
    }

    fn disconnect(&self) {
        self.state.targets.borrow_mut().clear();
    }
}

impl Drop for MemoryObserver {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Registry of observers created through it; tests deliver entries with
/// `resize` and `intersect`.
#[derive(Default)]
pub struct MemoryObservers {
    observers: RefCell<Vec<Weak<ObserverState>>>,
    created: Cell<usize>,
    time: Cell<f64>,
}

impl MemoryObservers {
    pub fn new() -> Self {
        Self::default()
    }

    fn live(&self) -> Vec<Rc<ObserverState>> {
        let mut observers = self.observers.borrow_mut();
        observers.retain(|w| w.strong_count() > 0);
        observers.iter().filter_map(Weak::upgrade).collect()
    }

    fn register(&self, state: &Rc<ObserverState>) {
        self.observers.borrow_mut().push(Rc::downgrade(state));
        self.created.set(self.created.get() + 1);
    }

    fn tick(&self) -> f64 {
        let t = self.time.get() + 1.0;
        self.time.set(t);
        t
    }

    /// Observers created so far, live or not.
    pub fn created_count(&self) -> usize {
        self.created.get()
    }

    /// Observers still alive.
    pub fn live_count(&self) -> usize {
        self.live().len()
    }

    /// Live observers currently observing `target`.
    pub fn observing_count(&self, target: &Element) -> usize {
        self.live().iter().filter(|s| s.observes(target)).count()
    }

    /// Options of the newest live intersection observer watching `target`.
    pub fn intersection_options(&self, target: &Element) -> Option<IntersectionOptions> {
        self.live()
            .iter()
            .rev()
            .filter(|s| s.observes(target))
            .find_map(|s| s.options.clone())
    }

    /// Lay `target` out at `width` x `height` and deliver a resize entry to
    /// every resize observer watching it.
    pub fn resize(&self, target: &Element, width: f64, height: f64) {
        target.set_offset_size(width, height);
        let entries = [ResizeEntry {
            target: target.clone(),
            content_rect: Rect::sized(width, height),
        }];
        for state in self.live() {
            if let ObserverCallback::Resize(callback) = &state.callback {
                if state.observes(target) {
                    let callback = callback.clone();
                    callback(&entries);
                }
            }
        }
    }

    /// Deliver an intersection entry for `target` to every intersection
    /// observer watching it.
    pub fn intersect(&self, target: &Element, is_intersecting: bool, ratio: f64) {
        let entries = [IntersectionEntry {
            target: target.clone(),
            is_intersecting,
            intersection_ratio: ratio,
            bounding_client_rect: Rect::sized(target.offset_width(), target.offset_height()),
            time: self.tick(),
        }];
        for state in self.live() {
            if let ObserverCallback::Intersection(callback) = &state.callback {
                if state.observes(target) {
                    let callback = callback.clone();
                    callback(&entries);
                }
            }
        }
    }
}

impl ObserverFactory for MemoryObservers {
    fn resize_observer(&self, callback: ResizeCallback) -> Box<dyn Observer> {
        let state = Rc::new(ObserverState {
            callback: ObserverCallback::Resize(callback),
            targets: RefCell::new(Vec::new()),
            options: None,
        });
        self.register(&state);
        Box::new(MemoryObserver { state })
    }

    fn intersection_observer(
        &self,
        callback: IntersectionCallback,
        options: &IntersectionOptions,
    ) -> Box<dyn Observer> {
        let state = Rc::new(ObserverState {
            callback: ObserverCallback::Intersection(callback),
            targets: RefCell::new(Vec::new()),
            options: Some(options.clone()),
        });
        self.register(&state);
        Box::new(MemoryObserver { state })
    }
}

impl fmt::Debug for MemoryObservers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryObservers")
            .field("created", &self.created.get())
            .field("live", &self.live_count())
            .finish()
    }
}
