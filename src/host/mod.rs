// ============================================================================
// spark-hooks - Host Module
// Adapters over the browser primitives the hooks mirror, plus an in-memory
// implementation of each
// ============================================================================

pub mod cookie;
pub mod dom;
pub mod history;
pub mod media;
pub mod memory;
pub mod observer;
pub mod scheduler;
pub mod storage;
pub mod window;

pub use cookie::{CookieJar, MemoryCookieJar, StoredCookie};
pub use dom::{
    Document, Element, Event, EventKind, EventTarget, Listener, ListenerOptions,
    ListenerRegistration, ScrollMetrics,
};
pub use history::{History, Location, MemoryHistory};
pub use media::{MediaMatcher, MediaQueryList, MemoryMediaMatcher};
pub use memory::MemoryHost;
pub use observer::{
    IntersectionCallback, IntersectionEntry, IntersectionOptions, MemoryObservers, Observer,
    ObserverFactory, Rect, ResizeCallback, ResizeEntry,
};
pub use scheduler::{Clock, Scheduler, VirtualScheduler};
pub use storage::{MemoryStorage, Storage, StorageArea};
pub use window::{Window, WindowBuilder};
