// ============================================================================
// spark-hooks - Storage-Backed State
// `localStorage` / `sessionStorage` slot mirrored into a value cell
// ============================================================================
//
// Stored text is JSON. A missing, empty, unreadable or malformed slot reads
// as the initial value (with a warning for the last two). Writes update the
// cell with exactly the value passed in, then persist it; a persistence
// failure is logged and the cell keeps the new value.
// ============================================================================

use std::fmt;
use std::rc::{Rc, Weak};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::constants::EVENT_STORAGE;
use crate::core::context;
use crate::core::error::HookError;
use crate::host::dom::{EventKind, ListenerOptions};
use crate::host::storage::{Storage, StorageArea};
use crate::host::window::Window;
use crate::macros::impl_lifecycle;
use crate::primitives::cell::{ReadCell, ValueCell};
use crate::primitives::lifecycle::Attachment;

/// Values that can live in a storage slot or a query parameter.
pub trait StorageValue: Serialize + DeserializeOwned + Clone + PartialEq + 'static {}

impl<T> StorageValue for T where T: Serialize + DeserializeOwned + Clone + PartialEq + 'static {}

// =============================================================================
// BRIDGE
// =============================================================================

struct StorageInner<T> {
    area: StorageArea,
    key: String,
    initial: T,
    window: Option<Window>,
    value: ValueCell<T>,
    attachment: Attachment,
}

impl<T: StorageValue> StorageInner<T> {
    fn storage(&self) -> Option<Rc<dyn Storage>> {
        self.window.as_ref()?.storage(self.area)
    }

    /// Current slot contents, or the initial value.
    fn read(&self) -> T {
        let Some(storage) = self.storage() else {
            return self.initial.clone();
        };

        let text = match storage.get_item(&self.key) {
            Ok(Some(text)) if !text.is_empty() => text,
            Ok(_) => return self.initial.clone(),
            Err(err) => {
                tracing::warn!(area = %self.area, key = %self.key, error = %err, "error reading storage");
                return self.initial.clone();
            }
        };

        match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(source) => {
                let err = HookError::Decode {
                    key: self.key.clone(),
                    source,
                };
                tracing::warn!(area = %self.area, key = %self.key, error = %err, "error reading storage");
                self.initial.clone()
            }
        }
    }

    fn write(&self, value: T) {
        let text = match serde_json::to_string(&value) {
            Ok(text) => text,
            Err(source) => {
                let err = HookError::Encode {
                    key: self.key.clone(),
                    source,
                };
                tracing::warn!(area = %self.area, key = %self.key, error = %err, "error setting storage");
                return;
            }
        };

        self.value.set(value);
        if let Some(storage) = self.storage() {
            if let Err(err) = storage.set_item(&self.key, &text) {
                tracing::warn!(area = %self.area, key = %self.key, error = %err, "error setting storage");
            }
        }
    }

    fn remove(&self) {
        if let Some(storage) = self.storage() {
            if let Err(err) = storage.remove_item(&self.key) {
                tracing::warn!(area = %self.area, key = %self.key, error = %err, "error removing storage");
            }
        }
        self.value.set(self.initial.clone());
    }

    fn attach(self: &Rc<Self>) {
        let Some(window) = self.window.clone() else {
            return;
        };
        let weak: Weak<Self> = Rc::downgrade(self);

        self.attachment.attach(|teardown| {
            self.value.set(self.read());

            teardown.hold(window.add_event_listener(
                EVENT_STORAGE,
                move |event| {
                    let Some(inner) = weak.upgrade() else {
                        return;
                    };
                    if let EventKind::Storage { area, key, .. } = event.kind() {
                        // `key: None` is a clear() of the whole area
                        let ours = key.as_deref().is_none_or(|k| k == inner.key);
                        if *area == inner.area && ours {
                            inner.value.set(inner.read());
                        }
                    }
                },
                ListenerOptions::default(),
            ));
        });
    }
}

// =============================================================================
// HANDLE
// =============================================================================

/// State persisted in a storage area under one key.
pub struct StorageState<T> {
    inner: Rc<StorageInner<T>>,
}

impl<T> Clone for StorageState<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: StorageValue> StorageState<T> {
    pub fn get(&self) -> T {
        self.inner.value.get()
    }

    pub fn value(&self) -> ReadCell<T> {
        self.inner.value.read_only()
    }

    /// Update the cell and persist `value` as JSON.
    pub fn set(&self, value: T) {
        self.inner.write(value);
    }

    /// Derive the next value from the current one, then `set` it.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = self.inner.value.with(f);
        self.inner.write(next);
    }

    /// Delete the key and fall back to the initial value.
    pub fn remove(&self) {
        self.inner.remove();
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn area(&self) -> StorageArea {
        self.inner.area
    }
}

impl<T: fmt::Debug> fmt::Debug for StorageState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageState")
            .field("area", &self.inner.area)
            .field("key", &self.inner.key)
            .field("value", &self.inner.value)
            .finish()
    }
}

impl_lifecycle!(StorageState<T>, [T: StorageValue]);

// =============================================================================
// PUBLIC API
// =============================================================================

/// State mirrored into `area` under `key`.
pub fn use_storage_state<T: StorageValue>(area: StorageArea, key: &str, initial: T) -> StorageState<T> {
    let inner = StorageInner {
        area,
        key: key.to_string(),
        value: ValueCell::new(initial.clone()),
        initial,
        window: context::window(),
        attachment: Attachment::new(),
    };
    // Seed before anything subscribes so the first read is not a change
    let seeded = inner.read();
    inner.value.set(seeded);

    super::mount(StorageState {
        inner: Rc::new(inner),
    })
}

/// State persisted in `localStorage`.
///
/// # Example
///
/// ```
/// use spark_hooks::{use_local_storage_state, MemoryHost};
///
/// let host = MemoryHost::new();
/// let _guard = host.install();
///
/// let theme = use_local_storage_state("theme", "light".to_string());
/// theme.set("dark".to_string());
///
/// // A fresh reader sees the persisted value
/// let again = use_local_storage_state("theme", "light".to_string());
/// assert_eq!(again.get(), "dark");
/// ```
pub fn use_local_storage_state<T: StorageValue>(key: &str, initial: T) -> StorageState<T> {
    use_storage_state(StorageArea::Local, key, initial)
}

/// State persisted in `sessionStorage`.
pub fn use_session_storage_state<T: StorageValue>(key: &str, initial: T) -> StorageState<T> {
    use_storage_state(StorageArea::Session, key, initial)
}

// =============================================================================
// TESTS
// =============================================================================
