// ============================================================================
// spark-hooks - Storage
// Web Storage (localStorage / sessionStorage) adapter
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;

use crate::core::error::{HookError, Result};

/// Which storage area a `Storage` backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageArea {
    Local,
    Session,
}

impl StorageArea {
    /// Name of the browser global for this area.
    pub fn name(self) -> &'static str {
        match self {
            Self::Local => "localStorage",
            Self::Session => "sessionStorage",
        }
    }
}

impl fmt::Display for StorageArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A string key/value storage area.
///
/// Every operation may be refused by the host (quota, privacy mode); hooks
/// report the refusal and carry on.
pub trait Storage {
    fn area(&self) -> StorageArea;

    fn get_item(&self, key: &str) -> Result<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    fn remove_item(&self, key: &str) -> Result<()>;

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// MEMORY STORAGE
// =============================================================================

/// In-memory storage area with an optional byte quota.
pub struct MemoryStorage {
    area: StorageArea,
    items: RefCell<BTreeMap<String, String>>,
    /// Maximum total bytes of keys plus values
    quota: Cell<Option<usize>>,
    denied: Cell<bool>,
}

impl MemoryStorage {
    pub fn new(area: StorageArea) -> Self {
        Self {
            area,
            items: RefCell::new(BTreeMap::new()),
            quota: Cell::new(None),
            denied: Cell::new(false),
        }
    }

    /// Reject writes that would grow the area past `bytes`.
    pub fn set_quota(&self, bytes: Option<usize>) {
        self.quota.set(bytes);
    }

    /// Refuse every read and write, as a browser does in some privacy modes.
    pub fn deny_access(&self, denied: bool) {
        self.denied.set(denied);
    }

    /// Total bytes of keys plus values.
    pub fn used_bytes(&self) -> usize {
        self.items
            .borrow()
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }

    /// Raw snapshot of the stored pairs.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.items
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn check_access(&self, operation: &'static str, key: &str) -> Result<()> {
        if self.denied.get() {
            return Err(HookError::Storage {
                area: self.area.name(),
                operation,
                key: key.to_string(),
                reason: "access denied".into(),
            });
        }
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn area(&self) -> StorageArea {
        self.area
    }

    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.check_access("getItem", key)?;
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.check_access("setItem", key)?;

        if let Some(quota) = self.quota.get() {
            let current = self.items.borrow().get(key).map_or(0, |v| key.len() + v.len());
            let projected = self.used_bytes() - current + key.len() + value.len();
            if projected > quota {
                return Err(HookError::Storage {
                    area: self.area.name(),
                    operation: "setItem",
                    key: key.to_string(),
                    reason: format!("quota of {quota} bytes exceeded"),
                });
            }
        }

        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.check_access("removeItem", key)?;
        self.items.borrow_mut().remove(key);
        Ok(())
    }

    fn clear(&self) {
        self.items.borrow_mut().clear();
    }

    fn len(&self) -> usize {
        self.items.borrow().len()
    }
}

impl fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("area", &self.area)
            .field("items", &self.items.borrow().len())
            .field("quota", &self.quota.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let s = MemoryStorage::new(StorageArea::Local);
        s.set_item("k", "v").unwrap();
        assert_eq!(s.get_item("k").unwrap().as_deref(), Some("v"));
        s.remove_item("k").unwrap();
        assert_eq!(s.get_item("k").unwrap(), None);
        assert!(s.is_empty());
    }

    #[test]
    fn quota_rejects_oversize_writes() {
        let s = MemoryStorage::new(StorageArea::Session);
        s.set_quota(Some(8));
        s.set_item("ab", "cdef").unwrap();

        let err = s.set_item("big", "0123456789").unwrap_err();
        assert!(matches!(err, HookError::Storage { operation: "setItem", .. }));
        assert_eq!(s.len(), 1);

        // Overwriting in place counts the freed bytes
        s.set_item("ab", "cdefgh").unwrap();
    }

    #[test]
    fn denied_access_fails_reads() {
        let s = MemoryStorage::new(StorageArea::Local);
        s.deny_access(true);
        let err = s.get_item("k").unwrap_err();
        assert!(err.to_string().starts_with("localStorage rejected getItem"));
    }
}
