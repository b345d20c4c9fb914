//! Persisted cart id storage.
//!
//! The controller persists the id of the current cart under
//! `{namespace}-cart-id`, the way a browser storefront keeps it in local
//! storage. [`CartIdStore`] abstracts that key-value store so the controller
//! can run against memory in tests and a JSON file from the CLI.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

/// Errors raised by a cart id store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The backing file does not hold a JSON object of strings.
    #[error("Corrupt cart store {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Key-value store holding persisted cart ids.
pub trait CartIdStore: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a value. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// The storage key for a cart namespace.
#[must_use]
pub fn cart_key(namespace: &str) -> String {
    format!("{namespace}-cart-id")
}

// =============================================================================
// In-memory store
// =============================================================================

/// Process-local store, for tests and short-lived sessions.
#[derive(Debug, Default)]
pub struct MemoryCartIdStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryCartIdStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartIdStore for MemoryCartIdStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

// =============================================================================
// File-backed store
// =============================================================================

/// Store backed by a JSON object on disk.
///
/// Every call re-reads the file, so separate processes sharing the file see
/// each other's writes. Writes go to a temporary file that is renamed into
/// place. There is no cross-process locking.
#[derive(Debug, Clone)]
pub struct FileCartIdStore {
    path: PathBuf,
}

impl FileCartIdStore {
    /// Create a store for the given file. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        let json = serde_json::to_string_pretty(entries).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

impl CartIdStore for FileCartIdStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.read()?;
        entries.insert(key.to_owned(), value.to_owned());
        self.write(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.read()?;
        if entries.remove(key).is_some() {
            self.write(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("hk-store-{name}-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_cart_key() {
        assert_eq!(cart_key("my-shop"), "my-shop-cart-id");
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryCartIdStore::new();
        assert_eq!(store.get("a").unwrap(), None);

        store.set("a", "cart-1").unwrap();
        store.set("a", "cart-2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("cart-2"));

        store.remove("a").unwrap();
        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let store = FileCartIdStore::new(temp_path("missing"));
        assert_eq!(store.get("shop-cart-id").unwrap(), None);
        store.remove("shop-cart-id").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let path = temp_path("persist");
        FileCartIdStore::new(&path)
            .set("shop-cart-id", "gid://shopify/Cart/1")
            .unwrap();
        FileCartIdStore::new(&path)
            .set("other-cart-id", "gid://shopify/Cart/2")
            .unwrap();

        let store = FileCartIdStore::new(&path);
        assert_eq!(
            store.get("shop-cart-id").unwrap().as_deref(),
            Some("gid://shopify/Cart/1")
        );

        store.remove("shop-cart-id").unwrap();
        assert_eq!(store.get("shop-cart-id").unwrap(), None);
        assert_eq!(
            store.get("other-cart-id").unwrap().as_deref(),
            Some("gid://shopify/Cart/2")
        );

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_file_store_corrupt() {
        let path = temp_path("corrupt");
        fs::write(&path, "not json").unwrap();
        let store = FileCartIdStore::new(&path);
        assert!(matches!(store.get("k"), Err(StoreError::Corrupt { .. })));
        fs::remove_file(&path).unwrap();
    }
}
