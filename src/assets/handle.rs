//! Handles to loaded resources
//!
//! A handle carries the cache key it was loaded under, so giving it back to
//! its [`ResourceLoader`](super::ResourceLoader) is a direct lookup. Handles
//! built by hand are detached: they draw like any other, but no loader will
//! take them back.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

struct Entry<T> {
    key: Option<String>,
    asset: T,
}

/// Shared reference to a resource. Two handles are equal only when they
/// point at the same loaded entry, whatever the contents.
pub struct AssetHandle<T> {
    entry: Arc<Entry<T>>,
}

impl<T> AssetHandle<T> {
    /// Wrap an asset that no loader owns
    #[must_use]
    pub fn new(asset: T) -> Self {
        Self {
            entry: Arc::new(Entry { key: None, asset }),
        }
    }

    /// Wrap an asset cached under `key`
    pub(crate) fn cached(key: &str, asset: T) -> Self {
        Self {
            entry: Arc::new(Entry {
                key: Some(key.to_string()),
                asset,
            }),
        }
    }

    /// Key of the cache entry, or `None` for a detached handle
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.entry.key.as_deref()
    }

    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.entry.key.is_none()
    }

    #[must_use]
    pub fn get(&self) -> &T {
        &self.entry.asset
    }

    /// Live handles to this entry, the cache's own included
    #[must_use]
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.entry)
    }
}

impl<T> Clone for AssetHandle<T> {
    fn clone(&self) -> Self {
        Self {
            entry: Arc::clone(&self.entry),
        }
    }
}

impl<T> PartialEq for AssetHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entry, &other.entry)
    }
}

impl<T> Eq for AssetHandle<T> {}

impl<T> Deref for AssetHandle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.entry.asset
    }
}

impl<T: fmt::Debug> fmt::Debug for AssetHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key() {
            Some(key) => write!(f, "AssetHandle({key:?}, {:?})", self.get()),
            None => write!(f, "AssetHandle(detached, {:?})", self.get()),
        }
    }
}
