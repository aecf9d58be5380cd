//! Cache port and an in-process implementation.
//!
//! Entries are opaque `Arc<dyn Any>` values tagged with the scopes they were
//! stored under. A lookup or removal only touches entries whose scopes
//! intersect the requested ones.

use std::any::Any;
use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

/// Where a cache entry lives.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheScope(u8);

impl CacheScope {
    /// Lives for the current request only.
    pub const CONTEXT: Self = Self(0b001);
    /// Lives in this process.
    pub const PROCESS: Self = Self(0b010);
    /// Shared across processes.
    pub const DISTRIBUTED: Self = Self(0b100);
    /// Every scope.
    pub const ALL: Self = Self(0b111);

    /// Whether every scope in `other` is also in `self`.
    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether `self` and `other` share at least one scope.
    #[must_use]
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for CacheScope {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for CacheScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (Self::CONTEXT, "CONTEXT"),
            (Self::PROCESS, "PROCESS"),
            (Self::DISTRIBUTED, "DISTRIBUTED"),
        ]
        .into_iter()
        .filter(|(scope, _)| self.contains(*scope))
        .map(|(_, name)| name)
        .collect();
        write!(f, "CacheScope({})", names.join(" | "))
    }
}

/// A cached value. Readers downcast to the concrete type they stored.
pub type CacheValue = Arc<dyn Any + Send + Sync>;

/// Key/value cache shared by every thread of the process.
pub trait CacheStore: Send + Sync + fmt::Debug {
    /// Store `value` under `key` in `scope`, replacing any previous entry.
    fn put(&self, key: &str, value: CacheValue, scope: CacheScope);

    /// Look up `key` among entries stored in any of `scope`.
    fn get(&self, key: &str, scope: CacheScope) -> Option<CacheValue>;

    /// Evict `key` if it was stored in any of `scope`.
    fn remove(&self, key: &str, scope: CacheScope);
}

/// [`CacheStore`] held in a `DashMap`. Entries never expire on their own.
#[derive(Default)]
pub struct InMemoryCacheStore {
    entries: DashMap<String, (CacheScope, CacheValue)>,
}

impl fmt::Debug for InMemoryCacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryCacheStore")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl InMemoryCacheStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `key` is present in any scope.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl CacheStore for InMemoryCacheStore {
    fn put(&self, key: &str, value: CacheValue, scope: CacheScope) {
        trace!(key, ?scope, "cache put");
        self.entries.insert(key.to_owned(), (scope, value));
    }

    fn get(&self, key: &str, scope: CacheScope) -> Option<CacheValue> {
        self.entries
            .get(key)
            .filter(|entry| entry.0.intersects(scope))
            .map(|entry| Arc::clone(&entry.1))
    }

    fn remove(&self, key: &str, scope: CacheScope) {
        if self
            .entries
            .remove_if(key, |_, (stored, _)| stored.intersects(scope))
            .is_some()
        {
            trace!(key, ?scope, "cache remove");
        }
    }
}
