//! Process-wide lookup of providers by file store key.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use crate::provider::FileStorageProvider;

/// Maps file store keys to their providers.
///
/// [`FileHandle`](crate::FileHandle)s resolve their provider here at call
/// time instead of holding a reference to it.
#[derive(Default)]
pub struct FileStoreRegistry {
    providers: DashMap<String, Arc<FileStorageProvider>>,
}

impl fmt::Debug for FileStoreRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStoreRegistry")
            .field("stores", &self.providers.len())
            .finish()
    }
}

impl FileStoreRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own store key, replacing any previous one.
    pub fn register(&self, provider: Arc<FileStorageProvider>) {
        let store_key = provider.store_key().to_owned();
        info!(store_key = %store_key, "registered file store");
        self.providers.insert(store_key, provider);
    }

    /// Provider for `store_key`.
    #[must_use]
    pub fn get(&self, store_key: &str) -> Option<Arc<FileStorageProvider>> {
        self.providers
            .get(store_key)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Unregister and return the provider for `store_key`.
    pub fn remove(&self, store_key: &str) -> Option<Arc<FileStorageProvider>> {
        self.providers.remove(store_key).map(|(_, provider)| provider)
    }

    /// Registered store keys, in no particular order.
    #[must_use]
    pub fn store_keys(&self) -> Vec<String> {
        self.providers.iter().map(|e| e.key().clone()).collect()
    }

    /// Number of registered stores.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no store is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
