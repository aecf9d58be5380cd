//! Lightweight descriptors of stored files.

use bytes::Bytes;

use crate::error::StorageError;
use crate::registry::FileStoreRegistry;

/// A stored file: where it lives and how large it is, not its content.
///
/// Content is fetched on demand through the provider registered for
/// `store_key`; the handle never holds the provider itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileHandle {
    /// Key of the file store the file belongs to.
    pub store_key: String,
    /// Path within the store, using the local separator.
    pub path: String,
    /// File name.
    pub file_name: String,
    /// Size in bytes.
    pub content_length: u64,
}

impl FileHandle {
    /// Create a handle.
    #[must_use]
    pub fn new(
        store_key: impl Into<String>,
        path: impl Into<String>,
        file_name: impl Into<String>,
        content_length: u64,
    ) -> Self {
        Self {
            store_key: store_key.into(),
            path: path.into(),
            file_name: file_name.into(),
            content_length,
        }
    }

    /// Download the content through the owning provider.
    ///
    /// Returns `Ok(None)` when no provider is registered for the store.
    pub fn open_read(&self, registry: &FileStoreRegistry) -> Result<Option<Bytes>, StorageError> {
        registry
            .get(&self.store_key)
            .map(|provider| provider.get_content(&self.path, &self.file_name))
            .transpose()
    }

    /// Pre-authenticated download URL, or `""` when no provider is registered
    /// for the store or the caller has no access.
    #[must_use]
    pub fn download_url(&self, registry: &FileStoreRegistry) -> String {
        registry
            .get(&self.store_key)
            .map(|provider| provider.get_download_url(&self.path, &self.file_name))
            .unwrap_or_default()
    }
}
