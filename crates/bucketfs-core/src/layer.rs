//! Cached file lookups and listings over an [`ObjectStore`].
//!
//! Every lookup follows the same get-or-populate sequence: check the cache,
//! and on a miss take the striped lock for the cache key, check again, and
//! only then call the store. Concurrent lookups of one key therefore make a
//! single request between them.
//!
//! Mutations never update entries in place; they evict everything a change
//! could have made stale (see [`StorageKeys::invalidation_keys`]).

use std::fmt;
use std::sync::Arc;

use bucketfs_client::{ClientError, ListOptions, ObjectStore};
use tracing::{debug, trace};

use crate::cache::{CacheScope, CacheStore, CacheValue};
use crate::file::FileHandle;
use crate::keys::{PathSearch, StorageKeys};
use crate::lockbox::{StripedLock, hash_key};

/// Scopes file lookups are stored under.
const FILE_SCOPE: CacheScope = CacheScope::ALL;

fn listing_scope() -> CacheScope {
    CacheScope::CONTEXT | CacheScope::PROCESS
}

/// Sub-paths and files found under a path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingResult {
    /// Sub-paths in key order, using the local separator.
    pub sub_paths: Vec<String>,
    /// Files in key order.
    pub files: Vec<FileHandle>,
}

/// Cache layer for one file store.
pub struct PathCache {
    keys: StorageKeys,
    store: Arc<dyn ObjectStore>,
    cache: Arc<dyn CacheStore>,
    locks: StripedLock,
    list_page_size: u32,
}

impl fmt::Debug for PathCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathCache")
            .field("keys", &self.keys)
            .field("list_page_size", &self.list_page_size)
            .finish_non_exhaustive()
    }
}

impl PathCache {
    /// Create a cache layer. `list_page_size` of 0 leaves the page size to
    /// the server.
    #[must_use]
    pub fn new(
        keys: StorageKeys,
        store: Arc<dyn ObjectStore>,
        cache: Arc<dyn CacheStore>,
        list_page_size: u32,
    ) -> Self {
        Self {
            keys,
            store,
            cache,
            locks: StripedLock::new(),
            list_page_size,
        }
    }

    /// Key builder of this store.
    #[must_use]
    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// The object store behind the cache.
    #[must_use]
    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    /// Look up one file, asking the store on a miss.
    ///
    /// A file the store does not have is not cached, so the next lookup asks
    /// again.
    pub fn get_file(&self, path: &str, file_name: &str) -> Option<FileHandle> {
        let cache_key = self.keys.file_cache_key(path, file_name);
        if let Some(file) = self.cached_file(&cache_key) {
            return Some(file);
        }

        let _guard = self.locks.acquire(hash_key(&cache_key));
        if let Some(file) = self.cached_file(&cache_key) {
            trace!(key = %cache_key, "file populated while waiting");
            return Some(file);
        }

        let object_key = self.keys.make_key(path, file_name);
        debug!(bucket = %self.keys.bucket(), key = %object_key, "file cache miss");
        let metadata = self.store.get_metadata(self.keys.bucket(), &object_key)?;
        let file = FileHandle::new(
            self.keys.store_key(),
            path,
            file_name,
            metadata.content_length,
        );
        self.cache.put(&cache_key, Arc::new(file.clone()), FILE_SCOPE);
        Some(file)
    }

    /// List a path, asking the store on a miss.
    ///
    /// Every file found is also cached for [`get_file`](Self::get_file).
    pub fn query_path(
        &self,
        path: &str,
        search: PathSearch,
    ) -> Result<Arc<ListingResult>, ClientError> {
        let cache_key = self.keys.query_cache_key(path, search);
        if let Some(listing) = self.cached_listing(&cache_key) {
            return Ok(listing);
        }

        let _guard = self.locks.acquire(hash_key(&cache_key));
        if let Some(listing) = self.cached_listing(&cache_key) {
            trace!(key = %cache_key, "listing populated while waiting");
            return Ok(listing);
        }

        let listing = Arc::new(self.fetch_listing(path, search)?);
        let value: CacheValue = listing.clone();
        self.cache.put(&cache_key, value, listing_scope());
        Ok(listing)
    }

    /// Evict everything a change to `file_name` under `path` can make stale.
    /// An empty `file_name` stands for the path itself.
    pub fn invalidate(&self, path: &str, file_name: &str) {
        let keys = self.keys.invalidation_keys(path, file_name);
        debug!(path, file_name, evicted = keys.len(), "invalidating cache");
        for key in &keys {
            self.cache.remove(key, CacheScope::ALL);
        }
    }

    fn fetch_listing(&self, path: &str, search: PathSearch) -> Result<ListingResult, ClientError> {
        let prefix = self.keys.make_key(path, "");
        let delimiter = match search {
            PathSearch::TopLevelPathOnly => Some("/"),
            PathSearch::AllPaths => None,
        };
        debug!(bucket = %self.keys.bucket(), prefix = %prefix, %search, "listing cache miss");

        let mut listing = ListingResult::default();
        let mut marker: Option<String> = None;
        loop {
            let page = self.store.list_bucket(
                self.keys.bucket(),
                ListOptions {
                    prefix: Some(&prefix),
                    marker: marker.as_deref(),
                    max_keys: Some(self.list_page_size),
                    delimiter,
                },
            )?;

            for common in &page.result.common_prefixes {
                let sub_path = self.keys.extract_sub_path(&common.prefix);
                if listing.sub_paths.last() != Some(&sub_path) {
                    listing.sub_paths.push(sub_path);
                }
            }
            for entry in &page.result.contents {
                let file_name = self.keys.extract_file_name(&entry.key);
                if file_name.is_empty() {
                    continue;
                }
                let file_path = self.keys.extract_path(&entry.key);
                listing
                    .files
                    .push(self.remember_file(&file_path, file_name, entry.size));
            }

            match page.result.continuation_marker() {
                Some(next) if marker.as_deref() != Some(next.as_str()) => marker = Some(next),
                _ => break,
            }
        }

        debug!(
            prefix = %prefix,
            sub_paths = listing.sub_paths.len(),
            files = listing.files.len(),
            "listed path"
        );
        Ok(listing)
    }

    // Runs under a listing stripe, so it must not take a file stripe: the two
    // can share a slot and the locks are not reentrant.
    fn remember_file(&self, path: &str, file_name: &str, size: u64) -> FileHandle {
        let cache_key = self.keys.file_cache_key(path, file_name);
        if let Some(file) = self.cached_file(&cache_key) {
            return file;
        }
        let file = FileHandle::new(self.keys.store_key(), path, file_name, size);
        self.cache.put(&cache_key, Arc::new(file.clone()), FILE_SCOPE);
        file
    }

    fn cached_file(&self, cache_key: &str) -> Option<FileHandle> {
        self.cache
            .get(cache_key, FILE_SCOPE)
            .and_then(|value| value.downcast_ref::<FileHandle>().cloned())
    }

    fn cached_listing(&self, cache_key: &str) -> Option<Arc<ListingResult>> {
        self.cache
            .get(cache_key, listing_scope())
            .and_then(|value| value.downcast::<ListingResult>().ok())
    }
}
