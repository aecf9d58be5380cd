//! File-system-like API over one bucket-backed file store.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bucketfs_client::{Connection, ContentStream, ObjectStore, RequestBody};
use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::config::StorageConfig;
use crate::content_type::{ExtensionMimeTypes, MimeTypes};
use crate::error::StorageError;
use crate::events::FileEventExecutor;
use crate::file::FileHandle;
use crate::keys::{PathSearch, StorageKeys};
use crate::layer::PathCache;
use crate::validation::{DefaultPathValidator, PathValidator, numbered_file_name};

/// Name of the zero-byte object that keeps an otherwise empty path alive.
pub const PLACEHOLDER_FILE_NAME: &str = "__path__place__holder.cfs.s3";

const PLACEHOLDER_CONTENT: &[u8] = b"Path Placeholder";

/// Paths and files of one file store, kept under `{store_key}/` in a bucket.
///
/// Reads go through the cache layer; every mutation invalidates the cached
/// listings it can affect. Paths use the configured local separator.
pub struct FileStorageProvider {
    cache: PathCache,
    validator: Arc<dyn PathValidator>,
    mime_types: Arc<dyn MimeTypes>,
    events: Option<Arc<dyn FileEventExecutor>>,
    download_url_expiry: Duration,
}

impl fmt::Debug for FileStorageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStorageProvider")
            .field("store_key", &self.store_key())
            .field("bucket", &self.bucket())
            .field("events", &self.events.is_some())
            .finish_non_exhaustive()
    }
}

impl FileStorageProvider {
    /// Create a provider on an existing object store.
    #[must_use]
    pub fn new(
        store_key: impl Into<String>,
        config: &StorageConfig,
        store: Arc<dyn ObjectStore>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        let keys = StorageKeys::new(
            config.bucket.clone(),
            store_key,
            config.directory_separator,
        );
        Self {
            cache: PathCache::new(keys, store, cache, config.list_page_size),
            validator: Arc::new(DefaultPathValidator::new(config.directory_separator)),
            mime_types: Arc::new(ExtensionMimeTypes::new()),
            events: None,
            download_url_expiry: config.download_url_expiry(),
        }
    }

    /// Create a provider that talks HTTP to the endpoint `config` describes.
    ///
    /// # Errors
    ///
    /// Fails when SigV4 is configured without a region.
    pub fn connect(
        store_key: impl Into<String>,
        config: &StorageConfig,
        cache: Arc<dyn CacheStore>,
    ) -> Result<Self, StorageError> {
        let connection = Connection::with_reqwest(config.to_connection_config())?;
        Ok(Self::new(store_key, config, Arc::new(connection), cache))
    }

    /// Replace the path validator and access check.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn PathValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Replace the content type lookup.
    #[must_use]
    pub fn with_mime_types(mut self, mime_types: Arc<dyn MimeTypes>) -> Self {
        self.mime_types = mime_types;
        self
    }

    /// Send lifecycle notifications to `events`.
    #[must_use]
    pub fn with_event_executor(mut self, events: Arc<dyn FileEventExecutor>) -> Self {
        self.events = Some(events);
        self
    }

    /// Key of this file store.
    #[must_use]
    pub fn store_key(&self) -> &str {
        self.cache.keys().store_key()
    }

    /// Bucket holding the files.
    #[must_use]
    pub fn bucket(&self) -> &str {
        self.cache.keys().bucket()
    }

    /// Make sure the bucket exists, creating it if needed.
    ///
    /// Failures are logged and otherwise ignored: the bucket commonly exists
    /// already, or is owned by credentials that may not create buckets.
    pub fn initialize(&self) {
        let store = self.cache.store();
        let result = store.bucket_exists(self.bucket()).and_then(|exists| {
            if exists {
                return Ok(());
            }
            info!(bucket = %self.bucket(), "creating bucket");
            store.create_bucket(self.bucket()).map(|_| ())
        });
        if let Err(e) = result {
            warn!(bucket = %self.bucket(), error = %e, "failed to ensure bucket exists");
        }
    }

    /// Immediate sub-paths of `path`.
    pub fn get_paths(&self, path: &str) -> Result<Vec<String>, StorageError> {
        let listing = self.cache.query_path(path, PathSearch::TopLevelPathOnly)?;
        Ok(listing.sub_paths.clone())
    }

    /// Look up one file. `Ok(None)` when it does not exist.
    pub fn get_file(&self, path: &str, file_name: &str) -> Result<Option<FileHandle>, StorageError> {
        self.check_file(path, file_name)?;
        Ok(self.cache.get_file(path, file_name))
    }

    /// Files under `path`, without directory placeholders.
    pub fn get_files(&self, path: &str, search: PathSearch) -> Result<Vec<FileHandle>, StorageError> {
        if !self.validator.is_valid_path(path) {
            return Err(StorageError::invalid_path(Some(path)));
        }
        self.files_under(path, search, false)
    }

    /// Create `path` by uploading a placeholder object into it.
    pub fn add_path(&self, path: &str) -> Result<(), StorageError> {
        self.add_update_file(
            path,
            PLACEHOLDER_FILE_NAME,
            RequestBody::from_bytes(Bytes::from_static(PLACEHOLDER_CONTENT)),
        )?;
        self.cache.invalidate(self.cache.keys().parent_path(path), "");
        Ok(())
    }

    /// Upload a file. With `ensure_unique`, an existing name gets `-1`, `-2`,
    /// ... inserted before its extension until it is free.
    pub fn add_file(
        &self,
        path: &str,
        file_name: &str,
        content: RequestBody,
        ensure_unique: bool,
    ) -> Result<FileHandle, StorageError> {
        if ensure_unique {
            let unique = self.unique_file_name(path, file_name)?;
            return self.add_update_file(path, &unique, content);
        }
        self.add_update_file(path, file_name, content)
    }

    /// [`add_file`](Self::add_file) from a seekable stream, such as an open
    /// local file. Measuring the stream fails with [`StorageError::Io`].
    pub fn add_file_from_stream(
        &self,
        path: &str,
        file_name: &str,
        source: ContentStream,
        ensure_unique: bool,
    ) -> Result<FileHandle, StorageError> {
        self.check_file(path, file_name)?;
        let content = RequestBody::new(source)?;
        self.add_file(path, file_name, content, ensure_unique)
    }

    /// Upload a file, replacing any existing one of the same name.
    pub fn add_update_file(
        &self,
        path: &str,
        file_name: &str,
        content: RequestBody,
    ) -> Result<FileHandle, StorageError> {
        self.check_file(path, file_name)?;

        let events = self
            .events
            .as_deref()
            .filter(|_| file_name != PLACEHOLDER_FILE_NAME);
        let original = match events {
            Some(events) => {
                let original = self.cache.get_file(path, file_name);
                match &original {
                    Some(file) => events.on_before_update(file),
                    None => events.on_before_create(self.store_key(), path, file_name),
                }
                original
            }
            None => None,
        };

        let key = self.cache.keys().make_key(path, file_name);
        let content_length = content.len();
        let content_type = self.mime_types.mime_type(file_name);
        self.cache.store().put(
            self.bucket(),
            &key,
            &[],
            content,
            &[("Content-Type", content_type.as_ref())],
        )?;
        self.cache.invalidate(path, file_name);
        debug!(key = %key, content_type = %content_type, length = content_length, "stored file");

        let file = self.cache.get_file(path, file_name).unwrap_or_else(|| {
            FileHandle::new(self.store_key(), path, file_name, content_length)
        });
        if let Some(events) = events {
            if original.is_some() {
                events.on_after_update(&file);
            } else {
                events.on_after_create(&file);
            }
        }
        Ok(file)
    }

    /// Delete one file.
    pub fn delete_file(&self, path: &str, file_name: &str) -> Result<(), StorageError> {
        self.check_file(path, file_name)?;
        if let Some(events) = &self.events {
            events.on_before_delete(self.store_key(), path, file_name);
        }
        let key = self.cache.keys().make_key(path, file_name);
        self.cache.store().delete(self.bucket(), &key)?;
        self.cache.invalidate(path, file_name);
        if let Some(events) = &self.events {
            events.on_after_delete(self.store_key(), path, file_name);
        }
        Ok(())
    }

    /// Delete `path` and everything below it, placeholders included.
    /// An invalid path deletes nothing.
    pub fn delete_path(&self, path: &str) -> Result<(), StorageError> {
        if !self.validator.is_valid_path(path) {
            debug!(path, "ignoring delete of invalid path");
            return Ok(());
        }
        for file in self.files_under(path, PathSearch::AllPaths, true)? {
            self.delete_file(&file.path, &file.file_name)?;
        }
        self.cache.invalidate(path, "");
        self.cache.invalidate(self.cache.keys().parent_path(path), "");
        Ok(())
    }

    /// Delete every file of the store.
    pub fn delete_all(&self) -> Result<(), StorageError> {
        for file in self.files_under("", PathSearch::AllPaths, true)? {
            self.delete_file(&file.path, &file.file_name)?;
        }
        Ok(())
    }

    /// Download a file fully into memory.
    pub fn get_content(&self, path: &str, file_name: &str) -> Result<Bytes, StorageError> {
        self.check_file(path, file_name)?;
        let key = self.cache.keys().make_key(path, file_name);
        Ok(self.cache.store().get_content(self.bucket(), &key)?)
    }

    /// Pre-authenticated download URL, or `""` when the caller may not read
    /// the file or the name is invalid.
    #[must_use]
    pub fn get_download_url(&self, path: &str, file_name: &str) -> String {
        if !self.validator.is_valid(self.store_key(), path, file_name)
            || !self.validator.has_access(self.store_key(), path, file_name)
        {
            return String::new();
        }
        let key = self.cache.keys().make_key(path, file_name);
        self.cache
            .store()
            .direct_url(self.bucket(), &key, self.download_url_expiry)
    }

    /// First of `file_name`, `name-1.ext`, `name-2.ext`, ... not taken in `path`.
    pub fn unique_file_name(&self, path: &str, file_name: &str) -> Result<String, StorageError> {
        let mut candidate = file_name.to_owned();
        let mut n = 0;
        while self.get_file(path, &candidate)?.is_some() {
            n += 1;
            candidate = numbered_file_name(file_name, n);
        }
        Ok(candidate)
    }

    fn files_under(
        &self,
        path: &str,
        search: PathSearch,
        include_placeholders: bool,
    ) -> Result<Vec<FileHandle>, StorageError> {
        let listing = self.cache.query_path(path, search)?;
        Ok(listing
            .files
            .iter()
            .filter(|f| include_placeholders || f.file_name != PLACEHOLDER_FILE_NAME)
            .cloned()
            .collect())
    }

    fn check_file(&self, path: &str, file_name: &str) -> Result<(), StorageError> {
        if self.validator.is_valid(self.store_key(), path, file_name) {
            return Ok(());
        }
        Err(StorageError::invalid_file_path(
            Some(self.store_key()),
            Some(path),
            Some(file_name),
        ))
    }
}
