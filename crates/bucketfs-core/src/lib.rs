//! Hierarchical file storage on top of an S3-compatible bucket.
//!
//! Object stores have no directories, only flat keys. This crate synthesizes
//! paths from key prefixes, keeps otherwise empty paths alive with placeholder
//! objects, and caches lookups and listings so that concurrent callers asking
//! for the same thing make one request between them.
//!
//! # Architecture
//!
//! ```text
//! FileStorageProvider (paths, files, add/delete, events, validation)
//!        |
//!        v
//!   PathCache (get-or-populate under StripedLock, invalidation cascade)
//!        |                     |
//!        v                     v
//!   ObjectStore           CacheStore
//!   (bucketfs-client)     (InMemoryCacheStore)
//! ```
//!
//! # Modules
//!
//! - [`cache`] - Cache port and the in-process implementation
//! - [`config`] - File store configuration and endpoint derivation
//! - [`content_type`] - Content type lookup by file name
//! - [`error`] - Storage error types
//! - [`events`] - Lifecycle notifications
//! - [`file`] - File descriptors
//! - [`keys`] - Object key and cache key construction
//! - [`layer`] - The caching layer
//! - [`lockbox`] - Striped lock
//! - [`provider`] - The file store facade
//! - [`registry`] - Providers by store key
//! - [`validation`] - Path and name checks

pub mod cache;
pub mod config;
pub mod content_type;
pub mod error;
pub mod events;
pub mod file;
pub mod keys;
pub mod layer;
pub mod lockbox;
pub mod provider;
pub mod registry;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use cache::{CacheScope, CacheStore, CacheValue, InMemoryCacheStore};
pub use config::StorageConfig;
pub use error::StorageError;
pub use events::FileEventExecutor;
pub use file::FileHandle;
pub use keys::PathSearch;
pub use layer::{ListingResult, PathCache};
pub use provider::{FileStorageProvider, PLACEHOLDER_FILE_NAME};
pub use registry::FileStoreRegistry;
pub use validation::{DefaultPathValidator, PathValidator};
