//! Error types for the storage layer.

use bucketfs_client::ClientError;

/// Errors returned by [`FileStorageProvider`](crate::FileStorageProvider).
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The store key, path and file name combination was rejected before any
    /// request was made.
    #[error(
        "The provided path and/or file name is invalid. File store key {}, path {}, file name {}",
        value_for_log(.store_key.as_deref()),
        value_for_log(.path.as_deref()),
        value_for_log(.file_name.as_deref())
    )]
    InvalidFilePath {
        /// File store key.
        store_key: Option<String>,
        /// Path within the store.
        path: Option<String>,
        /// File name.
        file_name: Option<String>,
    },

    /// The path was rejected before any request was made.
    #[error("The provided path is invalid: {}", value_for_log(.path.as_deref()))]
    InvalidPath {
        /// Path within the store.
        path: Option<String>,
    },

    /// The object store call failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Reading upload content failed.
    #[error("failed to read content: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Build an [`InvalidFilePath`](Self::InvalidFilePath) error.
    #[must_use]
    pub fn invalid_file_path(store_key: Option<&str>, path: Option<&str>, file_name: Option<&str>) -> Self {
        Self::InvalidFilePath {
            store_key: store_key.map(ToOwned::to_owned),
            path: path.map(ToOwned::to_owned),
            file_name: file_name.map(ToOwned::to_owned),
        }
    }

    /// Build an [`InvalidPath`](Self::InvalidPath) error.
    #[must_use]
    pub fn invalid_path(path: Option<&str>) -> Self {
        Self::InvalidPath {
            path: path.map(ToOwned::to_owned),
        }
    }
}

fn value_for_log(value: Option<&str>) -> String {
    match value {
        Some(v) => format!("\"{v}\""),
        None => "<null>".to_owned(),
    }
}
