//! Lifecycle notifications around file mutations.

use std::fmt;

use crate::file::FileHandle;

/// Receives notifications before and after files are created, updated or
/// deleted. Every hook defaults to doing nothing.
///
/// Create and update are told apart by whether the file existed before the
/// upload. Placeholder objects marking directories never trigger hooks.
pub trait FileEventExecutor: Send + Sync + fmt::Debug {
    /// A new file is about to be uploaded.
    fn on_before_create(&self, _store_key: &str, _path: &str, _file_name: &str) {}

    /// A new file was uploaded.
    fn on_after_create(&self, _file: &FileHandle) {}

    /// An existing file is about to be overwritten.
    fn on_before_update(&self, _file: &FileHandle) {}

    /// An existing file was overwritten.
    fn on_after_update(&self, _file: &FileHandle) {}

    /// A file is about to be deleted.
    fn on_before_delete(&self, _store_key: &str, _path: &str, _file_name: &str) {}

    /// A file was deleted.
    fn on_after_delete(&self, _store_key: &str, _path: &str, _file_name: &str) {}
}
