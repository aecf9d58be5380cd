//! Path and file name checks applied before any request is made.

use std::fmt;

/// Characters never allowed in a store key, path segment or file name.
const FORBIDDEN_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Decides which store key, path and file name combinations are acceptable,
/// and whether the caller may read a file.
pub trait PathValidator: Send + Sync + fmt::Debug {
    /// Whether `path` names a valid location. `""` is the store root.
    fn is_valid_path(&self, path: &str) -> bool;

    /// Whether the full combination is valid.
    fn is_valid(&self, store_key: &str, path: &str, file_name: &str) -> bool;

    /// Whether the current caller may download the file.
    fn has_access(&self, _store_key: &str, _path: &str, _file_name: &str) -> bool {
        true
    }
}

/// Rejects empty segments, `.`/`..`, control characters and characters
/// that are unsafe in object keys or common file systems. Grants access to
/// everyone.
#[derive(Debug, Clone, Copy)]
pub struct DefaultPathValidator {
    separator: char,
}

impl DefaultPathValidator {
    /// Validator for paths using `separator` between segments.
    #[must_use]
    pub fn new(separator: char) -> Self {
        Self { separator }
    }
}

impl Default for DefaultPathValidator {
    fn default() -> Self {
        Self::new('/')
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name.trim() == name
        && !name
            .chars()
            .any(|c| c.is_control() || FORBIDDEN_CHARS.contains(&c))
}

impl PathValidator for DefaultPathValidator {
    fn is_valid_path(&self, path: &str) -> bool {
        path.is_empty() || path.split(self.separator).all(is_valid_name)
    }

    fn is_valid(&self, store_key: &str, path: &str, file_name: &str) -> bool {
        is_valid_name(store_key) && self.is_valid_path(path) && is_valid_name(file_name)
    }
}

/// Insert `-{n}` before the extension of `file_name`, or append it when there
/// is none.
#[must_use]
pub fn numbered_file_name(file_name: &str, n: usize) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}-{n}.{ext}"),
        _ => format!("{file_name}-{n}"),
    }
}
