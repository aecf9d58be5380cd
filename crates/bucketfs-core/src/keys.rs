//! Mapping between local paths, object keys and cache keys.
//!
//! An object key is `{store_key}/{path}/{file_name}` with the local directory
//! separator replaced by `/`. A key ending in `/` names a path, never a file.

use std::fmt;

/// Which part of the tree a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathSearch {
    /// Immediate children of the path only.
    TopLevelPathOnly,
    /// Everything below the path.
    AllPaths,
}

impl fmt::Display for PathSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TopLevelPathOnly => "TopLevelPathOnly",
            Self::AllPaths => "AllPaths",
        })
    }
}

const FILE_CACHE_PREFIX: &str = "PK_AMAZON-S3-FILE";
const QUERY_CACHE_PREFIX: &str = "PK_AMAZON-S3-QUERY-RESULTS";

/// Key builder for one file store within one bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    bucket: String,
    store_key: String,
    separator: char,
}

impl StorageKeys {
    /// Create a key builder.
    #[must_use]
    pub fn new(bucket: impl Into<String>, store_key: impl Into<String>, separator: char) -> Self {
        Self {
            bucket: bucket.into(),
            store_key: store_key.into(),
            separator,
        }
    }

    /// Bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// File store key, the first segment of every object key.
    #[must_use]
    pub fn store_key(&self) -> &str {
        &self.store_key
    }

    /// Local directory separator.
    #[must_use]
    pub fn separator(&self) -> char {
        self.separator
    }

    /// Object key of a file, or of a path when `file_name` is empty.
    ///
    /// ```
    /// use bucketfs_core::keys::StorageKeys;
    ///
    /// let keys = StorageKeys::new("bucket", "images", '\\');
    /// assert_eq!(keys.make_key(r"a\b", "c.png"), "images/a/b/c.png");
    /// assert_eq!(keys.make_key("", ""), "images/");
    /// ```
    #[must_use]
    pub fn make_key(&self, path: &str, file_name: &str) -> String {
        let mut key = String::with_capacity(self.store_key.len() + path.len() + file_name.len() + 2);
        key.push_str(&self.store_key);
        if !path.is_empty() {
            key.push('/');
            key.extend(path.chars().map(|c| if c == self.separator { '/' } else { c }));
        }
        key.push('/');
        key.push_str(file_name);
        key
    }

    /// Key prefix shared by every object of the store.
    #[must_use]
    pub fn root(&self) -> String {
        self.make_key("", "")
    }

    /// Local path of the file an object key names.
    #[must_use]
    pub fn extract_path(&self, key: &str) -> String {
        let relative = self.relative(key);
        let path = relative.rfind('/').map_or("", |idx| &relative[..idx]);
        self.to_local(path.strip_prefix('/').unwrap_or(path))
    }

    /// Local path a common prefix names.
    #[must_use]
    pub fn extract_sub_path(&self, prefix: &str) -> String {
        let relative = self.relative(prefix);
        let path = relative.strip_suffix('/').unwrap_or(relative);
        self.to_local(path.strip_prefix('/').unwrap_or(path))
    }

    /// File name part of an object key.
    #[must_use]
    pub fn extract_file_name<'k>(&self, key: &'k str) -> &'k str {
        key.rfind('/').map_or(key, |idx| &key[idx + 1..])
    }

    /// Parent of a local path, `""` at the top.
    #[must_use]
    pub fn parent_path<'p>(&self, path: &'p str) -> &'p str {
        path.rfind(self.separator).map_or("", |idx| &path[..idx])
    }

    /// Cache key of a single file lookup.
    #[must_use]
    pub fn file_cache_key(&self, path: &str, file_name: &str) -> String {
        format!(
            "{FILE_CACHE_PREFIX}:{},{}",
            self.bucket,
            self.make_key(path, file_name)
        )
    }

    /// Cache key of a listing.
    #[must_use]
    pub fn query_cache_key(&self, path: &str, search: PathSearch) -> String {
        format!(
            "{QUERY_CACHE_PREFIX}:{},{search},{}",
            self.bucket,
            self.make_key(path, "")
        )
    }

    /// Every cache key a change to `file_name` under `path` can make stale.
    ///
    /// Recursive listings of the root and of every ancestor level are
    /// included; shallow listings only for the root (when `path` is the root),
    /// the parent and `path` itself. An empty `file_name` stands for the path.
    #[must_use]
    pub fn invalidation_keys(&self, path: &str, file_name: &str) -> Vec<String> {
        let mut keys = vec![self.query_cache_key("", PathSearch::AllPaths)];
        if path.is_empty() {
            keys.push(self.query_cache_key("", PathSearch::TopLevelPathOnly));
        }

        let segments: Vec<&str> = path.split(self.separator).collect();
        let mut level = String::with_capacity(path.len());
        for (idx, segment) in segments.iter().enumerate() {
            if !level.is_empty() {
                level.push(self.separator);
            }
            level.push_str(segment);
            keys.push(self.query_cache_key(&level, PathSearch::AllPaths));
            if idx + 2 == segments.len() {
                keys.push(self.query_cache_key(&level, PathSearch::TopLevelPathOnly));
            }
        }

        keys.push(self.file_cache_key(path, file_name));
        keys.push(self.query_cache_key(path, PathSearch::TopLevelPathOnly));
        keys
    }

    fn relative<'k>(&self, key: &'k str) -> &'k str {
        key.strip_prefix(self.store_key.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(key)
    }

    fn to_local(&self, path: &str) -> String {
        path.chars()
            .map(|c| if c == '/' { self.separator } else { c })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> StorageKeys {
        StorageKeys::new("media", "images", '/')
    }

    #[test]
    fn test_should_make_keys() {
        let keys = keys();
        assert_eq!(keys.make_key("", "a.png"), "images/a.png");
        assert_eq!(keys.make_key("a/b", "c.png"), "images/a/b/c.png");
        assert_eq!(keys.make_key("a/b", ""), "images/a/b/");
        assert_eq!(keys.root(), "images/");
    }

    #[test]
    fn test_should_round_trip_path_and_file_name() {
        for (path, name) in [
            ("", "a.png"),
            ("a", "b.txt"),
            ("a/b/c", "my file.txt"),
            ("deep/er/still", "x"),
        ] {
            let keys = keys();
            let key = keys.make_key(path, name);
            assert_eq!(keys.extract_path(&key), path, "path of {key}");
            assert_eq!(keys.extract_file_name(&key), name, "name of {key}");
        }
    }

    #[test]
    fn test_should_round_trip_with_local_separator() {
        let keys = StorageKeys::new("media", "images", '\\');
        let key = keys.make_key(r"a\b", "c.png");
        assert_eq!(key, "images/a/b/c.png");
        assert_eq!(keys.extract_path(&key), r"a\b");
        assert_eq!(keys.extract_sub_path("images/a/b/"), r"a\b");
    }

    #[test]
    fn test_should_extract_sub_paths_from_prefixes() {
        let keys = keys();
        assert_eq!(keys.extract_sub_path("images/a/"), "a");
        assert_eq!(keys.extract_sub_path("images/a/b/"), "a/b");
        assert_eq!(keys.extract_sub_path("images/"), "");
    }

    #[test]
    fn test_should_find_parent_path() {
        let keys = keys();
        assert_eq!(keys.parent_path("a/b/c"), "a/b");
        assert_eq!(keys.parent_path("a"), "");
        assert_eq!(keys.parent_path(""), "");
    }

    #[test]
    fn test_should_format_cache_keys() {
        let keys = keys();
        assert_eq!(
            keys.file_cache_key("a", "b.png"),
            "PK_AMAZON-S3-FILE:media,images/a/b.png"
        );
        assert_eq!(
            keys.query_cache_key("a", PathSearch::TopLevelPathOnly),
            "PK_AMAZON-S3-QUERY-RESULTS:media,TopLevelPathOnly,images/a/"
        );
        assert_eq!(
            keys.query_cache_key("", PathSearch::AllPaths),
            "PK_AMAZON-S3-QUERY-RESULTS:media,AllPaths,images/"
        );
    }

    #[test]
    fn test_should_invalidate_ancestors_of_nested_file() {
        let keys = keys();
        let evicted = keys.invalidation_keys("a/b", "c.txt");

        for expected in [
            keys.query_cache_key("", PathSearch::AllPaths),
            keys.query_cache_key("a", PathSearch::AllPaths),
            keys.query_cache_key("a/b", PathSearch::AllPaths),
            keys.query_cache_key("a", PathSearch::TopLevelPathOnly),
            keys.query_cache_key("a/b", PathSearch::TopLevelPathOnly),
            keys.file_cache_key("a/b", "c.txt"),
        ] {
            assert!(evicted.contains(&expected), "missing {expected}");
        }
        assert!(!evicted.contains(&keys.query_cache_key("", PathSearch::TopLevelPathOnly)));
    }

    #[test]
    fn test_should_invalidate_root_listings_for_top_level_file() {
        let keys = keys();
        let evicted = keys.invalidation_keys("", "a.png");
        assert!(evicted.contains(&keys.query_cache_key("", PathSearch::AllPaths)));
        assert!(evicted.contains(&keys.query_cache_key("", PathSearch::TopLevelPathOnly)));
        assert!(evicted.contains(&keys.file_cache_key("", "a.png")));
    }
}
