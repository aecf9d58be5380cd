//! Values parsed out of S3 XML responses.

use chrono::{DateTime, Utc};

/// One `<Contents>` entry of a bucket listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Full object key.
    pub key: String,
    /// `<LastModified>`, when the server sent a parseable one.
    pub last_modified: Option<DateTime<Utc>>,
    /// `<ETag>` with its surrounding quotes.
    pub etag: Option<String>,
    /// `<Size>` in bytes.
    pub size: u64,
}

/// One `<CommonPrefixes>` entry: a key prefix rolled up by the delimiter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommonPrefix {
    /// The prefix, ending with the delimiter.
    pub prefix: String,
}

/// A parsed `<ListBucketResult>` document.
///
/// `contents` and `common_prefixes` keep document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListBucketResult {
    /// Bucket name.
    pub name: String,
    /// Prefix the listing was restricted to.
    pub prefix: String,
    /// Marker the listing started after.
    pub marker: String,
    /// Delimiter used to roll up common prefixes.
    pub delimiter: Option<String>,
    /// Page size the server applied.
    pub max_keys: Option<u32>,
    /// Whether more results are available.
    pub is_truncated: bool,
    /// Marker for the next page, when the server provided one.
    pub next_marker: Option<String>,
    /// Objects in this page.
    pub contents: Vec<ObjectEntry>,
    /// Rolled-up prefixes in this page.
    pub common_prefixes: Vec<CommonPrefix>,
}

impl ListBucketResult {
    /// Marker to pass for the following page, if the listing is truncated.
    ///
    /// Uses `<NextMarker>` when present, otherwise the greatest key or prefix
    /// in this page.
    #[must_use]
    pub fn continuation_marker(&self) -> Option<String> {
        if !self.is_truncated {
            return None;
        }
        if let Some(next) = self.next_marker.as_ref().filter(|m| !m.is_empty()) {
            return Some(next.clone());
        }
        let last_key = self.contents.last().map(|o| o.key.as_str());
        let last_prefix = self.common_prefixes.last().map(|p| p.prefix.as_str());
        last_key.max(last_prefix).map(ToOwned::to_owned)
    }
}

/// The `<Error>` body S3 sends along with a failure status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDocument {
    /// Machine-readable error code, e.g. `NoSuchBucket`.
    pub code: Option<String>,
    /// Human-readable message.
    pub message: Option<String>,
    /// Resource the error refers to.
    pub resource: Option<String>,
    /// Server request ID.
    pub request_id: Option<String>,
}
