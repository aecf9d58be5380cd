//! Canonical request construction for AWS Signature Version 4.
//!
//! This module implements the canonical request format as specified by AWS:
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! It also owns the percent-encoding rules shared by both signers, so that the
//! path placed on the wire and the path that gets signed never diverge.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Characters that must be percent-encoded in a query value or a single path segment.
///
/// Everything except the RFC 3986 unreserved characters
/// (A-Z, a-z, 0-9, `-`, `_`, `.`, `~`) is encoded.
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Same as [`URI_ENCODE_SET`] but keeps `/` literal, for whole object keys.
const KEY_ENCODE_SET: &AsciiSet = &URI_ENCODE_SET.remove(b'/');

/// Percent-encode an object key for use in a request path.
///
/// Forward slashes stay literal so the key keeps its hierarchical shape; a space
/// becomes `%20`, never `+`.
///
/// # Examples
///
/// ```
/// use bucketfs_auth::canonical::encode_object_key;
///
/// assert_eq!(encode_object_key("store/a b/c.txt"), "store/a%20b/c.txt");
/// assert_eq!(encode_object_key("x+y"), "x%2By");
/// ```
#[must_use]
pub fn encode_object_key(key: &str) -> String {
    utf8_percent_encode(key, KEY_ENCODE_SET).to_string()
}

/// Percent-encode a query parameter value. Slashes are encoded.
///
/// # Examples
///
/// ```
/// use bucketfs_auth::canonical::encode_query_value;
///
/// assert_eq!(encode_query_value("store/a/"), "store%2Fa%2F");
/// ```
#[must_use]
pub fn encode_query_value(value: &str) -> String {
    utf8_percent_encode(value, URI_ENCODE_SET).to_string()
}

/// Build the full canonical request string from its components.
///
/// Every header passed in is signed. The result is a newline-separated string of:
/// 1. HTTP method
/// 2. Canonical URI
/// 3. Canonical query string
/// 4. Canonical headers (terminated by an extra newline)
/// 5. Signed headers
/// 6. Hashed payload
///
/// # Examples
///
/// ```
/// use bucketfs_auth::canonical::build_canonical_request;
///
/// let canonical = build_canonical_request(
///     "GET",
///     "/test.txt",
///     &[],
///     &[("host", "examplebucket.s3.amazonaws.com")],
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
/// );
/// assert!(canonical.starts_with("GET\n/test.txt\n"));
/// ```
#[must_use]
pub fn build_canonical_request(
    method: &str,
    uri: &str,
    query: &[(&str, &str)],
    headers: &[(&str, &str)],
    payload_hash: &str,
) -> String {
    let canonical_uri = build_canonical_uri(uri);
    let canonical_query = build_canonical_query_string(query);
    let canonical_headers = build_canonical_headers(headers);
    let signed_headers_str = build_signed_headers_string(headers.iter().map(|(name, _)| *name));

    format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n\n{signed_headers_str}\n{payload_hash}"
    )
}

/// Build the canonical URI by URI-encoding each path segment individually.
///
/// Forward slashes (`/`) are preserved. Empty paths are normalized to `/`.
///
/// # Examples
///
/// ```
/// use bucketfs_auth::canonical::build_canonical_uri;
///
/// assert_eq!(build_canonical_uri("/test.txt"), "/test.txt");
/// assert_eq!(build_canonical_uri(""), "/");
/// ```
#[must_use]
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_owned();
    }

    path.split('/')
        .map(|segment| {
            // Decode first so an already-encoded path is not encoded twice.
            let decoded = percent_decode_str(segment).decode_utf8_lossy();
            encode_query_value(&decoded)
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the canonical query string from raw (unencoded) parameter pairs.
///
/// Pairs are sorted ordinally by key, then value. Values are encoded with
/// [`encode_query_value`]; keys are emitted as given.
///
/// # Examples
///
/// ```
/// use bucketfs_auth::canonical::build_canonical_query_string;
///
/// assert_eq!(build_canonical_query_string(&[]), "");
/// assert_eq!(
///     build_canonical_query_string(&[("prefix", "a/b"), ("delimiter", "/")]),
///     "delimiter=%2F&prefix=a%2Fb"
/// );
/// ```
#[must_use]
pub fn build_canonical_query_string(query: &[(&str, &str)]) -> String {
    let mut params: Vec<(&str, &str)> = query.to_vec();
    params.sort_unstable();

    params
        .iter()
        .map(|(k, v)| format!("{k}={}", encode_query_value(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the canonical headers string from the request headers.
///
/// Header names are lowercased, values are trimmed and internal whitespace runs
/// are collapsed to a single space. Headers are sorted by name; repeated names
/// have their values joined with commas.
///
/// The result does NOT include a trailing newline; the caller adds that as part of
/// the canonical request format.
///
/// # Examples
///
/// ```
/// use bucketfs_auth::canonical::build_canonical_headers;
///
/// let result = build_canonical_headers(&[
///     ("X-Amz-Date", "20130524T000000Z"),
///     ("Host", "example.com"),
/// ]);
/// assert_eq!(result, "host:example.com\nx-amz-date:20130524T000000Z");
/// ```
#[must_use]
pub fn build_canonical_headers(headers: &[(&str, &str)]) -> String {
    let mut header_map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let trimmed_value = collapse_whitespace(value.trim());
        header_map
            .entry(name.to_lowercase())
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&trimmed_value);
            })
            .or_insert(trimmed_value);
    }

    header_map
        .iter()
        .map(|(name, value)| format!("{name}:{value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the signed headers string as a semicolon-separated list of lowercase header names.
///
/// # Examples
///
/// ```
/// use bucketfs_auth::canonical::build_signed_headers_string;
///
/// assert_eq!(
///     build_signed_headers_string(["X-Amz-Date", "host"]),
///     "host;x-amz-date"
/// );
/// ```
#[must_use]
pub fn build_signed_headers_string<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    let mut sorted: Vec<String> = names.into_iter().map(str::to_lowercase).collect();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.join(";")
}

/// Collapse consecutive whitespace characters in a string to a single space.
fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result
}
