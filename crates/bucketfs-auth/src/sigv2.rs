//! AWS Signature Version 2 signing.
//!
//! SigV2 is the older signing mechanism that uses HMAC-SHA1. The `Authorization`
//! header has the format:
//!
//! ```text
//! AWS <AWSAccessKeyId>:<Signature>
//! ```
//!
//! Where `Signature = Base64(HMAC-SHA1(SecretKey, StringToSign))` and:
//!
//! ```text
//! StringToSign = HTTP-Verb + "\n" +
//!                Content-MD5 + "\n" +
//!                Content-Type + "\n" +
//!                Date + "\n" +
//!                CanonicalizedAmzHeaders +
//!                CanonicalizedResource
//! ```

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use sha1::Sha1;
use tracing::trace;

type HmacSha1 = Hmac<Sha1>;

/// Prefix shared by every header that takes part in the signature as `name:value`.
pub const AMZ_HEADER_PREFIX: &str = "x-amz-";

/// Header that replaces `Date` in the string to sign when present.
pub const ALTERNATIVE_DATE_HEADER: &str = "x-amz-date";

/// Sub-resources that are appended to the canonical resource, in precedence order.
/// At most one is ever appended.
const SUB_RESOURCES: &[&str] = &["acl", "torrent", "logging"];

/// Signs requests with the legacy HMAC-SHA1 scheme.
#[derive(Clone)]
pub struct SigV2Signer {
    access_key_id: String,
    secret_access_key: String,
}

impl fmt::Debug for SigV2Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigV2Signer")
            .field("access_key_id", &self.access_key_id)
            .finish_non_exhaustive()
    }
}

impl SigV2Signer {
    /// Create a signer for the given credentials.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }

    /// The access key ID embedded in every signature.
    #[must_use]
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Sign a string to sign and return the full `Authorization` header value.
    #[must_use]
    pub fn authorization(&self, string_to_sign: &str) -> String {
        let signature = compute_sigv2_signature(&self.secret_access_key, string_to_sign);
        format!("AWS {}:{signature}", self.access_key_id)
    }

    /// Build the query string of a pre-authenticated GET URL.
    ///
    /// `encoded_key` must already be percent-encoded the way it appears in the URL path.
    /// The returned string has no leading `?`.
    #[must_use]
    pub fn presigned_query(&self, bucket: &str, encoded_key: &str, expires_epoch: i64) -> String {
        let string_to_sign = format!("GET\n\n\n{expires_epoch}\n/{bucket}/{encoded_key}");
        trace!(string_to_sign, "Built SigV2 presigned string to sign");
        let signature = compute_sigv2_signature(&self.secret_access_key, &string_to_sign);
        format!(
            "AWSAccessKeyId={}&Expires={expires_epoch}&Signature={}",
            self.access_key_id,
            utf8_percent_encode(&signature, NON_ALPHANUMERIC)
        )
    }
}

/// Build the SigV2 string to sign.
///
/// Only `content-type`, `content-md5`, `date` and `x-amz-*` headers take part.
/// The `content-type` and `content-md5` slots are always present, empty when the
/// header is missing. The `date` slot is forced empty when `x-amz-date` is set,
/// and replaced by `expires` when one is given. `encoded_key` is used verbatim.
///
/// # Examples
///
/// ```
/// use bucketfs_auth::sigv2::build_string_to_sign;
///
/// let mut headers = http::HeaderMap::new();
/// headers.insert("date", "Tue, 27 Mar 2007 19:36:42 +0000".parse().unwrap());
/// let sts = build_string_to_sign("GET", "johnsmith", "photos/puppy.jpg", &[], &headers, None);
/// assert_eq!(sts, "GET\n\n\nTue, 27 Mar 2007 19:36:42 +0000\n/johnsmith/photos/puppy.jpg");
/// ```
#[must_use]
pub fn build_string_to_sign(
    method: &str,
    bucket: &str,
    encoded_key: &str,
    query: &[(&str, &str)],
    headers: &http::HeaderMap,
    expires: Option<&str>,
) -> String {
    let mut interesting: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let name = name.as_str().to_ascii_lowercase();
        if matches!(name.as_str(), "content-type" | "content-md5" | "date")
            || name.starts_with(AMZ_HEADER_PREFIX)
        {
            let value = value.to_str().unwrap_or("");
            interesting
                .entry(name)
                .and_modify(|existing| {
                    existing.push(',');
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_owned());
        }
    }

    if interesting.contains_key(ALTERNATIVE_DATE_HEADER) {
        interesting.insert("date".to_owned(), String::new());
    }
    if let Some(expires) = expires {
        interesting.insert("date".to_owned(), expires.to_owned());
    }
    interesting.entry("content-type".to_owned()).or_default();
    interesting.entry("content-md5".to_owned()).or_default();

    let mut result = String::with_capacity(128);
    result.push_str(method);
    result.push('\n');
    for (name, value) in &interesting {
        if name.starts_with(AMZ_HEADER_PREFIX) {
            result.push_str(name);
            result.push(':');
            result.push_str(value.trim());
        } else {
            result.push_str(value);
        }
        result.push('\n');
    }

    result.push('/');
    if !bucket.is_empty() {
        result.push_str(bucket);
        result.push('/');
    }
    result.push_str(encoded_key);

    if let Some(sub_resource) = SUB_RESOURCES
        .iter()
        .find(|sub| query.iter().any(|(k, _)| k == *sub))
    {
        result.push('?');
        result.push_str(sub_resource);
    }

    result
}

/// Compute the SigV2 signature: Base64(HMAC-SHA1(secret, string_to_sign)).
#[must_use]
pub fn compute_sigv2_signature(secret_key: &str, string_to_sign: &str) -> String {
    let mut mac =
        HmacSha1::new_from_slice(secret_key.as_bytes()).expect("HMAC can accept any key length");
    mac.update(string_to_sign.as_bytes());
    let result = mac.finalize().into_bytes();
    BASE64.encode(result)
}

/// Format a timestamp as an RFC 1123 HTTP date, the form used for `x-amz-date`.
///
/// # Examples
///
/// ```
/// use chrono::TimeZone;
///
/// let ts = chrono::Utc.with_ymd_and_hms(2007, 3, 27, 19, 36, 42).unwrap();
/// assert_eq!(bucketfs_auth::sigv2::http_date(&ts), "Tue, 27 Mar 2007 19:36:42 GMT");
/// ```
#[must_use]
pub fn http_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
