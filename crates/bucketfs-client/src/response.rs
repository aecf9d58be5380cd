//! Typed views over HTTP responses.

use std::collections::BTreeMap;

use bucketfs_xml::{ErrorDocument, ListBucketResult, from_xml};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, LAST_MODIFIED};
use http::{HeaderMap, StatusCode};
use tracing::debug;

use crate::error::ClientError;
use crate::request::METADATA_PREFIX;

/// Status and diagnostic IDs of a successful response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status.
    pub status: StatusCode,
    /// `x-amz-id-2`.
    pub amz_id_2: Option<String>,
    /// `x-amz-request-id`.
    pub request_id: Option<String>,
}

impl Response {
    /// Read status and IDs from a response known to be successful.
    #[must_use]
    pub fn from_parts(status: StatusCode, headers: &HeaderMap) -> Self {
        Self {
            status,
            amz_id_2: header_string(headers, "x-amz-id-2"),
            request_id: header_string(headers, "x-amz-request-id"),
        }
    }

    /// Accept a 2xx response, or turn anything else into [`ClientError::Http`]
    /// carrying the full body text.
    pub fn check(response: http::Response<Bytes>) -> Result<http::Response<Bytes>, ClientError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let (parts, body) = response.into_parts();
        let message = String::from_utf8_lossy(&body).into_owned();
        let code = from_xml::<ErrorDocument>(&body).ok().and_then(|doc| doc.code);
        let request_id = header_string(&parts.headers, "x-amz-request-id");
        debug!(
            status = %parts.status,
            code = code.as_deref().unwrap_or(""),
            request_id = request_id.as_deref().unwrap_or(""),
            "Request failed"
        );
        Err(ClientError::Http {
            status: parts.status,
            message,
            code,
            request_id,
            headers: parts.headers,
        })
    }

    /// [`check`](Self::check) and keep only status and IDs.
    pub fn from_http(response: http::Response<Bytes>) -> Result<Self, ClientError> {
        let response = Self::check(response)?;
        Ok(Self::from_parts(response.status(), response.headers()))
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned)
}

/// User metadata looked up case-insensitively, in key order.
///
/// Keys keep the case they were inserted with. HTTP header names arrive
/// lowercased, so metadata read from a response has lowercase keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataMap(BTreeMap<String, (String, String)>);

impl MetadataMap {
    /// Insert a value, replacing any entry whose key differs only in case.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.0
            .insert(key.to_ascii_lowercase(), (key.to_owned(), value.into()));
    }

    /// Look up a value regardless of key case.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(&key.to_ascii_lowercase())
            .map(|(_, value)| value.as_str())
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries with their original key case, ordered by lowercase key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.values().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Response to a HEAD on an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadataResponse {
    /// Status and IDs.
    pub response: Response,
    /// `Last-Modified`.
    pub last_modified: Option<DateTime<Utc>>,
    /// `Content-Type`.
    pub content_type: Option<String>,
    /// `Content-Length`.
    pub content_length: u64,
    /// `x-amz-meta-*` headers with the prefix stripped.
    pub metadata: MetadataMap,
}

impl ObjectMetadataResponse {
    /// Parse the metadata headers of a response.
    pub fn from_http(response: http::Response<Bytes>) -> Result<Self, ClientError> {
        let response = Response::check(response)?;
        let headers = response.headers();

        let last_modified = headers
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
            .map(|dt| dt.with_timezone(&Utc));
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned);
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0);

        let mut metadata = MetadataMap::default();
        for (name, value) in headers {
            if let Some(key) = name.as_str().strip_prefix(METADATA_PREFIX) {
                if let Ok(value) = value.to_str() {
                    metadata.insert(key, value);
                }
            }
        }

        Ok(Self {
            response: Response::from_parts(response.status(), headers),
            last_modified,
            content_type,
            content_length,
            metadata,
        })
    }
}

/// Response to a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectListResponse {
    /// Status and IDs.
    pub response: Response,
    /// Parsed `<ListBucketResult>`.
    pub result: ListBucketResult,
}

impl ObjectListResponse {
    /// Parse the XML body of a listing response.
    pub fn from_http(response: http::Response<Bytes>) -> Result<Self, ClientError> {
        let response = Response::check(response)?;
        let result = from_xml::<ListBucketResult>(response.body())?;
        Ok(Self {
            response: Response::from_parts(response.status(), response.headers()),
            result,
        })
    }
}
