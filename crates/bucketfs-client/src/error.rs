//! Client error types.

use std::io;

use bucketfs_xml::XmlError;
use http::{HeaderMap, StatusCode};

/// Errors returned by object store operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered with a non-success status.
    ///
    /// `message` is the full response body text, so server diagnostics survive.
    #[error("HTTP {status}: {message}")]
    Http {
        /// Response status.
        status: StatusCode,
        /// Response body text.
        message: String,
        /// S3 error code parsed from the `<Error>` body, if it had one.
        code: Option<String>,
        /// `x-amz-request-id` of the failed request.
        request_id: Option<String>,
        /// Response headers.
        headers: HeaderMap,
    },

    /// A custom [`HttpTransport`](crate::HttpTransport) got no response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The HTTP client failed to send the request or read the response.
    /// The underlying cause stays reachable through [`std::error::Error::source`].
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// SigV4 was selected without a region.
    #[error("a region must be configured to use AWS4-HMAC-SHA256 authorization")]
    MissingRegion,

    /// A header name or value could not be put on the wire.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Reading the request content failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The response body was not the XML document expected.
    #[error("malformed response: {0}")]
    Xml(#[from] XmlError),
}

impl ClientError {
    /// HTTP status of the failure, when the server answered at all.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server answered 404.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

impl From<bucketfs_auth::AuthError> for ClientError {
    fn from(err: bucketfs_auth::AuthError) -> Self {
        match err {
            bucketfs_auth::AuthError::MissingRegion => Self::MissingRegion,
        }
    }
}
