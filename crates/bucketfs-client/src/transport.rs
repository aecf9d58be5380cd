//! HTTP transport port and its blocking `reqwest` implementation.

use std::fmt;

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST};
use http::{HeaderMap, Method};
use tracing::debug;

use crate::body::RequestBody;
use crate::error::ClientError;

/// A fully assembled and signed outbound request.
///
/// `host`, `content_type` and `content_length` are transport-level fields
/// rather than raw header lines; `headers` holds everything else.
#[derive(Debug)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL including the query string.
    pub url: String,
    /// Remaining request headers, including `Authorization`.
    pub headers: HeaderMap,
    /// `Host` override.
    pub host: Option<String>,
    /// `Content-Type`.
    pub content_type: Option<String>,
    /// `Content-Length`.
    pub content_length: Option<u64>,
    /// Body, streamed by the transport.
    pub body: Option<RequestBody>,
}

/// Sends requests over the network.
///
/// Any HTTP status is returned as a response; only connectivity failures are
/// errors. Interpreting the status belongs to the caller.
pub trait HttpTransport: Send + Sync + fmt::Debug {
    /// Send a request and buffer the full response body.
    fn execute(&self, request: HttpRequest) -> Result<http::Response<Bytes>, ClientError>;
}

/// [`HttpTransport`] over `reqwest::blocking::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Create a transport with reqwest's default client settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport on a preconfigured client.
    #[must_use]
    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    fn execute(&self, request: HttpRequest) -> Result<http::Response<Bytes>, ClientError> {
        let HttpRequest {
            method,
            url,
            headers,
            host,
            content_type,
            content_length,
            body,
        } = request;

        debug!(%method, %url, "Sending request");

        let mut builder = self.client.request(method, &url).headers(headers);
        if let Some(host) = host {
            builder = builder.header(HOST, host);
        }
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        match body {
            Some(body) => {
                let length = body.len();
                let reader = body.into_reader()?;
                builder = builder.body(reqwest::blocking::Body::sized(reader, length));
            }
            None => {
                if let Some(length) = content_length {
                    builder = builder.header(CONTENT_LENGTH, length);
                }
            }
        }

        let response = builder.send()?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes()?;

        debug!(%status, bytes = body.len(), "Received response");

        let mut out = http::Response::new(body);
        *out.status_mut() = status;
        *out.headers_mut() = headers;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_should_keep_client_error_source() {
        let request = HttpRequest {
            method: Method::GET,
            url: "not a url".to_owned(),
            headers: HeaderMap::new(),
            host: None,
            content_type: None,
            content_length: None,
            body: None,
        };

        let err = ReqwestTransport::new().execute(request).unwrap_err();

        match &err {
            ClientError::Request(inner) => assert!(inner.is_builder()),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.source().is_some());
    }
}
