//! Operation-level API over an S3-compatible endpoint.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use http::{Method, StatusCode};
use tracing::{debug, info};

use crate::body::RequestBody;
use crate::config::ConnectionConfig;
use crate::error::ClientError;
use crate::request::{RequestSigner, RequestSpec};
use crate::response::{ObjectListResponse, ObjectMetadataResponse, Response};
use crate::transport::{HttpTransport, ReqwestTransport};

/// Parameters of a bucket listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions<'a> {
    /// Only keys starting with this prefix.
    pub prefix: Option<&'a str>,
    /// Only keys after this one.
    pub marker: Option<&'a str>,
    /// Page size; omitted when `None`.
    pub max_keys: Option<u32>,
    /// Roll keys up to common prefixes at this delimiter.
    pub delimiter: Option<&'a str>,
}

impl ListOptions<'_> {
    fn to_query(self) -> Vec<(&'static str, String)> {
        let mut query = Vec::with_capacity(4);
        if let Some(prefix) = self.prefix {
            query.push(("prefix", prefix.to_owned()));
        }
        if let Some(marker) = self.marker {
            query.push(("marker", marker.to_owned()));
        }
        if let Some(max_keys) = self.max_keys.filter(|n| *n != 0) {
            query.push(("max-keys", max_keys.to_string()));
        }
        if let Some(delimiter) = self.delimiter {
            query.push(("delimiter", delimiter.to_owned()));
        }
        query
    }
}

/// Object store operations.
///
/// One implementation, [`Connection`], speaks HTTP; tests substitute stubs.
pub trait ObjectStore: Send + Sync + fmt::Debug {
    /// `PUT /bucket`.
    fn create_bucket(&self, bucket: &str) -> Result<Response, ClientError>;

    /// `DELETE /bucket`. The bucket must be empty.
    fn delete_bucket(&self, bucket: &str) -> Result<Response, ClientError>;

    /// `HEAD /bucket`: `false` only for a 404, `true` for any other status.
    fn bucket_exists(&self, bucket: &str) -> Result<bool, ClientError>;

    /// One page of a bucket listing.
    fn list_bucket(
        &self,
        bucket: &str,
        options: ListOptions<'_>,
    ) -> Result<ObjectListResponse, ClientError>;

    /// Upload an object.
    fn put(
        &self,
        bucket: &str,
        key: &str,
        metadata: &[(&str, &str)],
        content: RequestBody,
        headers: &[(&str, &str)],
    ) -> Result<Response, ClientError>;

    /// `HEAD` an object. Any failure, including a 404, yields `None`.
    fn get_metadata(&self, bucket: &str, key: &str) -> Option<ObjectMetadataResponse>;

    /// Download an object fully into memory.
    fn get_content(&self, bucket: &str, key: &str) -> Result<Bytes, ClientError>;

    /// Delete an object.
    fn delete(&self, bucket: &str, key: &str) -> Result<Response, ClientError>;

    /// Pre-authenticated GET URL valid for `expires_in`.
    fn direct_url(&self, bucket: &str, key: &str, expires_in: Duration) -> String;
}

/// HTTP [`ObjectStore`] with the signer chosen once at construction.
#[derive(Debug, Clone)]
pub struct Connection {
    config: ConnectionConfig,
    signer: RequestSigner,
    transport: Arc<dyn HttpTransport>,
}

impl Connection {
    /// Create a connection on the given transport.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MissingRegion`] when SigV4 is configured without a region.
    pub fn new(
        config: ConnectionConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ClientError> {
        let signer = RequestSigner::from_config(&config)?;
        info!(
            server = %config.server,
            port = config.port,
            secure = config.secure,
            calling_format = ?config.calling_format,
            auth_mode = ?config.auth_mode,
            "Created object store connection"
        );
        Ok(Self {
            config,
            signer,
            transport,
        })
    }

    /// Create a connection on a default [`ReqwestTransport`].
    pub fn with_reqwest(config: ConnectionConfig) -> Result<Self, ClientError> {
        Self::new(config, Arc::new(ReqwestTransport::new()))
    }

    /// The configuration this connection was built from.
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn send(&self, spec: RequestSpec<'_>) -> Result<http::Response<Bytes>, ClientError> {
        let request = self.signer.build(&self.config, spec, &Utc::now())?;
        self.transport.execute(request)
    }
}

impl ObjectStore for Connection {
    fn create_bucket(&self, bucket: &str) -> Result<Response, ClientError> {
        let mut spec = RequestSpec::new(Method::PUT, bucket, "");
        spec.headers = &[("content-length", "0")];
        let response = Response::from_http(self.send(spec)?)?;
        info!(bucket, "Created bucket");
        Ok(response)
    }

    fn delete_bucket(&self, bucket: &str) -> Result<Response, ClientError> {
        let response = Response::from_http(self.send(RequestSpec::new(Method::DELETE, bucket, ""))?)?;
        info!(bucket, "Deleted bucket");
        Ok(response)
    }

    fn bucket_exists(&self, bucket: &str) -> Result<bool, ClientError> {
        let response = self.send(RequestSpec::new(Method::HEAD, bucket, ""))?;
        let exists = response.status() != StatusCode::NOT_FOUND;
        debug!(bucket, status = %response.status(), exists, "Checked bucket");
        Ok(exists)
    }

    fn list_bucket(
        &self,
        bucket: &str,
        options: ListOptions<'_>,
    ) -> Result<ObjectListResponse, ClientError> {
        let mut spec = RequestSpec::new(Method::GET, bucket, "");
        spec.query = options.to_query();
        let response = ObjectListResponse::from_http(self.send(spec)?)?;
        debug!(
            bucket,
            prefix = options.prefix.unwrap_or(""),
            contents = response.result.contents.len(),
            common_prefixes = response.result.common_prefixes.len(),
            "Listed bucket"
        );
        Ok(response)
    }

    fn put(
        &self,
        bucket: &str,
        key: &str,
        metadata: &[(&str, &str)],
        content: RequestBody,
        headers: &[(&str, &str)],
    ) -> Result<Response, ClientError> {
        let length = content.len();
        let mut spec = RequestSpec::new(Method::PUT, bucket, key);
        spec.metadata = metadata;
        spec.headers = headers;
        spec.body = Some(content);
        let response = Response::from_http(self.send(spec)?)?;
        debug!(bucket, key, length, "Put object");
        Ok(response)
    }

    fn get_metadata(&self, bucket: &str, key: &str) -> Option<ObjectMetadataResponse> {
        let result = self
            .send(RequestSpec::new(Method::HEAD, bucket, key))
            .and_then(ObjectMetadataResponse::from_http);
        match result {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                debug!(bucket, key, error = %e, "Metadata lookup found nothing");
                None
            }
        }
    }

    fn get_content(&self, bucket: &str, key: &str) -> Result<Bytes, ClientError> {
        let response = Response::check(self.send(RequestSpec::new(Method::GET, bucket, key))?)?;
        let body = response.into_body();
        debug!(bucket, key, bytes = body.len(), "Got object content");
        Ok(body)
    }

    fn delete(&self, bucket: &str, key: &str) -> Result<Response, ClientError> {
        let response = Response::from_http(self.send(RequestSpec::new(Method::DELETE, bucket, key))?)?;
        debug!(bucket, key, "Deleted object");
        Ok(response)
    }

    fn direct_url(&self, bucket: &str, key: &str, expires_in: Duration) -> String {
        self.signer
            .direct_url(&self.config, bucket, key, expires_in, &Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::config::{AuthMode, CallingFormat};
    use crate::transport::HttpRequest;

    /// Records each request and replays canned responses in order.
    #[derive(Debug, Default)]
    struct StubTransport {
        requests: Mutex<Vec<(Method, String, Option<Bytes>)>>,
        responses: Mutex<Vec<(u16, &'static str)>>,
    }

    impl StubTransport {
        fn replying(responses: Vec<(u16, &'static str)>) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::default(),
                responses: Mutex::new(responses),
            })
        }
    }

    impl HttpTransport for StubTransport {
        fn execute(&self, request: HttpRequest) -> Result<http::Response<Bytes>, ClientError> {
            let body = request.body.map(RequestBody::into_bytes).transpose()?;
            self.requests
                .lock()
                .push((request.method, request.url, body));
            let (status, body) = {
                let mut responses = self.responses.lock();
                if responses.is_empty() {
                    return Err(ClientError::Transport("connection refused".to_owned()));
                }
                responses.remove(0)
            };
            Ok(http::Response::builder()
                .status(status)
                .body(Bytes::from_static(body.as_bytes()))
                .unwrap())
        }
    }

    fn connection(transport: Arc<StubTransport>) -> Connection {
        let config = ConnectionConfig::builder()
            .access_key_id("AKID")
            .secret_access_key("secret")
            .server("localhost")
            .port(9000)
            .secure(false)
            .build();
        Connection::new(config, transport).unwrap()
    }

    #[test]
    fn test_should_report_missing_bucket_only_for_404() {
        let transport = StubTransport::replying(vec![(404, ""), (403, ""), (200, ""), (500, "")]);
        let conn = connection(transport.clone());
        assert!(!conn.bucket_exists("b").unwrap());
        assert!(conn.bucket_exists("b").unwrap());
        assert!(conn.bucket_exists("b").unwrap());
        assert!(conn.bucket_exists("b").unwrap());
        assert!(transport.requests.lock().iter().all(|(m, _, _)| *m == Method::HEAD));
    }

    #[test]
    fn test_should_propagate_transport_failure_from_bucket_exists() {
        let conn = connection(StubTransport::replying(vec![]));
        assert!(matches!(conn.bucket_exists("b"), Err(ClientError::Transport(_))));
    }

    #[test]
    fn test_should_return_none_for_any_metadata_failure() {
        let conn = connection(StubTransport::replying(vec![(404, ""), (500, "boom")]));
        assert!(conn.get_metadata("b", "k").is_none());
        assert!(conn.get_metadata("b", "k").is_none());
        // Transport failure.
        assert!(conn.get_metadata("b", "k").is_none());
    }

    #[test]
    fn test_should_upload_body_to_encoded_key() {
        let transport = StubTransport::replying(vec![(200, "")]);
        let conn = connection(transport.clone());
        conn.put(
            "b",
            "store/my file.txt",
            &[],
            RequestBody::from_bytes(b"payload".to_vec()),
            &[("Content-Type", "text/plain")],
        )
        .unwrap();

        let requests = transport.requests.lock();
        let (method, url, body) = &requests[0];
        assert_eq!(*method, Method::PUT);
        assert_eq!(url, "http://localhost:9000/b/store/my%20file.txt");
        assert_eq!(body.as_deref(), Some(&b"payload"[..]));
    }

    #[test]
    fn test_should_list_with_query_parameters() {
        let transport = StubTransport::replying(vec![(
            200,
            "<ListBucketResult><Name>b</Name><IsTruncated>false</IsTruncated></ListBucketResult>",
        )]);
        let conn = connection(transport.clone());
        let list = conn
            .list_bucket(
                "b",
                ListOptions {
                    prefix: Some("store/"),
                    marker: Some(""),
                    max_keys: Some(1000),
                    delimiter: Some("/"),
                },
            )
            .unwrap();
        assert_eq!(list.result.name, "b");
        assert_eq!(
            transport.requests.lock()[0].1,
            "http://localhost:9000/b/?delimiter=%2F&marker&max-keys=1000&prefix=store%2F"
        );
    }

    #[test]
    fn test_should_surface_error_body_from_get_content() {
        let conn = connection(StubTransport::replying(vec![(
            404,
            "<Error><Code>NoSuchKey</Code></Error>",
        )]));
        let err = conn.get_content("b", "missing").unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("NoSuchKey"));
    }

    #[test]
    fn test_should_return_content_bytes() {
        let conn = connection(StubTransport::replying(vec![(200, "hello")]));
        assert_eq!(conn.get_content("b", "k").unwrap(), Bytes::from_static(b"hello"));
    }

    #[test]
    fn test_should_fail_fast_for_sigv4_without_region() {
        let config = ConnectionConfig::builder()
            .access_key_id("AKID")
            .secret_access_key("secret")
            .calling_format(CallingFormat::Subdomain)
            .auth_mode(AuthMode::SigV4)
            .build();
        let result = Connection::new(config, StubTransport::replying(vec![]));
        assert!(matches!(result, Err(ClientError::MissingRegion)));
    }

    #[test]
    fn test_should_create_and_delete_bucket() {
        let transport = StubTransport::replying(vec![(200, ""), (204, "")]);
        let conn = connection(transport.clone());
        conn.create_bucket("nb").unwrap();
        conn.delete_bucket("nb").unwrap();
        let requests = transport.requests.lock();
        assert_eq!(requests[0].0, Method::PUT);
        assert_eq!(requests[0].1, "http://localhost:9000/nb/");
        assert_eq!(requests[1].0, Method::DELETE);
    }
}
