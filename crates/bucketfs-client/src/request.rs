//! Request assembly: URL, headers, body and authorization for one operation.
//!
//! Every operation funnels through [`RequestSigner::build`], which picks the
//! URL shape from the [`ConnectionConfig`], percent-encodes the key once (so the
//! signed path and the wire path are identical), moves `content-type`,
//! `content-length` and `host` into transport-level fields, prefixes metadata
//! headers and signs with the strategy chosen at construction.

use std::time::Duration;

use bucketfs_auth::presigned::presign_query;
use bucketfs_auth::sigv2::{self, ALTERNATIVE_DATE_HEADER};
use bucketfs_auth::sigv4::{self, RequestParts};
use bucketfs_auth::{
    EMPTY_PAYLOAD_SHA256, SigV2Signer, SigV4Signer, UNSIGNED_PAYLOAD, encode_object_key,
    encode_query_value,
};
use chrono::{DateTime, Utc};
use http::header::{AUTHORIZATION, HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use tracing::trace;

use crate::body::RequestBody;
use crate::config::{AuthMode, ConnectionConfig};
use crate::error::ClientError;
use crate::transport::HttpRequest;

/// Prefix put in front of every user metadata key.
pub const METADATA_PREFIX: &str = "x-amz-meta-";

/// A logical operation before it is turned into an HTTP request.
#[derive(Debug)]
pub struct RequestSpec<'a> {
    /// HTTP method.
    pub method: Method,
    /// Bucket name.
    pub bucket: &'a str,
    /// Raw object key; empty for bucket-level requests.
    pub key: &'a str,
    /// Raw query parameters.
    pub query: Vec<(&'a str, String)>,
    /// Caller headers.
    pub headers: &'a [(&'a str, &'a str)],
    /// User metadata, without the `x-amz-meta-` prefix.
    pub metadata: &'a [(&'a str, &'a str)],
    /// Content to upload.
    pub body: Option<RequestBody>,
}

impl<'a> RequestSpec<'a> {
    /// A request with no query, headers, metadata or body.
    #[must_use]
    pub fn new(method: Method, bucket: &'a str, key: &'a str) -> Self {
        Self {
            method,
            bucket,
            key,
            query: Vec::new(),
            headers: &[],
            metadata: &[],
            body: None,
        }
    }
}

/// Signing strategy, chosen once when a connection is created.
#[derive(Debug, Clone)]
pub enum RequestSigner {
    /// HMAC-SHA1, path-style resource.
    Legacy(SigV2Signer),
    /// AWS Signature Version 4.
    SigV4(SigV4Signer),
}

impl RequestSigner {
    /// Build the signer the configuration asks for.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MissingRegion`] when SigV4 is selected without a region.
    pub fn from_config(config: &ConnectionConfig) -> Result<Self, ClientError> {
        match config.auth_mode {
            AuthMode::Legacy => Ok(Self::Legacy(SigV2Signer::new(
                config.access_key_id.clone(),
                config.secret_access_key.clone(),
            ))),
            AuthMode::SigV4 => Ok(Self::SigV4(SigV4Signer::new(
                config.access_key_id.clone(),
                config.secret_access_key.clone(),
                config.region.clone().unwrap_or_default(),
                config.service.clone(),
            )?)),
        }
    }

    /// Assemble and sign an outbound request.
    pub fn build(
        &self,
        config: &ConnectionConfig,
        spec: RequestSpec<'_>,
        now: &DateTime<Utc>,
    ) -> Result<HttpRequest, ClientError> {
        match self {
            Self::Legacy(signer) => build_legacy(signer, config, spec, now),
            Self::SigV4(signer) => build_sigv4(signer, config, spec, now),
        }
    }

    /// Pre-authenticated GET URL for `key`, valid for `expires_in` from `now`.
    #[must_use]
    pub fn direct_url(
        &self,
        config: &ConnectionConfig,
        bucket: &str,
        key: &str,
        expires_in: Duration,
        now: &DateTime<Utc>,
    ) -> String {
        let encoded_key = encode_object_key(key);
        let base = format!("{}{encoded_key}", config.url_base(bucket));
        let query = match self {
            Self::Legacy(signer) => {
                let expires = now.timestamp()
                    + i64::try_from(expires_in.as_secs()).unwrap_or(i64::MAX / 2);
                signer.presigned_query(bucket, &encoded_key, expires)
            }
            Self::SigV4(signer) => presign_query(
                signer,
                "GET",
                &config.resource_path(bucket, &encoded_key),
                &config.host_header(bucket),
                &[],
                expires_in,
                now,
            ),
        };
        format!("{base}?{query}")
    }
}

/// Transport-level fields split out of the caller's headers.
#[derive(Debug, Default)]
struct SplitHeaders {
    headers: HeaderMap,
    host: Option<String>,
    content_type: Option<String>,
    content_length: Option<u64>,
}

impl SplitHeaders {
    fn push(&mut self, name: &str, value: &str) -> Result<(), ClientError> {
        if name.eq_ignore_ascii_case("content-type") {
            self.content_type = Some(value.to_owned());
        } else if name.eq_ignore_ascii_case("content-length") {
            let length = value
                .trim()
                .parse()
                .map_err(|_| ClientError::InvalidHeader(format!("content-length: {value}")))?;
            self.content_length = Some(length);
        } else if name.eq_ignore_ascii_case("host") {
            self.host = Some(value.to_owned());
        } else {
            self.headers.append(header_name(name)?, header_value(value)?);
        }
        Ok(())
    }
}

fn header_name(name: &str) -> Result<HeaderName, ClientError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|_| ClientError::InvalidHeader(name.to_owned()))
}

fn header_value(value: &str) -> Result<HeaderValue, ClientError> {
    HeaderValue::from_str(value).map_err(|_| ClientError::InvalidHeader(value.to_owned()))
}

/// Legacy wire query string: sorted, leading `?`, `=` omitted for empty values.
fn legacy_query_string(query: &[(&str, String)]) -> String {
    let mut params: Vec<&(&str, String)> = query.iter().collect();
    params.sort_by(|a, b| a.0.cmp(b.0));
    let mut out = String::new();
    for (name, value) in params {
        out.push(if out.is_empty() { '?' } else { '&' });
        out.push_str(name);
        if !value.is_empty() {
            out.push('=');
            out.push_str(&encode_query_value(value));
        }
    }
    out
}

fn build_legacy(
    signer: &SigV2Signer,
    config: &ConnectionConfig,
    spec: RequestSpec<'_>,
    now: &DateTime<Utc>,
) -> Result<HttpRequest, ClientError> {
    let encoded_key = encode_object_key(spec.key);
    let url = format!(
        "{}{encoded_key}{}",
        config.url_base(spec.bucket),
        legacy_query_string(&spec.query)
    );

    let mut split = SplitHeaders::default();
    for (name, value) in spec.headers {
        split.push(name, value)?;
    }
    for (name, value) in spec.metadata {
        split.headers.append(
            header_name(&format!("{METADATA_PREFIX}{name}"))?,
            header_value(value)?,
        );
    }
    if !split.headers.contains_key(ALTERNATIVE_DATE_HEADER) {
        split.headers.insert(
            HeaderName::from_static(ALTERNATIVE_DATE_HEADER),
            header_value(&sigv2::http_date(now))?,
        );
    }

    // content-type travels as a transport field but is still signed.
    let mut signed = split.headers.clone();
    if let Some(content_type) = &split.content_type {
        signed.insert(http::header::CONTENT_TYPE, header_value(content_type)?);
    }
    let query_names: Vec<(&str, &str)> = spec
        .query
        .iter()
        .map(|(name, value)| (*name, value.as_str()))
        .collect();
    let string_to_sign = sigv2::build_string_to_sign(
        spec.method.as_str(),
        spec.bucket,
        &encoded_key,
        &query_names,
        &signed,
        None,
    );
    trace!(string_to_sign, "Built SigV2 string to sign");
    split
        .headers
        .insert(AUTHORIZATION, header_value(&signer.authorization(&string_to_sign))?);

    let content_length = spec.body.as_ref().map(RequestBody::len).or(split.content_length);
    Ok(HttpRequest {
        method: spec.method,
        url,
        headers: split.headers,
        host: split.host,
        content_type: split.content_type,
        content_length,
        body: spec.body,
    })
}

fn build_sigv4(
    signer: &SigV4Signer,
    config: &ConnectionConfig,
    mut spec: RequestSpec<'_>,
    now: &DateTime<Utc>,
) -> Result<HttpRequest, ClientError> {
    let encoded_key = encode_object_key(spec.key);
    let path = config.resource_path(spec.bucket, &encoded_key);

    let mut signed: Vec<(String, String)> = spec
        .headers
        .iter()
        .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
        .collect();

    let payload_hash = if spec.method == Method::DELETE {
        UNSIGNED_PAYLOAD.to_owned()
    } else {
        match spec.body.as_mut() {
            Some(body) if !body.is_empty() => {
                let hash = body.sha256_hex()?;
                signed.push(("content-length".to_owned(), body.len().to_string()));
                hash
            }
            _ => EMPTY_PAYLOAD_SHA256.to_owned(),
        }
    };
    signed.push(("x-amz-content-sha256".to_owned(), payload_hash.clone()));
    for (name, value) in spec.metadata {
        signed.push((format!("{METADATA_PREFIX}{name}"), (*value).to_owned()));
    }
    signed.push(("host".to_owned(), config.host_header(spec.bucket)));
    signed.push(("x-amz-date".to_owned(), sigv4::format_timestamp(now)));

    let query: Vec<(&str, &str)> = spec
        .query
        .iter()
        .map(|(name, value)| (*name, value.as_str()))
        .collect();
    let header_pairs: Vec<(&str, &str)> = signed
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();
    let parts = RequestParts {
        method: spec.method.as_str(),
        uri: &path,
        query: &query,
        headers: &header_pairs,
        payload_hash: &payload_hash,
    };
    let authorization = signer.authorization(&parts, now);

    let canonical_query = bucketfs_auth::canonical::build_canonical_query_string(&query);
    let mut url = format!("{}{encoded_key}", config.url_base(spec.bucket));
    if !canonical_query.is_empty() {
        url.push('?');
        url.push_str(&canonical_query);
    }

    let mut split = SplitHeaders::default();
    for (name, value) in &header_pairs {
        split.push(name, value)?;
    }
    split
        .headers
        .insert(AUTHORIZATION, header_value(&authorization)?);

    let content_length = spec.body.as_ref().map(RequestBody::len).or(split.content_length);
    Ok(HttpRequest {
        method: spec.method,
        url,
        headers: split.headers,
        host: split.host,
        content_type: split.content_type,
        content_length,
        body: spec.body,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::config::CallingFormat;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn legacy_config() -> ConnectionConfig {
        ConnectionConfig::builder()
            .access_key_id("AKID")
            .secret_access_key("secret")
            .build()
    }

    fn sigv4_config() -> ConnectionConfig {
        ConnectionConfig::builder()
            .access_key_id("AKID")
            .secret_access_key("secret")
            .region("us-east-1")
            .calling_format(CallingFormat::Subdomain)
            .auth_mode(AuthMode::SigV4)
            .build()
    }

    fn header<'a>(request: &'a HttpRequest, name: &str) -> Option<&'a str> {
        request.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[test]
    fn test_should_fail_sigv4_without_region() {
        let config = ConnectionConfig::builder()
            .access_key_id("AKID")
            .secret_access_key("secret")
            .auth_mode(AuthMode::SigV4)
            .build();
        assert!(matches!(
            RequestSigner::from_config(&config),
            Err(ClientError::MissingRegion)
        ));
    }

    #[test]
    fn test_should_build_legacy_list_request() {
        let config = legacy_config();
        let signer = RequestSigner::from_config(&config).unwrap();
        let mut spec = RequestSpec::new(Method::GET, "bucket", "");
        spec.query = vec![
            ("prefix", "store/a b/".to_owned()),
            ("marker", String::new()),
            ("delimiter", "/".to_owned()),
        ];

        let request = signer.build(&config, spec, &now()).unwrap();

        assert_eq!(
            request.url,
            "https://s3.amazonaws.com:443/bucket/?delimiter=%2F&marker&prefix=store%2Fa%20b%2F"
        );
        assert_eq!(
            header(&request, "x-amz-date"),
            Some("Fri, 01 Mar 2024 12:00:00 GMT")
        );
        assert!(header(&request, "authorization").unwrap().starts_with("AWS AKID:"));
    }

    #[test]
    fn test_should_sign_legacy_put_with_content_type_and_metadata() {
        let config = legacy_config();
        let signer = RequestSigner::from_config(&config).unwrap();
        let mut spec = RequestSpec::new(Method::PUT, "bucket", "store/a b.txt");
        spec.headers = &[("Content-Type", "text/plain")];
        spec.metadata = &[("owner", "me")];
        spec.body = Some(RequestBody::from_bytes(b"hi".to_vec()));

        let request = signer.build(&config, spec, &now()).unwrap();

        assert_eq!(request.url, "https://s3.amazonaws.com:443/bucket/store/a%20b.txt");
        assert_eq!(request.content_type.as_deref(), Some("text/plain"));
        assert_eq!(request.content_length, Some(2));
        assert_eq!(header(&request, "x-amz-meta-owner"), Some("me"));
        assert!(header(&request, "content-type").is_none());

        let string_to_sign = "PUT\n\ntext/plain\n\n\
                              x-amz-date:Fri, 01 Mar 2024 12:00:00 GMT\n\
                              x-amz-meta-owner:me\n\
                              /bucket/store/a%20b.txt";
        let expected = SigV2Signer::new("AKID", "secret").authorization(string_to_sign);
        assert_eq!(header(&request, "authorization"), Some(expected.as_str()));
    }

    #[test]
    fn test_should_build_sigv4_put_request() {
        let config = sigv4_config();
        let signer = RequestSigner::from_config(&config).unwrap();
        let mut spec = RequestSpec::new(Method::PUT, "bucket", "store/x.txt");
        spec.headers = &[("Content-Type", "text/plain")];
        spec.body = Some(RequestBody::from_bytes(b"abc".to_vec()));

        let request = signer.build(&config, spec, &now()).unwrap();

        assert_eq!(request.url, "https://bucket.s3.amazonaws.com:443/store/x.txt");
        assert_eq!(request.host.as_deref(), Some("bucket.s3.amazonaws.com"));
        assert_eq!(request.content_length, Some(3));
        assert_eq!(
            header(&request, "x-amz-content-sha256"),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
        assert_eq!(header(&request, "x-amz-date"), Some("20240301T120000Z"));
        let authorization = header(&request, "authorization").unwrap();
        assert!(authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKID/20240301/us-east-1/s3/aws4_request, \
             SignedHeaders=content-length;content-type;host;x-amz-content-sha256;x-amz-date, \
             Signature="
        ));
    }

    #[test]
    fn test_should_use_unsigned_payload_for_sigv4_delete() {
        let config = sigv4_config();
        let signer = RequestSigner::from_config(&config).unwrap();
        let request = signer
            .build(&config, RequestSpec::new(Method::DELETE, "bucket", "k"), &now())
            .unwrap();
        assert_eq!(header(&request, "x-amz-content-sha256"), Some(UNSIGNED_PAYLOAD));
    }

    #[test]
    fn test_should_use_empty_hash_for_sigv4_get() {
        let config = sigv4_config();
        let signer = RequestSigner::from_config(&config).unwrap();
        let mut spec = RequestSpec::new(Method::GET, "bucket", "");
        spec.query = vec![("prefix", "a/".to_owned()), ("delimiter", "/".to_owned())];
        let request = signer.build(&config, spec, &now()).unwrap();
        assert_eq!(
            header(&request, "x-amz-content-sha256"),
            Some(EMPTY_PAYLOAD_SHA256)
        );
        assert_eq!(
            request.url,
            "https://bucket.s3.amazonaws.com:443/?delimiter=%2F&prefix=a%2F"
        );
    }

    #[test]
    fn test_should_build_legacy_direct_url() {
        let config = legacy_config();
        let signer = RequestSigner::from_config(&config).unwrap();
        let url = signer.direct_url(&config, "bucket", "a b.txt", Duration::from_secs(60), &now());
        let expires = now().timestamp() + 60;
        assert!(url.starts_with(&format!(
            "https://s3.amazonaws.com:443/bucket/a%20b.txt?AWSAccessKeyId=AKID&Expires={expires}&Signature="
        )));
    }

    #[test]
    fn test_should_build_sigv4_direct_url() {
        let config = sigv4_config();
        let signer = RequestSigner::from_config(&config).unwrap();
        let url = signer.direct_url(&config, "bucket", "k.txt", Duration::from_secs(10_800), &now());
        assert!(url.starts_with("https://bucket.s3.amazonaws.com:443/k.txt?X-Amz-Algorithm=AWS4-HMAC-SHA256&"));
        assert!(url.contains("&X-Amz-Expires=10800&"));
        assert!(url.contains("&X-Amz-SignedHeaders=host&X-Amz-Signature="));
    }

    #[test]
    fn test_should_omit_equals_for_empty_legacy_query_values() {
        let query = vec![("acl", String::new()), ("max-keys", "5".to_owned())];
        assert_eq!(legacy_query_string(&query), "?acl&max-keys=5");
        assert_eq!(legacy_query_string(&[]), "");
    }
}
