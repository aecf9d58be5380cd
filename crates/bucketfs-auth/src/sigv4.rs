//! AWS Signature Version 4 signing.
//!
//! Signing a request follows the standard SigV4 flow:
//!
//! 1. Build the canonical request from the method, path, query and headers.
//! 2. Build the string to sign from the timestamp, credential scope and the
//!    canonical request hash.
//! 3. Derive the signing key from the secret key and the credential scope.
//! 4. HMAC the string to sign and hex-encode the result.
//!
//! The main entry point is [`SigV4Signer::authorization`].

use std::fmt;

use chrono::{DateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use sha2::{Digest, Sha256};
use tracing::trace;

use crate::canonical::{build_canonical_request, build_signed_headers_string};
use crate::error::AuthError;

/// The only algorithm this signer produces.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Payload hash used when the body is not signed (DELETE requests, presigned URLs).
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// SHA-256 of the empty payload.
pub const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Terminal component of every credential scope.
const SCOPE_TERMINATOR: &str = "aws4_request";

type HmacSha256 = Hmac<Sha256>;

/// The parts of an outgoing request that take part in a SigV4 signature.
///
/// Every header listed is signed; the caller decides which ones to include.
#[derive(Debug, Clone, Copy)]
pub struct RequestParts<'a> {
    /// HTTP method, e.g. `GET`.
    pub method: &'a str,
    /// Request path, already percent-encoded or raw; it is canonicalized either way.
    pub uri: &'a str,
    /// Raw (unencoded) query parameters.
    pub query: &'a [(&'a str, &'a str)],
    /// Header name-value pairs to sign.
    pub headers: &'a [(&'a str, &'a str)],
    /// Hex SHA-256 of the body, or [`UNSIGNED_PAYLOAD`].
    pub payload_hash: &'a str,
}

/// Signs requests with AWS4-HMAC-SHA256 for a fixed region and service.
#[derive(Clone)]
pub struct SigV4Signer {
    access_key_id: String,
    secret_access_key: String,
    region: String,
    service: String,
}

impl fmt::Debug for SigV4Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigV4Signer")
            .field("access_key_id", &self.access_key_id)
            .field("region", &self.region)
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

impl SigV4Signer {
    /// Create a signer.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingRegion`] if `region` is empty.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
        service: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let region = region.into();
        if region.is_empty() {
            return Err(AuthError::MissingRegion);
        }
        Ok(Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region,
            service: service.into(),
        })
    }

    /// The access key ID placed in the credential.
    #[must_use]
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// The region every signature is scoped to.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// The service every signature is scoped to.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Credential scope for the given `YYYYMMDD` date: `date/region/service/aws4_request`.
    #[must_use]
    pub fn credential_scope(&self, date: &str) -> String {
        format!(
            "{date}/{}/{}/{SCOPE_TERMINATOR}",
            self.region, self.service
        )
    }

    /// Full credential value: `AKID/date/region/service/aws4_request`.
    #[must_use]
    pub fn credential(&self, timestamp: &DateTime<Utc>) -> String {
        format!(
            "{}/{}",
            self.access_key_id,
            self.credential_scope(&format_date(timestamp))
        )
    }

    /// Compute the hex signature for a request at the given instant.
    #[must_use]
    pub fn signature(&self, parts: &RequestParts<'_>, timestamp: &DateTime<Utc>) -> String {
        let canonical_request = build_canonical_request(
            parts.method,
            parts.uri,
            parts.query,
            parts.headers,
            parts.payload_hash,
        );
        trace!(canonical_request, "Built SigV4 canonical request");

        let date = format_date(timestamp);
        let canonical_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
        let string_to_sign = build_string_to_sign(
            &format_timestamp(timestamp),
            &self.credential_scope(&date),
            &canonical_hash,
        );

        let signing_key =
            derive_signing_key(&self.secret_access_key, &date, &self.region, &self.service);
        compute_signature(&signing_key, &string_to_sign)
    }

    /// Sign a request and return the `Authorization` header value.
    ///
    /// The caller is expected to have put `x-amz-date` (formatted with
    /// [`format_timestamp`] from the same `timestamp`) among the signed headers.
    #[must_use]
    pub fn authorization(&self, parts: &RequestParts<'_>, timestamp: &DateTime<Utc>) -> String {
        let signature = self.signature(parts, timestamp);
        let signed_headers = build_signed_headers_string(parts.headers.iter().map(|(n, _)| *n));
        format!(
            "{ALGORITHM} Credential={}, SignedHeaders={signed_headers}, Signature={signature}",
            self.credential(timestamp)
        )
    }
}

/// ISO 8601 basic timestamp used in `x-amz-date` and `X-Amz-Date`: `YYYYMMDDTHHMMSSZ`.
#[must_use]
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Date component of the credential scope: `YYYYMMDD`.
#[must_use]
pub fn format_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y%m%d").to_string()
}

/// Build the SigV4 string to sign.
///
/// ```text
/// AWS4-HMAC-SHA256\n
/// <timestamp>\n
/// <credential_scope>\n
/// <hex(SHA256(canonical_request))>
/// ```
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// Derive the SigV4 signing key using HMAC-SHA256 chain.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes());
    hmac_sha256(&date_region_service_key, SCOPE_TERMINATOR.as_bytes())
}

/// Compute the HMAC-SHA256 signature of `data` and hex-encode it.
#[must_use]
pub fn compute_signature(signing_key: &[u8], data: &str) -> String {
    hex::encode(hmac_sha256(signing_key, data.as_bytes()))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Compute the SHA-256 hash of the given payload and return it as a hex string.
///
/// # Examples
///
/// ```
/// use bucketfs_auth::sigv4::hash_payload;
///
/// assert_eq!(
///     hash_payload(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}
