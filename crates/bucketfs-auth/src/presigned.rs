//! Presigned URL construction for AWS Signature Version 4.
//!
//! Presigned URLs carry authentication information in query parameters rather
//! than HTTP headers:
//!
//! - `X-Amz-Algorithm` - Always `AWS4-HMAC-SHA256`
//! - `X-Amz-Credential` - `AKID/date/region/service/aws4_request`
//! - `X-Amz-Date` - ISO 8601 basic format timestamp (`YYYYMMDDTHHMMSSZ`)
//! - `X-Amz-Expires` - Validity duration in seconds
//! - `X-Amz-SignedHeaders` - Only `host`
//! - `X-Amz-Signature` - The hex-encoded signature, always last
//!
//! For presigned URLs, the payload hash is always `UNSIGNED-PAYLOAD`.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::canonical::build_canonical_query_string;
use crate::sigv4::{ALGORITHM, RequestParts, SigV4Signer, UNSIGNED_PAYLOAD, format_timestamp};

/// Build the query string of a SigV4 presigned URL, without the leading `?`.
///
/// `extra_query` holds any request-specific parameters; they are signed along
/// with the `X-Amz-*` ones. Parameters appear in canonical (sorted) order with
/// `X-Amz-Signature` appended last.
#[must_use]
pub fn presign_query(
    signer: &SigV4Signer,
    method: &str,
    uri: &str,
    host: &str,
    extra_query: &[(&str, &str)],
    expires_in: Duration,
    timestamp: &DateTime<Utc>,
) -> String {
    let credential = signer.credential(timestamp);
    let amz_date = format_timestamp(timestamp);
    let expires = expires_in.as_secs().to_string();

    let mut query: Vec<(&str, &str)> = extra_query.to_vec();
    query.extend([
        ("X-Amz-Algorithm", ALGORITHM),
        ("X-Amz-Credential", credential.as_str()),
        ("X-Amz-Date", amz_date.as_str()),
        ("X-Amz-Expires", expires.as_str()),
        ("X-Amz-SignedHeaders", "host"),
    ]);

    let headers = [("host", host)];
    let parts = RequestParts {
        method,
        uri,
        query: &query,
        headers: &headers,
        payload_hash: UNSIGNED_PAYLOAD,
    };
    let signature = signer.signature(&parts, timestamp);

    format!(
        "{}&X-Amz-Signature={signature}",
        build_canonical_query_string(&query)
    )
}
