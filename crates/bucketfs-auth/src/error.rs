//! Error types for request signing.

/// Errors that can occur while preparing a signer.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// SigV4 scopes every signature to a region, so one must be configured.
    #[error("a region must be configured to use AWS4-HMAC-SHA256 authorization")]
    MissingRegion,
}
