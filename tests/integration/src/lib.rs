//! Integration tests for bucketfs against a live S3-compatible endpoint.
//!
//! These tests require a server at `BUCKETFS_ENDPOINT` (default
//! `http://localhost:4566`) that accepts the `test`/`test` credentials.
//! They are marked `#[ignore]` so they don't run during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! cargo test -p bucketfs-integration -- --ignored
//! ```

use std::sync::{Arc, Once};

use bucketfs_client::{AuthMode, CallingFormat, Connection, ConnectionConfig, ObjectStore};
use bucketfs_core::{FileStorageProvider, InMemoryCacheStore, StorageConfig};

static INIT: Once = Once::new();

/// Region used for SigV4 signing.
pub const REGION: &str = "us-east-1";

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Endpoint URL for the server.
fn endpoint_url() -> reqwest::Url {
    let raw = std::env::var("BUCKETFS_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4566".to_owned());
    reqwest::Url::parse(&raw).expect("BUCKETFS_ENDPOINT must be a URL")
}

/// Storage settings pointing at the test server, path-style.
#[must_use]
pub fn storage_config(bucket: &str, auth_mode: AuthMode) -> StorageConfig {
    let url = endpoint_url();
    StorageConfig::builder()
        .access_key_id("test".into())
        .secret_access_key("test".into())
        .bucket(bucket.to_owned())
        .secure(url.scheme() == "https")
        .host(url.host_str().unwrap_or("localhost").to_owned())
        .port(url.port_or_known_default())
        .region(Some(REGION.into()))
        .authorization(match auth_mode {
            AuthMode::SigV4 => Some(AuthMode::SIGV4_SETTING.into()),
            AuthMode::Legacy => None,
        })
        .force_path_style(true)
        .build()
}

/// Connection settings pointing at the test server, path-style.
#[must_use]
pub fn connection_config(auth_mode: AuthMode) -> ConnectionConfig {
    let config = storage_config("unused", auth_mode).to_connection_config();
    assert_eq!(config.calling_format, CallingFormat::Regular);
    config
}

/// Create a connection to the test server.
#[must_use]
pub fn connection(auth_mode: AuthMode) -> Connection {
    init_tracing();
    Connection::with_reqwest(connection_config(auth_mode)).expect("create connection")
}

/// Generate a unique bucket name for a test.
#[must_use]
pub fn test_bucket_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// Create a uniquely named bucket.
#[must_use]
pub fn create_test_bucket(conn: &Connection, prefix: &str) -> String {
    let bucket = test_bucket_name(prefix);
    conn.create_bucket(&bucket).expect("create bucket");
    bucket
}

/// Delete every object in `bucket`, then the bucket itself.
pub fn cleanup_bucket(conn: &Connection, bucket: &str) {
    let listing = conn
        .list_bucket(bucket, bucketfs_client::ListOptions::default())
        .expect("list for cleanup");
    for entry in &listing.result.contents {
        let _ = conn.delete(bucket, &entry.key);
    }
    let _ = conn.delete_bucket(bucket);
}

/// A provider for a fresh bucket and store key, initialized against the
/// test server.
#[must_use]
pub fn test_provider(prefix: &str, auth_mode: AuthMode) -> (FileStorageProvider, String) {
    init_tracing();
    let bucket = test_bucket_name(prefix);
    let store_key = format!("store-{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let provider = FileStorageProvider::connect(
        store_key,
        &storage_config(&bucket, auth_mode),
        Arc::new(InMemoryCacheStore::new()),
    )
    .expect("create provider");
    provider.initialize();
    (provider, bucket)
}

mod test_connection;
mod test_provider;
