//! Blocking client for S3-compatible object storage.
//!
//! A [`Connection`] turns object store operations (put, get, head, list,
//! delete, bucket create/delete, pre-signed download URLs) into signed HTTP
//! requests and typed responses. The signing protocol, legacy HMAC-SHA1 or
//! SigV4, is picked once from [`ConnectionConfig::auth_mode`].
//!
//! ```text
//! ObjectStore (trait) ── Connection ── RequestSigner ── bucketfs-auth
//!                             │
//!                             └── HttpTransport (trait) ── ReqwestTransport
//! ```
//!
//! # Modules
//!
//! - [`body`] - Seekable request bodies streamed in 64 KiB chunks
//! - [`config`] - Endpoint, calling format and auth mode
//! - [`connection`] - The [`ObjectStore`] trait and its HTTP implementation
//! - [`error`] - Client error types
//! - [`request`] - URL, header and signature assembly
//! - [`response`] - Typed views over responses
//! - [`transport`] - HTTP transport port and the `reqwest` implementation

pub mod body;
pub mod config;
pub mod connection;
pub mod error;
pub mod request;
pub mod response;
pub mod transport;

pub use body::{ContentStream, RequestBody};
pub use config::{AuthMode, CallingFormat, ConnectionConfig};
pub use connection::{Connection, ListOptions, ObjectStore};
pub use error::ClientError;
pub use response::{MetadataMap, ObjectListResponse, ObjectMetadataResponse, Response};
pub use transport::{HttpRequest, HttpTransport, ReqwestTransport};
