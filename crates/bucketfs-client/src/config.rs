//! Endpoint and credential configuration for a connection.

use std::fmt;

use typed_builder::TypedBuilder;

/// Default S3 endpoint host.
pub const DEFAULT_HOST: &str = "s3.amazonaws.com";

/// Port used for HTTPS unless overridden.
pub const SECURE_PORT: u16 = 443;

/// Port used for plain HTTP unless overridden.
pub const INSECURE_PORT: u16 = 80;

/// URL shape used to address a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallingFormat {
    /// Path style: `scheme://server:port/bucket/key`.
    #[default]
    Regular,
    /// Virtual-hosted style: `scheme://bucket.server:port/key`.
    Subdomain,
    /// A custom domain that resolves to the bucket: `scheme://domain:port/key`.
    Vanity,
}

/// Authorization protocol used to sign requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// HMAC-SHA1 `Authorization: AWS id:sig`.
    #[default]
    Legacy,
    /// AWS Signature Version 4.
    SigV4,
}

impl AuthMode {
    /// Setting value that selects SigV4.
    pub const SIGV4_SETTING: &'static str = "AWS4-HMAC-SHA256";

    /// Interpret an `authorization` setting: `AWS4-HMAC-SHA256` selects SigV4,
    /// anything else (including no setting) the legacy signer.
    #[must_use]
    pub fn from_setting(setting: Option<&str>) -> Self {
        match setting {
            Some(Self::SIGV4_SETTING) => Self::SigV4,
            _ => Self::Legacy,
        }
    }
}

/// Immutable endpoint and credentials handed to a [`Connection`](crate::Connection).
///
/// # Examples
///
/// ```
/// use bucketfs_client::config::{CallingFormat, ConnectionConfig};
///
/// let config = ConnectionConfig::builder()
///     .access_key_id("AKID")
///     .secret_access_key("secret")
///     .server("localhost")
///     .port(9000)
///     .secure(false)
///     .build();
/// assert_eq!(config.calling_format, CallingFormat::Regular);
/// assert_eq!(config.url_base("bucket"), "http://localhost:9000/bucket/");
/// assert_eq!(config.host_header("bucket"), "localhost:9000");
/// ```
#[derive(Clone, TypedBuilder)]
pub struct ConnectionConfig {
    /// Access key ID.
    #[builder(setter(into))]
    pub access_key_id: String,

    /// Secret access key.
    #[builder(setter(into))]
    pub secret_access_key: String,

    /// Use HTTPS.
    #[builder(default = true)]
    pub secure: bool,

    /// Endpoint host, or the vanity domain for [`CallingFormat::Vanity`].
    #[builder(default = String::from(DEFAULT_HOST), setter(into))]
    pub server: String,

    /// Endpoint port.
    #[builder(default = SECURE_PORT)]
    pub port: u16,

    /// URL shape.
    #[builder(default)]
    pub calling_format: CallingFormat,

    /// Signing region; required for SigV4.
    #[builder(default, setter(strip_option, into))]
    pub region: Option<String>,

    /// Signing service name.
    #[builder(default = String::from("s3"), setter(into))]
    pub service: String,

    /// Signing protocol.
    #[builder(default)]
    pub auth_mode: AuthMode,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("access_key_id", &self.access_key_id)
            .field("secure", &self.secure)
            .field("server", &self.server)
            .field("port", &self.port)
            .field("calling_format", &self.calling_format)
            .field("region", &self.region)
            .field("service", &self.service)
            .field("auth_mode", &self.auth_mode)
            .finish_non_exhaustive()
    }
}

impl ConnectionConfig {
    /// `http` or `https`.
    #[must_use]
    pub fn scheme(&self) -> &'static str {
        if self.secure { "https" } else { "http" }
    }

    /// Whether `port` is the scheme's default.
    #[must_use]
    pub fn is_default_port(&self) -> bool {
        self.port == if self.secure { SECURE_PORT } else { INSECURE_PORT }
    }

    /// Host name the request is sent to for `bucket`.
    #[must_use]
    pub fn host_name(&self, bucket: &str) -> String {
        match self.calling_format {
            CallingFormat::Subdomain if !bucket.is_empty() => format!("{bucket}.{}", self.server),
            _ => self.server.clone(),
        }
    }

    /// Value of the `Host` header: the host name, plus the port when it is not
    /// the scheme's default.
    #[must_use]
    pub fn host_header(&self, bucket: &str) -> String {
        let host = self.host_name(bucket);
        if self.is_default_port() {
            host
        } else {
            format!("{host}:{}", self.port)
        }
    }

    /// URL prefix an encoded key is appended to. Always ends with `/`.
    #[must_use]
    pub fn url_base(&self, bucket: &str) -> String {
        format!(
            "{}://{}:{}{}",
            self.scheme(),
            self.host_name(bucket),
            self.port,
            self.path_prefix(bucket)
        )
    }

    /// Absolute request path for an already-encoded key.
    #[must_use]
    pub fn resource_path(&self, bucket: &str, encoded_key: &str) -> String {
        format!("{}{encoded_key}", self.path_prefix(bucket))
    }

    fn path_prefix(&self, bucket: &str) -> String {
        match self.calling_format {
            CallingFormat::Regular if !bucket.is_empty() => format!("/{bucket}/"),
            _ => "/".to_owned(),
        }
    }
}
