//! File store configuration.
//!
//! Provides [`StorageConfig`], the settings of one bucket-backed file store,
//! and the derivation of the connection endpoint from them.

use std::fmt;
use std::time::Duration;

use bucketfs_client::config::{DEFAULT_HOST, INSECURE_PORT, SECURE_PORT};
use bucketfs_client::{AuthMode, CallingFormat, ConnectionConfig};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Default download URL lifetime: three hours.
pub const DEFAULT_DOWNLOAD_URL_EXPIRY_SECS: u64 = 3 * 60 * 60;

/// Default listing page size.
pub const DEFAULT_LIST_PAGE_SIZE: u32 = 1000;

/// Settings of one file store.
///
/// # Examples
///
/// ```
/// use bucketfs_core::config::StorageConfig;
/// use bucketfs_client::CallingFormat;
///
/// let config = StorageConfig::builder()
///     .access_key_id("AKID".into())
///     .secret_access_key("secret".into())
///     .bucket("media".into())
///     .region(Some("eu-west-1".into()))
///     .build();
/// let conn = config.to_connection_config();
/// assert_eq!(conn.server, "s3-eu-west-1.amazonaws.com");
/// assert_eq!(conn.calling_format, CallingFormat::Regular);
/// ```
#[derive(Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    /// Access key ID.
    #[builder(default)]
    pub access_key_id: String,

    /// Secret access key. Never serialized.
    #[builder(default)]
    #[serde(skip_serializing)]
    pub secret_access_key: String,

    /// Bucket holding the files.
    #[builder(default)]
    pub bucket: String,

    /// Use HTTPS.
    #[builder(default = true)]
    pub secure: bool,

    /// Vanity domain that resolves to the bucket.
    #[builder(default)]
    pub domain: Option<String>,

    /// Region; selects `s3-{region}.amazonaws.com` and is required for SigV4.
    #[builder(default)]
    pub region: Option<String>,

    /// Authorization mode; `"AWS4-HMAC-SHA256"` selects SigV4.
    #[builder(default)]
    pub authorization: Option<String>,

    /// Endpoint host.
    #[builder(default = String::from(DEFAULT_HOST))]
    pub host: String,

    /// Endpoint port; 443 or 80 by `secure` when unset.
    #[builder(default)]
    pub port: Option<u16>,

    /// Address buckets by path even when signing with SigV4.
    #[builder(default = false)]
    pub force_path_style: bool,

    /// Local directory separator.
    #[builder(default = '/')]
    pub directory_separator: char,

    /// Keys requested per listing page.
    #[builder(default = DEFAULT_LIST_PAGE_SIZE)]
    pub list_page_size: u32,

    /// Lifetime of download URLs in seconds.
    #[builder(default = DEFAULT_DOWNLOAD_URL_EXPIRY_SECS)]
    pub download_url_expiry_secs: u64,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            access_key_id: String::new(),
            secret_access_key: String::new(),
            bucket: String::new(),
            secure: true,
            domain: None,
            region: None,
            authorization: None,
            host: String::from(DEFAULT_HOST),
            port: None,
            force_path_style: false,
            directory_separator: '/',
            list_page_size: DEFAULT_LIST_PAGE_SIZE,
            download_url_expiry_secs: DEFAULT_DOWNLOAD_URL_EXPIRY_SECS,
            log_level: String::from("info"),
        }
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("access_key_id", &self.access_key_id)
            .field("bucket", &self.bucket)
            .field("secure", &self.secure)
            .field("domain", &self.domain)
            .field("region", &self.region)
            .field("authorization", &self.authorization)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("force_path_style", &self.force_path_style)
            .field("directory_separator", &self.directory_separator)
            .field("list_page_size", &self.list_page_size)
            .field("download_url_expiry_secs", &self.download_url_expiry_secs)
            .field("log_level", &self.log_level)
            .finish_non_exhaustive()
    }
}

impl StorageConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `BUCKETFS_ACCESS_KEY_ID` (or `AWS_ACCESS_KEY_ID`) | `""` |
    /// | `BUCKETFS_SECRET_ACCESS_KEY` (or `AWS_SECRET_ACCESS_KEY`) | `""` |
    /// | `BUCKETFS_BUCKET` | `""` |
    /// | `BUCKETFS_SECURE` | `true` |
    /// | `BUCKETFS_DOMAIN` | unset |
    /// | `BUCKETFS_REGION` | unset |
    /// | `BUCKETFS_AUTHORIZATION` | unset |
    /// | `BUCKETFS_HOST` | `s3.amazonaws.com` |
    /// | `BUCKETFS_PORT` | unset |
    /// | `BUCKETFS_FORCE_PATH_STYLE` | `false` |
    /// | `BUCKETFS_DIRECTORY_SEPARATOR` | `/` |
    /// | `BUCKETFS_LIST_PAGE_SIZE` | `1000` |
    /// | `BUCKETFS_DOWNLOAD_URL_EXPIRY_SECS` | `10800` |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// # Examples
    ///
    /// ```
    /// use bucketfs_core::config::StorageConfig;
    ///
    /// let config = StorageConfig::from_env();
    /// assert!(!config.log_level.is_empty());
    /// ```
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from any variable source.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("BUCKETFS_ACCESS_KEY_ID").or_else(|| lookup("AWS_ACCESS_KEY_ID")) {
            config.access_key_id = v;
        }
        if let Some(v) =
            lookup("BUCKETFS_SECRET_ACCESS_KEY").or_else(|| lookup("AWS_SECRET_ACCESS_KEY"))
        {
            config.secret_access_key = v;
        }
        if let Some(v) = lookup("BUCKETFS_BUCKET") {
            config.bucket = v;
        }
        if let Some(v) = lookup("BUCKETFS_SECURE") {
            config.secure = parse_bool(&v);
        }
        if let Some(v) = lookup("BUCKETFS_DOMAIN") {
            config.domain = non_empty(v);
        }
        if let Some(v) = lookup("BUCKETFS_REGION") {
            config.region = non_empty(v);
        }
        if let Some(v) = lookup("BUCKETFS_AUTHORIZATION") {
            config.authorization = non_empty(v);
        }
        if let Some(v) = lookup("BUCKETFS_HOST") {
            config.host = v;
        }
        if let Some(v) = lookup("BUCKETFS_PORT") {
            if let Ok(n) = v.parse::<u16>() {
                config.port = Some(n);
            }
        }
        if let Some(v) = lookup("BUCKETFS_FORCE_PATH_STYLE") {
            config.force_path_style = parse_bool(&v);
        }
        if let Some(v) = lookup("BUCKETFS_DIRECTORY_SEPARATOR") {
            if let Some(c) = v.chars().next() {
                config.directory_separator = c;
            }
        }
        if let Some(v) = lookup("BUCKETFS_LIST_PAGE_SIZE") {
            if let Ok(n) = v.parse::<u32>() {
                config.list_page_size = n;
            }
        }
        if let Some(v) = lookup("BUCKETFS_DOWNLOAD_URL_EXPIRY_SECS") {
            if let Ok(n) = v.parse::<u64>() {
                config.download_url_expiry_secs = n;
            }
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// Signing protocol selected by `authorization`.
    #[must_use]
    pub fn auth_mode(&self) -> AuthMode {
        AuthMode::from_setting(self.authorization.as_deref())
    }

    /// Lifetime of download URLs.
    #[must_use]
    pub fn download_url_expiry(&self) -> Duration {
        Duration::from_secs(self.download_url_expiry_secs)
    }

    /// Derive the connection endpoint.
    ///
    /// A vanity `domain` wins and addresses the bucket by that domain alone.
    /// Otherwise a non-default `host` is used as given, then a `region`
    /// endpoint, then `s3.amazonaws.com`. The legacy signer always uses path
    /// style; SigV4 uses subdomain style unless `force_path_style` is set.
    #[must_use]
    pub fn to_connection_config(&self) -> ConnectionConfig {
        let auth_mode = self.auth_mode();
        let domain = self.domain.as_deref().filter(|d| !d.is_empty());
        let region = self.region.as_deref().filter(|r| !r.is_empty());

        let (server, calling_format) = if let Some(domain) = domain {
            (domain.to_owned(), CallingFormat::Vanity)
        } else {
            let server = if !self.host.is_empty() && self.host != DEFAULT_HOST {
                self.host.clone()
            } else if let Some(region) = region {
                format!("s3-{region}.amazonaws.com")
            } else {
                DEFAULT_HOST.to_owned()
            };
            let format = if auth_mode == AuthMode::SigV4 && !self.force_path_style {
                CallingFormat::Subdomain
            } else {
                CallingFormat::Regular
            };
            (server, format)
        };

        ConnectionConfig {
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
            secure: self.secure,
            server,
            port: self
                .port
                .unwrap_or(if self.secure { SECURE_PORT } else { INSECURE_PORT }),
            calling_format,
            region: region.map(ToOwned::to_owned),
            service: String::from("s3"),
            auth_mode,
        }
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}
