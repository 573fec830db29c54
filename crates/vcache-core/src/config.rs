//! Process configuration.
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `AWS_ENDPOINT_URL_S3` | Object store endpoint (scheme optional, defaults to https) |
//! | `AWS_ACCESS_KEY_ID` | Access key |
//! | `AWS_SECRET_ACCESS_KEY` | Secret key |
//! | `AWS_REGION` | Region (default: `us-east-1`) |
//! | `VT_S3_BUCKET` | Bucket holding the documents |
//! | `VT_HTTP_PORT` | HTTP listen port (default: 8080) |
//! | `VT_DATA_DIR` | Directory for local materialized copies |
//! | `VT_POLL_INTERVAL_SECS` | Seconds between polling passes (default: 2) |
//! | `VT_STALE_THRESHOLD` | No-change passes before `vehicles` falls back (default: 60) |

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{CacheError, CacheResult};

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    std::env::temp_dir().join("vcache")
}

fn default_poll_interval_secs() -> u64 {
    2
}

fn default_stale_threshold() -> u32 {
    60
}

/// Connection settings for the remote object store.
#[derive(Clone, Default, Deserialize)]
pub struct RemoteSettings {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub secret_access_key: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
}

impl RemoteSettings {
    /// Endpoint with an explicit scheme.
    pub fn endpoint_url(&self) -> String {
        if self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://") {
            self.endpoint.clone()
        } else {
            format!("https://{}", self.endpoint)
        }
    }

    /// Plain-HTTP endpoints must be opted into explicitly by scheme.
    pub fn allow_http(&self) -> bool {
        self.endpoint.starts_with("http://")
    }
}

impl fmt::Debug for RemoteSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSettings")
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .finish()
    }
}

/// Complete process configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub remote: RemoteSettings,

    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Directory holding local materialized copies; purged at startup.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Consecutive no-change passes before `vehicles` is replaced by the placeholder.
    #[serde(default = "default_stale_threshold")]
    pub stale_threshold: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            remote: RemoteSettings {
                region: default_region(),
                ..RemoteSettings::default()
            },
            http_port: default_http_port(),
            data_dir: default_data_dir(),
            poll_interval_secs: default_poll_interval_secs(),
            stale_threshold: default_stale_threshold(),
        }
    }
}

impl CacheConfig {
    /// Create config from environment variables.
    pub fn from_env() -> CacheResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> CacheResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("AWS_ENDPOINT_URL_S3") {
            config.remote.endpoint = v;
        }
        if let Some(v) = var("AWS_ACCESS_KEY_ID") {
            config.remote.access_key_id = v;
        }
        if let Some(v) = var("AWS_SECRET_ACCESS_KEY") {
            config.remote.secret_access_key = v;
        }
        if let Some(v) = var("AWS_REGION") {
            config.remote.region = v;
        }
        if let Some(v) = var("VT_S3_BUCKET") {
            config.remote.bucket = v;
        }
        if let Some(v) = var("VT_HTTP_PORT") {
            config.http_port = parse_var("VT_HTTP_PORT", &v)?;
        }
        if let Some(v) = var("VT_DATA_DIR") {
            config.data_dir = PathBuf::from(v);
        }
        if let Some(v) = var("VT_POLL_INTERVAL_SECS") {
            config.poll_interval_secs = parse_var("VT_POLL_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = var("VT_STALE_THRESHOLD") {
            config.stale_threshold = parse_var("VT_STALE_THRESHOLD", &v)?;
        }

        Ok(config)
    }

    /// Load config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> CacheResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| CacheError::local_io(path, e))?;
        serde_json::from_str(&raw).map_err(|e| {
            CacheError::config(format!("invalid config file {}: {}", path.display(), e))
        })
    }

    pub fn with_http_port(mut self, port: u16) -> Self {
        self.http_port = port;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_remote(mut self, remote: RemoteSettings) -> Self {
        self.remote = remote;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Reject configurations the process cannot start with.
    pub fn validate(&self) -> CacheResult<()> {
        let required = [
            ("AWS_ENDPOINT_URL_S3", &self.remote.endpoint),
            ("AWS_ACCESS_KEY_ID", &self.remote.access_key_id),
            ("AWS_SECRET_ACCESS_KEY", &self.remote.secret_access_key),
            ("VT_S3_BUCKET", &self.remote.bucket),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(CacheError::config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }
        if self.poll_interval_secs == 0 {
            return Err(CacheError::config("poll interval must be at least 1 second"));
        }
        if self.stale_threshold == 0 {
            return Err(CacheError::config("stale threshold must be at least 1"));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> CacheResult<T>
where
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| CacheError::config(format!("invalid {}='{}': {}", name, value, e)))
}
