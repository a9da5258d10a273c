use once_cell::sync::Lazy;
use reqwest::Url;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_HOST: &str = "api.trustgrid.io";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

pub const API_HOST_VAR: &str = "TG_API_HOST";
pub const API_KEY_ID_VAR: &str = "TG_API_KEY_ID";
pub const API_KEY_SECRET_VAR: &str = "TG_API_KEY_SECRET";
pub const HTTP_TIMEOUT_VAR: &str = "TG_HTTP_TIMEOUT_SECS";

static HTTP_TIMEOUT: Lazy<Duration> = Lazy::new(|| {
    env_duration(
        HTTP_TIMEOUT_VAR,
        Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
    )
});

pub fn http_timeout() -> Duration {
    *HTTP_TIMEOUT
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("api host must not be empty")]
    EmptyHost,
    #[error("invalid api host `{host}`: {reason}")]
    InvalidHost { host: String, reason: String },
    #[error("{missing} must be set together with {present}")]
    IncompleteCredentials {
        missing: &'static str,
        present: &'static str,
    },
    #[error("failed to build http client")]
    Client(#[source] reqwest::Error),
}

#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    pub key_id: String,
    pub key_secret: String,
}

impl ApiCredentials {
    pub fn new(key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        }
    }

    pub(crate) fn header_value(&self) -> String {
        format!("trustgrid-token {}:{}", self.key_id, self.key_secret)
    }
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("key_id", &self.key_id)
            .field("key_secret", &"******")
            .finish()
    }
}

/// Connection settings for the inventory API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub credentials: Option<ApiCredentials>,
    pub timeout: Duration,
}

impl ClientConfig {
    /// `host` may be a bare host name (`https` is assumed) or a full base URL.
    pub fn new(host: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(host)?,
            credentials: None,
            timeout: http_timeout(),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let host = value(API_HOST_VAR).unwrap_or_else(|| DEFAULT_API_HOST.to_string());
        let credentials = match (value(API_KEY_ID_VAR), value(API_KEY_SECRET_VAR)) {
            (Some(key_id), Some(key_secret)) => Some(ApiCredentials::new(key_id, key_secret)),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::IncompleteCredentials {
                    missing: API_KEY_SECRET_VAR,
                    present: API_KEY_ID_VAR,
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::IncompleteCredentials {
                    missing: API_KEY_ID_VAR,
                    present: API_KEY_SECRET_VAR,
                })
            }
        };
        Ok(Self::new(&host)?.with_credentials(credentials))
    }

    pub fn with_credentials(mut self, credentials: Option<ApiCredentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn parse_base_url(host: &str) -> Result<Url, ConfigError> {
    let host = host.trim();
    if host.is_empty() {
        return Err(ConfigError::EmptyHost);
    }
    let raw = if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{host}")
    };
    let mut url = Url::parse(&raw).map_err(|err| ConfigError::InvalidHost {
        host: host.to_string(),
        reason: err.to_string(),
    })?;
    // Url::join drops the last segment unless the path ends with '/'.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn env_duration(var: &str, default: Duration) -> Duration {
    std::env::var(var)
        .ok()
        .and_then(|value| value.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
