//! Project configuration and runtime options.

use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::error::ConfigurationError;

/// Default REST server.
pub const DEFAULT_SERVER_URL: &str = "https://app.cmscure.com";
/// Default realtime server.
pub const DEFAULT_SOCKET_URL: &str = "wss://app.cmscure.com";
/// Default REST timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const ENV_PROJECT_ID: &str = "CURE_PROJECT_ID";
const ENV_API_KEY: &str = "CURE_API_KEY";
const ENV_PROJECT_SECRET: &str = "CURE_PROJECT_SECRET";
const ENV_SERVER_URL: &str = "CURE_SERVER_URL";
const ENV_SOCKET_URL: &str = "CURE_SOCKET_URL";
const ENV_AUTO_REALTIME: &str = "CURE_AUTO_REALTIME";

/// Project credentials and endpoints. Immutable once accepted by a context.
///
/// # Example
///
/// ```ignore
/// use cure_sync::Configuration;
///
/// let config = Configuration::new("proj1", "key1", "s3cr3t")
///     .with_server_url("https://staging.cmscure.com")
///     .with_auto_realtime(false);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Configuration {
    pub project_id: String,
    pub api_key: String,
    pub project_secret: String,
    pub server_url: String,
    pub socket_url: String,
    /// Open the realtime channel and auto-subscribe on reads.
    pub auto_realtime: bool,
}

impl Configuration {
    /// Create a configuration with default endpoints and realtime on.
    pub fn new(
        project_id: impl Into<String>,
        api_key: impl Into<String>,
        project_secret: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            api_key: api_key.into(),
            project_secret: project_secret.into(),
            server_url: DEFAULT_SERVER_URL.to_string(),
            socket_url: DEFAULT_SOCKET_URL.to_string(),
            auto_realtime: true,
        }
    }

    /// Set the REST server URL.
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }

    /// Set the realtime server URL.
    pub fn with_socket_url(mut self, url: impl Into<String>) -> Self {
        self.socket_url = url.into();
        self
    }

    /// Enable or disable the realtime channel and auto-subscription.
    pub fn with_auto_realtime(mut self, enabled: bool) -> Self {
        self.auto_realtime = enabled;
        self
    }

    /// Build from `CURE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let project_id = lookup(ENV_PROJECT_ID).unwrap_or_default();
        let api_key = lookup(ENV_API_KEY).unwrap_or_default();
        let project_secret = lookup(ENV_PROJECT_SECRET).unwrap_or_default();

        let mut config = Self::new(project_id, api_key, project_secret);
        if let Some(url) = lookup(ENV_SERVER_URL).filter(|v| !v.trim().is_empty()) {
            config = config.with_server_url(url);
        }
        if let Some(url) = lookup(ENV_SOCKET_URL).filter(|v| !v.trim().is_empty()) {
            config = config.with_socket_url(url);
        }
        if let Some(flag) = lookup(ENV_AUTO_REALTIME) {
            config = config.with_auto_realtime(parse_flag(&flag));
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject empty credentials and non-http(s) server URLs.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.project_id.trim().is_empty() {
            return Err(ConfigurationError::MissingField("project id"));
        }
        if self.api_key.trim().is_empty() {
            return Err(ConfigurationError::MissingField("api key"));
        }
        if self.project_secret.trim().is_empty() {
            return Err(ConfigurationError::MissingField("project secret"));
        }
        if !(self.server_url.starts_with("https://") || self.server_url.starts_with("http://")) {
            return Err(ConfigurationError::InvalidServerUrl(self.server_url.clone()));
        }
        let socket_ok = ["wss://", "ws://", "https://", "http://"]
            .iter()
            .any(|scheme| self.socket_url.starts_with(scheme));
        if !socket_ok {
            warn!("Socket URL '{}' has no ws/http scheme", self.socket_url);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("project_id", &self.project_id)
            .field("api_key", &"[REDACTED]")
            .field("project_secret", &"[REDACTED]")
            .field("server_url", &self.server_url)
            .field("socket_url", &self.socket_url)
            .field("auto_realtime", &self.auto_realtime)
            .finish()
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

/// Runtime environment of a context.
#[derive(Debug, Clone)]
pub struct ContextOptions {
    /// Where persisted state lives. `None` means the platform data directory.
    pub data_dir: Option<PathBuf>,
    pub http_timeout: Duration,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            data_dir: None,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl ContextOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}
