use std::{path::PathBuf, time::Duration};

use reqwest::Url;

use crate::error::ValidationError;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(30);
/// Shorter poll intervals are raised to this.
pub const MIN_HEALTH_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_STORE_PATH: &str = ".continuum/session.db";

/// Settings for talking to the analysis API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    /// `None` leaves timeouts to the network stack.
    pub timeout: Option<Duration>,
    pub health_interval: Duration,
    pub store_path: PathBuf,
    pub use_system_proxy: bool,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, ValidationError> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|_| ValidationError::InvalidBaseUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(ValidationError::InvalidBaseUrl(base_url.to_string()));
        }
        Ok(Self {
            base_url,
            timeout: None,
            health_interval: DEFAULT_HEALTH_INTERVAL,
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            use_system_proxy: true,
        })
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_health_interval(mut self, interval: Duration) -> Self {
        self.health_interval = interval.max(MIN_HEALTH_INTERVAL);
        self
    }

    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    pub fn with_system_proxy(mut self, enabled: bool) -> Self {
        self.use_system_proxy = enabled;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_API_URL).expect("default API URL is valid"),
            timeout: None,
            health_interval: DEFAULT_HEALTH_INTERVAL,
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            use_system_proxy: true,
        }
    }
}
