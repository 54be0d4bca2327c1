//! Configuration management for the sync client.

use crate::NetworkKind;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Sync behaviour. Replaced as a whole at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Run cycles on a timer, on reconnect and after enqueues
    pub auto_sync: bool,
    /// Minutes between timer-driven cycles
    pub sync_interval_minutes: u64,
    /// Retries after the first attempt of a remote call
    pub max_retries: u32,
    /// Fetch conflicts during a cycle
    pub conflict_resolution: bool,
    /// Only sync on wifi
    pub wifi_only: bool,
    /// Honour wake-ups delivered by the host's background scheduler
    pub background_sync: bool,
    /// Days synced records are kept locally
    pub retention_days: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_sync: true,
            sync_interval_minutes: 15,
            max_retries: 3,
            conflict_resolution: true,
            wifi_only: true,
            background_sync: false,
            retention_days: 30,
        }
    }
}

impl SyncConfig {
    /// Timer period, never shorter than one second.
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_minutes.saturating_mul(60)).max(Duration::from_secs(1))
    }
}

/// Remote authority connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base address, e.g. `https://sync.example.com`
    pub base_url: String,
    /// Sent as `X-API-Key` on every request
    pub api_key: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Full agent configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub sync: SyncConfig,
    /// Directory for the file-backed local store
    pub data_dir: PathBuf,
    /// Display name this installation registers with
    pub device_name: String,
    /// Network type the agent reports
    pub network: NetworkKind,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env::var("TANDEM_API_URL").map_err(|_| ConfigError::MissingApiUrl)?;
        let api_key = env::var("TANDEM_API_KEY").unwrap_or_default();
        let timeout = Duration::from_secs(parse_var("TANDEM_TIMEOUT_SECS", 30)?);

        let defaults = SyncConfig::default();
        let sync = SyncConfig {
            auto_sync: parse_var("TANDEM_AUTO_SYNC", defaults.auto_sync)?,
            sync_interval_minutes: parse_var(
                "TANDEM_SYNC_INTERVAL_MINUTES",
                defaults.sync_interval_minutes,
            )?,
            max_retries: parse_var("TANDEM_MAX_RETRIES", defaults.max_retries)?,
            conflict_resolution: parse_var(
                "TANDEM_CONFLICT_RESOLUTION",
                defaults.conflict_resolution,
            )?,
            wifi_only: parse_var("TANDEM_WIFI_ONLY", defaults.wifi_only)?,
            background_sync: parse_var("TANDEM_BACKGROUND_SYNC", defaults.background_sync)?,
            retention_days: parse_var("TANDEM_RETENTION_DAYS", defaults.retention_days)?,
        };

        let data_dir = env::var("TANDEM_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./tandem-data"));
        let device_name =
            env::var("TANDEM_DEVICE_NAME").unwrap_or_else(|_| "tandem-agent".to_string());
        let network = parse_var("TANDEM_NETWORK", NetworkKind::Wifi)?;

        Ok(Self {
            api: ApiConfig {
                base_url,
                api_key,
                timeout,
            },
            sync,
            data_dir,
            device_name,
            network,
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("TANDEM_API_URL environment variable is required")]
    MissingApiUrl,

    #[error("Invalid {name} value: {value:?}")]
    Invalid { name: &'static str, value: String },
}
