//! Application-level configuration loading for the card controllers.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::services::progress_poller::ProgressSourcing;

/// Default location on disk where the client looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/card.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "LAUNCHER_CARD_CONFIG_PATH";
/// Cadence of progress requests while a game is installing or updating.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Capacity of the status change and progress push channels.
const DEFAULT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared by every card controller.
pub struct AppConfig {
    poll_interval: Duration,
    progress_sourcing: ProgressSourcing,
    decision_timeout: Option<Duration>,
    status_channel_capacity: usize,
    progress_channel_capacity: usize,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to the built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        poll_interval_ms = app_config.poll_interval.as_millis() as u64,
                        sourcing = ?app_config.progress_sourcing,
                        "loaded card configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON configuration document; absent keys keep their defaults.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Period of the progress poller.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// How progress is obtained from the external process.
    pub fn progress_sourcing(&self) -> ProgressSourcing {
        self.progress_sourcing
    }

    /// How long the update prompt may stay unanswered; `None` waits indefinitely.
    pub fn decision_timeout(&self) -> Option<Duration> {
        self.decision_timeout
    }

    /// Capacity of the status change channel.
    pub fn status_channel_capacity(&self) -> usize {
        self.status_channel_capacity
    }

    /// Capacity of each per-game progress push channel.
    pub fn progress_channel_capacity(&self) -> usize {
        self.progress_channel_capacity
    }

    /// Override the update prompt timeout.
    pub fn with_decision_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.decision_timeout = timeout;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            progress_sourcing: ProgressSourcing::default(),
            decision_timeout: None,
            status_channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            progress_channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    poll_interval_ms: Option<u64>,
    progress_sourcing: Option<ProgressSourcing>,
    decision_timeout_secs: Option<u64>,
    status_channel_capacity: Option<usize>,
    progress_channel_capacity: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            poll_interval: value
                .poll_interval_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            progress_sourcing: value
                .progress_sourcing
                .unwrap_or(defaults.progress_sourcing),
            decision_timeout: value.decision_timeout_secs.map(Duration::from_secs),
            status_channel_capacity: value
                .status_channel_capacity
                .filter(|capacity| *capacity > 0)
                .unwrap_or(defaults.status_channel_capacity),
            progress_channel_capacity: value
                .progress_channel_capacity
                .filter(|capacity| *capacity > 0)
                .unwrap_or(defaults.progress_channel_capacity),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
