//! Configuration models and loaders for the constellation tracker.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Default base URL of the hourly position feed.
pub const DEFAULT_FEED_BASE_URL: &str = "https://a.windbornesystems.com";
/// Default location of the static wind document.
pub const DEFAULT_WIND_PATH: &str = "data/wind/wind_data.json";

/// Top-level configuration parsed from a TOML or YAML file.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct TrackerConfig {
    pub feed: FeedConfig,
    pub wind: WindConfig,
    pub display: DisplayConfig,
}

/// Position feed settings.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FeedConfig {
    pub base_url: String,
    /// Per-request timeout in seconds; `None` waits indefinitely.
    pub request_timeout_secs: Option<u64>,
    pub join_policy: JoinPolicyConfig,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_FEED_BASE_URL.to_string(),
            request_timeout_secs: Some(30),
            join_policy: JoinPolicyConfig::AllOrNothing,
        }
    }
}

/// How per-hour failures combine into the aggregate result.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum JoinPolicyConfig {
    #[default]
    AllOrNothing,
    KeepSucceeded,
}

/// Wind field source settings.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WindConfig {
    pub path: PathBuf,
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_WIND_PATH),
        }
    }
}

/// Scale parameters handed to the geometry builder.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DisplayConfig {
    pub altitude_scale: f64,
    pub wind_vector_scale: f64,
    pub show_wind_vectors: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            altitude_scale: 500.0,
            wind_vector_scale: 1.0,
            show_wind_vectors: true,
        }
    }
}

/// Errors that can occur while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl TrackerConfig {
    /// Reject values the aggregator or geometry builder cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("feed.base_url must not be empty".into()));
        }
        if !(self.display.altitude_scale > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "display.altitude_scale must be positive (got {})",
                self.display.altitude_scale
            )));
        }
        if !(self.display.wind_vector_scale >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "display.wind_vector_scale must be non-negative (got {})",
                self.display.wind_vector_scale
            )));
        }
        Ok(())
    }
}

/// Load and validate a configuration file. `.toml` files are parsed as TOML,
/// anything else as YAML.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TrackerConfig, ConfigError> {
    let config: TrackerConfig = load_record(path)?;
    config.validate()?;
    Ok(config)
}

/// Load the configuration at `path` when given, otherwise the defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<TrackerConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => Ok(TrackerConfig::default()),
    }
}

fn load_record<T, P>(path: P) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.extension().map(|ext| ext == "toml").unwrap_or(false) {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    } else {
        let reader = File::open(path)?;
        Ok(serde_yaml::from_reader(reader)?)
    }
}
