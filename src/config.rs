use crate::reservation::{RESERVATION_ANNOTATION, ReservationSource};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use validator::{Validate, ValidationErrors};

pub const DEFAULT_CONFIG_PATH: &str = "~/.node-reserve/config.yaml";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {0}: {1}")]
    Io(String, #[source] std::io::Error),
    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(#[from] ValidationErrors),
    #[error("invalid config: backoff-max-ms ({max}) is below backoff-base-ms ({base})")]
    Backoff { base: u64, max: u64 },
}

#[derive(Serialize, Deserialize, Validate, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// annotation holding the JSON reservation document
    #[validate(length(min = 1))]
    pub annotation_key: String,
    /// also read `reserve.<resource-type>/<owner-uid>` annotations
    pub legacy_annotations: bool,
    /// how many times a failed node sync is retried before it is dropped
    #[validate(range(max = 10))]
    pub max_retries: u32,
    #[validate(range(min = 1))]
    pub backoff_base_ms: u64,
    #[validate(range(min = 1))]
    pub backoff_max_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            annotation_key: RESERVATION_ANNOTATION.to_string(),
            legacy_annotations: true,
            max_retries: 3,
            backoff_base_ms: 5,
            backoff_max_ms: 1_000_000,
        }
    }
}

impl Config {
    /// Loads the config at `path` (a leading `~` is expanded). A missing file gives
    /// the defaults.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let path = shellexpand::tilde(path).to_string();
        if !Path::new(&path).exists() {
            return Ok(Config::default());
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(path.clone(), e))?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        if config.backoff_max_ms < config.backoff_base_ms {
            return Err(ConfigError::Backoff {
                base: config.backoff_base_ms,
                max: config.backoff_max_ms,
            });
        }
        Ok(config)
    }

    pub fn reservation_source(&self) -> ReservationSource {
        ReservationSource {
            annotation_key: self.annotation_key.clone(),
            legacy_annotations: self.legacy_annotations,
        }
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }
}
