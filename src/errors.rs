use crate::config::ConfigError;
use crate::controllers::reservation::SyncError;
use crate::reservation::ParseError;
use crate::spec::pod_helpers;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeReserveError {
    #[error("Error: {0}")]
    String(String),
    #[error("Error: {0}")]
    Anyhow(#[from] anyhow::Error),
    #[error("Error: {0}")]
    IO(#[from] std::io::Error),
    #[error("Error: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    #[error("Error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("Error: {0}")]
    Config(#[from] ConfigError),
    #[error("Error: {0}")]
    Parse(#[from] ParseError),
    #[error("Error: {0}")]
    Quantity(#[from] pod_helpers::Error),
    #[error("Error: {0}")]
    Sync(#[from] SyncError),
}

impl From<String> for NodeReserveError {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for NodeReserveError {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}
