use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("invalid value '{value}' for '{key}': expected {expected}")]
  InvalidValue {
    key: String,
    value: String,
    expected: &'static str,
  },
  #[error("failed to access config file {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("failed to encode configuration: {0}")]
  Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RunnerError {
  #[error("Simulation '{0}' not found.")]
  UnknownDemo(String),
  #[error(transparent)]
  Config(#[from] ConfigError),
}
