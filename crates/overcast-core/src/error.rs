use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Mapping file error: {0}")]
    Mappings(#[from] config::ConfigError),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Invalid step in deployment '{deployment}': {message}")]
    InvalidStep { deployment: String, message: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
