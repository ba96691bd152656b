//! Errors owned by this crate
//!
//! Jobs carry their own caller-chosen error type; the errors here only cover
//! loading and validating configuration.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Jitter factor must be within 0.0..=1.0, got {0}")]
    InvalidJitterFactor(f64),

    #[error("Exponential backoff base must be at least 1.0, got {0}")]
    InvalidExponentialBase(f64),

    #[error("Custom backoff requires at least one delay")]
    EmptyCustomDelays,

    #[error("Cache limit must be greater than zero")]
    ZeroCacheLimit,

    #[error("Failed to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config")]
    Parse(#[from] toml::de::Error),
}
