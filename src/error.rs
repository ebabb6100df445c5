//! Error types for poolcost
//!
//! There are two error types: `PoolCostError` (main error enum) and
//! `ConfigError` (configuration-specific).
//!
//! Library code uses `crate::error::Result<T>` which returns `PoolCostError`.
//! The binary uses `anyhow::Result<T>` and converts at the CLI boundary, after
//! mapping the structured error to an exit code (see `exit_codes`).
//!
//! ## Fatal vs. per-entry
//!
//! Every variant here is fatal for a run: a price table that cannot be read,
//! a failed fetch, or a pool document that does not parse. Gaps in pricing for
//! a single pool (unknown machine type, missing GPU price) are never errors;
//! they surface as `null` fields in the output instead.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for poolcost
#[derive(Error, Debug)]
pub enum PoolCostError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to load price table {path}: {reason}")]
    PriceTable {
        path: PathBuf,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Failed to fetch pool configuration from {url}: HTTP {status}")]
    Fetch { url: String, status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse pool configuration: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

impl From<serde_yaml::Error> for PoolCostError {
    fn from(err: serde_yaml::Error) -> Self {
        PoolCostError::Parse(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, PoolCostError>;
