//! Error type shared by the registry, config loader and exporter.

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, ExporterError>;

#[derive(Debug, Error)]
pub enum ExporterError {
    /// Config parsed but failed validation, or could not be parsed at all.
    #[error("invalid config: {0}")]
    Config(String),

    #[error("read config {path} failed: {source}")]
    ReadConfig {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The collector could not be reached while constructing the exporter.
    #[error("connect {network} {addr} failed: {source}")]
    Connect {
        network: &'static str,
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("duplicate metric: {0}")]
    DuplicateMetric(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
