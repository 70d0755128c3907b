use std::path::PathBuf;
use thiserror::Error;

/// Failures while assembling a [`NavigationConfig`](super::NavigationConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("starnav config file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The built-in defaults could not be encoded as the base layer.
    #[error("failed to encode built-in defaults: {0}")]
    Defaults(#[source] serde_json::Error),

    /// A layer (file or `STARNAV_*` environment) could not be read or merged.
    #[error("failed to merge configuration layers: {0}")]
    Merge(#[source] config::ConfigError),

    /// The merged layers do not fit the config sections.
    #[error("configuration has the wrong shape: {0}")]
    Shape(#[source] config::ConfigError),

    #[error("{} invalid setting(s): {}", .problems.len(), .problems.join("; "))]
    Invalid { problems: Vec<String> },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
