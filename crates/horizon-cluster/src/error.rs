//! Error types for the clustering engine.

use std::path::PathBuf;


/// Result type alias for engine operations.
pub type EngineResult<T> = std::result::Result<T, ClusterError>;

/// An error raised by a [`crate::ClusterAlgorithm`].
///
/// The engine never catches or retries these; they reach whoever drove the
/// recompute.
#[derive(Debug, thiserror::Error)]
pub enum AlgorithmError {
    /// The algorithm rejected its input.
    #[error("Clustering failed: {0}")]
    Failed(String),

    /// Any other error surfaced by the algorithm.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl AlgorithmError {
    /// Create a failure with a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Errors loading a [`crate::ClusterConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parse error.
    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error.
    #[error("Invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// File I/O error.
    #[error("Failed to read configuration '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file extension names no supported format.
    #[error("Unsupported configuration format '{0}'")]
    UnsupportedFormat(String),
}

/// Errors produced by the engine facade.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// The clustering algorithm failed.
    #[error("Algorithm error: {0}")]
    Algorithm(#[from] AlgorithmError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A recompute was requested while clustering is disabled.
    #[error("Clustering is disabled")]
    Disabled,

    /// The engine has been torn down.
    #[error("Engine has been torn down")]
    TornDown,
}

impl ClusterError {
    /// Borrow the algorithm error, if this is one.
    pub fn as_algorithm(&self) -> Option<&AlgorithmError> {
        match self {
            Self::Algorithm(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_error_display() {
        let err: ClusterError = AlgorithmError::failed("no items").into();
        assert_eq!(err.to_string(), "Algorithm error: Clustering failed: no items");
        assert!(err.as_algorithm().is_some());
        assert!(ClusterError::Disabled.as_algorithm().is_none());
    }

    #[test]
    fn test_config_error_from_json() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: ClusterError = ConfigError::from(json_err).into();
        assert!(err.to_string().starts_with("Configuration error: Invalid JSON"));
    }
}
