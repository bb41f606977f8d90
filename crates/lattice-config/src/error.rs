//! Config loading/validation errors.

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file was not valid TOML for the expected shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A loaded config failed validation.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Result alias for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
