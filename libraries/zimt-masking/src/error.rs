//! Error types for the masking engine

use thiserror::Error;

/// Result type for masking operations
pub type Result<T> = std::result::Result<T, MaskingError>;

/// Broad category of a [`MaskingError`]
///
/// All kinds are caller-input errors detected at call entry; none are transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Channel-count mismatch or an impossible sample-axis reduction
    InvalidShape,
    /// Non-finite or inconsistent parameters
    InvalidConfiguration,
    /// Input and output share storage where distinct storage is required
    AliasingViolation,
}

/// Errors that can occur in energy, level or masking computations
#[derive(Error, Debug)]
pub enum MaskingError {
    /// Array shapes do not fit the operation
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// Parameters are non-finite or logically inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The same storage was passed as input and output
    #[error("Aliasing violation: {0}")]
    AliasingViolation(String),

    /// Configuration could not be loaded or deserialized
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MaskingError {
    /// Create an invalid shape error
    pub fn invalid_shape(msg: impl Into<String>) -> Self {
        Self::InvalidShape(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Category of this error
    ///
    /// Loader failures count as configuration errors.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidShape(_) => ErrorKind::InvalidShape,
            Self::InvalidConfiguration(_) | Self::Config(_) => ErrorKind::InvalidConfiguration,
            Self::AliasingViolation(_) => ErrorKind::AliasingViolation,
        }
    }
}

impl From<config::ConfigError> for MaskingError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
