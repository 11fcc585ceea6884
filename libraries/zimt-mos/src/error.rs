//! Error types for MOS mapping

use thiserror::Error;

/// Result type for MOS mapping operations
pub type Result<T> = std::result::Result<T, MosError>;

/// Errors that can occur when building or fitting a MOS mapper
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MosError {
    /// Calibration anchors cannot constrain the curve
    #[error("Invalid calibration anchors: {0}")]
    InvalidAnchors(String),

    /// Curve parameters are out of range
    #[error("Invalid MOS parameters: {0}")]
    InvalidParameters(String),
}
