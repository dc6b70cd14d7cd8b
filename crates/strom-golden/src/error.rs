//! Error types for golden-model operations

use strom_fixed::FormatError;
use thiserror::Error;

/// Result type alias for golden-model operations
pub type Result<T> = std::result::Result<T, GoldenError>;

/// Errors that can occur while building or evaluating the golden model.
///
/// Shape and parameter errors indicate a broken test configuration, never a
/// device bug; they abort the run immediately. Numeric overflow is not
/// represented here at all; it saturates.
#[derive(Debug, Error)]
pub enum GoldenError {
    /// Tensor/weight/bias dimensions do not fit together
    #[error("shape mismatch: {reason}")]
    Shape {
        /// Description of the mismatch
        reason: String,
    },

    /// Layer parameter set violates a hardware constraint
    #[error("invalid layer parameters: {reason}")]
    InvalidParams {
        /// Violated constraint
        reason: String,
    },

    /// Requested configuration is not supported by the accelerator
    #[error("not supported: {reason}")]
    NotSupported {
        /// Reason for failure
        reason: String,
    },

    /// Malformed fixed-point format or bit pattern
    #[error("format error: {source}")]
    Format {
        /// Underlying fixed-point error
        #[from]
        source: FormatError,
    },

    /// Weight file could not be read or written
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// Weight file contents do not match the persistence format
    #[error("weight file parse error: {reason}")]
    WeightFile {
        /// Reason for failure
        reason: String,
    },
}

impl GoldenError {
    /// Create a shape mismatch error
    pub fn shape(reason: impl Into<String>) -> Self {
        Self::Shape {
            reason: reason.into(),
        }
    }

    /// Create an invalid-parameters error
    pub fn invalid_params(reason: impl Into<String>) -> Self {
        Self::InvalidParams {
            reason: reason.into(),
        }
    }

    /// Create a not-supported error
    pub fn not_supported(reason: impl Into<String>) -> Self {
        Self::NotSupported {
            reason: reason.into(),
        }
    }

    /// Create a weight-file parse error
    pub fn weight_file(reason: impl Into<String>) -> Self {
        Self::WeightFile {
            reason: reason.into(),
        }
    }
}
