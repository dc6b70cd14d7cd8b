//! Error types for the verification harness

use crate::scoreboard::VerificationReport;
use strom_fixed::FormatError;
use strom_golden::GoldenError;
use thiserror::Error;

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Errors that can occur while wiring or running a verification.
///
/// Signal and width errors are bench-configuration defects and abort
/// immediately. [`HarnessError::Verification`] is the expected outcome of a
/// failing test: a structured report, produced only at scoreboard drain
/// after every capture finished.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A signal name was looked up that no task registered
    #[error("unknown signal: {name}")]
    UnknownSignal {
        /// Requested signal name
        name: String,
    },

    /// A driven value does not fit the signal's declared width
    #[error("value {value:#x} exceeds {bits}-bit signal {name}")]
    WidthExceeded {
        /// Signal name
        name: String,
        /// Declared width in bits
        bits: u32,
        /// Offending value
        value: u64,
    },

    /// Raw stimulus blob is not a whole number of 8-byte words
    #[error("stimulus blob of {len} bytes is not a multiple of the word size")]
    TruncatedStimulus {
        /// Blob length in bytes
        len: usize,
    },

    /// The scoreboard found divergence between capture and expectation
    #[error("{0}")]
    Verification(Box<VerificationReport>),

    /// Malformed fixed-point format or bit pattern
    #[error("format error: {source}")]
    Format {
        /// Underlying fixed-point error
        #[from]
        source: FormatError,
    },

    /// Golden-model evaluation failed
    #[error("golden model error: {source}")]
    Golden {
        /// Underlying golden-model error
        #[from]
        source: GoldenError,
    },
}

impl HarnessError {
    /// Create an unknown-signal error
    pub fn unknown_signal(name: impl Into<String>) -> Self {
        Self::UnknownSignal { name: name.into() }
    }
}
