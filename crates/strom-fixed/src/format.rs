//! Fixed-point format descriptor

use thiserror::Error;

/// Result type alias for fixed-point operations
pub type Result<T> = std::result::Result<T, FormatError>;

/// Errors for malformed formats or raw bit patterns
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Integer/fractional bit split does not describe a usable register
    #[error("invalid bit split: int_bits={int_bits} + frac_bits={frac_bits} must total 1..=63")]
    InvalidWidth {
        /// Requested integer bits (sign bit included for signed formats)
        int_bits: u32,
        /// Requested fractional bits
        frac_bits: u32,
    },

    /// Raw bit pattern is wider than the format's register
    #[error("raw pattern {bits:#x} does not fit in {total_bits} bits")]
    RawOutOfRange {
        /// Offending bit pattern
        bits: u64,
        /// Register width of the format
        total_bits: u32,
    },
}

/// Width and sign description of a fixed-point register.
///
/// `total_bits == int_bits + frac_bits` always holds; the sign bit of signed
/// formats is counted inside `int_bits`, matching the hardware generator's
/// generics (`C_TOTAL_BITS`, `C_FRAC_BITS`). `int_bits == 0` is legal and
/// describes a pure fraction (used by the global-average reciprocal).
/// Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedPointFormat {
    int_bits: u32,
    frac_bits: u32,
    signed: bool,
}

impl FixedPointFormat {
    /// Create a format from its integer/fractional split.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::InvalidWidth`] if the total width is zero or
    /// exceeds 63 bits (raw values must fit an `i64`).
    pub fn new(int_bits: u32, frac_bits: u32, signed: bool) -> Result<Self> {
        let total = int_bits + frac_bits;
        if total == 0 || total > 63 {
            return Err(FormatError::InvalidWidth {
                int_bits,
                frac_bits,
            });
        }
        Ok(Self {
            int_bits,
            frac_bits,
            signed,
        })
    }

    /// Register width in bits
    pub const fn total_bits(&self) -> u32 {
        self.int_bits + self.frac_bits
    }

    /// Integer bits (sign bit included for signed formats)
    pub const fn int_bits(&self) -> u32 {
        self.int_bits
    }

    /// Fractional bits
    pub const fn frac_bits(&self) -> u32 {
        self.frac_bits
    }

    /// Whether the format is two's-complement signed
    pub const fn signed(&self) -> bool {
        self.signed
    }

    /// Smallest representable raw value
    pub const fn min_raw(&self) -> i64 {
        if self.signed {
            -(1_i64 << (self.total_bits() - 1))
        } else {
            0
        }
    }

    /// Largest representable raw value
    pub const fn max_raw(&self) -> i64 {
        if self.signed {
            (1_i64 << (self.total_bits() - 1)) - 1
        } else {
            (1_i64 << self.total_bits()) - 1
        }
    }

    /// Value of one least-significant bit (`2^-frac_bits`)
    pub fn resolution(&self) -> f64 {
        (-f64::from(self.frac_bits)).exp2()
    }

    /// Smallest representable real value
    pub fn min_value(&self) -> f64 {
        self.min_raw() as f64 * self.resolution()
    }

    /// Largest representable real value
    pub fn max_value(&self) -> f64 {
        self.max_raw() as f64 * self.resolution()
    }

    /// Bit mask covering the register width
    pub const fn mask(&self) -> u64 {
        (1_u64 << self.total_bits()) - 1
    }
}

impl std::fmt::Display for FixedPointFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.signed { "s" } else { "u" };
        write!(f, "{sign}{}.{}", self.int_bits, self.frac_bits)
    }
}
