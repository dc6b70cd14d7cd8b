#![forbid(unsafe_code)]

//! Bit-exact fixed-point arithmetic for the strom accelerator.
//!
//! This crate is the numeric contract between the hardware and every software
//! model that claims to predict it: quantization (round to nearest, ties to
//! even), saturation on overflow, two's-complement register encoding, and
//! single-rounding add/multiply at a caller-chosen output format.
//!
//! Saturation is never an error anywhere in this crate; it is the defined
//! behavior of the hardware's arithmetic units. The only failures are
//! malformed formats and raw bit patterns wider than the register they claim
//! to come from.
//!
//! # Example
//!
//! ```
//! use strom_fixed::{FixedPointFormat, FixedValue};
//!
//! # fn main() -> Result<(), strom_fixed::FormatError> {
//! let q4_4 = FixedPointFormat::new(4, 4, true)?;
//! let x = FixedValue::quantize(-0.5, q4_4);
//! assert_eq!(x.to_f64(), -0.5);
//! assert_eq!(x.to_raw_bits(), 0xF8); // two's complement, 8 bits
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

mod format;
mod value;

pub use format::{FixedPointFormat, FormatError, Result};
pub use value::{requantize_raw, FixedValue};
