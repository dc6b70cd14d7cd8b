#![deny(unsafe_code)]

//! Bit-exact golden model of a streaming CNN accelerator
//!
//! This crate computes, in software, exactly what the pipelined fixed-point
//! hardware computes: every rounding point, every saturation, every ordering
//! decision is reproduced rather than approximated. Verification compares a
//! device capture against these predictions value for value, so "close" is
//! never good enough here.
//!
//! # Structure
//!
//! - [`Tensor`] and the layer functions in [`layers`] model the arithmetic.
//! - [`stream`] models the data-path reordering (line buffer, window
//!   extractor, channel repeater) incrementally, value by value.
//! - [`LayerParams`] + [`Stage`] + [`GoldenModel`] tie both together into
//!   the full pipeline and produce [`ExpectedSequence`]s for the scoreboard.
//! - [`weight_files`] persists quantized weights in the loader's format.
//!
//! # Example
//!
//! ```
//! use strom_fixed::FixedPointFormat;
//! use strom_golden::{layers, Tensor};
//!
//! # fn main() -> strom_golden::Result<()> {
//! let fmt = FixedPointFormat::new(4, 4, true)?;
//! let image = Tensor::from_reals(fmt, 1, 4, 4, &[0.5; 16])?;
//! let pooled = layers::max_pool(&image, 2, 2)?;
//! assert_eq!(pooled.shape(), (1, 2, 2));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

mod error;
pub mod layers;
mod model;
mod params;
pub mod stream;
mod tensor;
pub mod weight_files;

pub use error::{GoldenError, Result};
pub use layers::Kernel;
pub use model::{ExpectedSequence, GoldenModel, Stage};
pub use params::{LayerParams, StageBitwidth};
pub use tensor::Tensor;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        ExpectedSequence, GoldenModel, Kernel, LayerParams, Result, Stage, StageBitwidth, Tensor,
    };
}
