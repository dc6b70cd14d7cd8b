//! Per-stage parameter sets.
//!
//! The hardware generator consumes one structured parameter set per
//! processing element (convolution stage). The fields mirror the generator's
//! generics exactly; [`LayerParams::validate`] enforces every constraint the
//! generator would reject, so a bad configuration fails before any clock
//! edge instead of producing silently wrong expectations.

use crate::error::{GoldenError, Result};
use strom_fixed::FixedPointFormat;

/// Bit widths of one processing stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageBitwidth {
    /// Total data register width in and out of the stage
    pub data_bits: u32,
    /// Fractional bits of the stage input
    pub frac_in: u32,
    /// Fractional bits of the stage output
    pub frac_out: u32,
    /// Total weight register width
    pub weight_bits: u32,
    /// Fractional bits of the weights
    pub weight_frac: u32,
}

impl StageBitwidth {
    fn split(total: u32, frac: u32) -> Result<FixedPointFormat> {
        let int = total.checked_sub(frac).ok_or_else(|| {
            GoldenError::invalid_params(format!(
                "{frac} fractional bits exceed {total}-bit register"
            ))
        })?;
        Ok(FixedPointFormat::new(int, frac, true)?)
    }

    /// Signed data format at the stage input
    ///
    /// # Errors
    ///
    /// Returns [`GoldenError::InvalidParams`] or [`GoldenError::Format`] for
    /// an unusable split.
    pub fn data_in_format(&self) -> Result<FixedPointFormat> {
        Self::split(self.data_bits, self.frac_in)
    }

    /// Signed data format at the stage output
    ///
    /// # Errors
    ///
    /// Returns [`GoldenError::InvalidParams`] or [`GoldenError::Format`] for
    /// an unusable split.
    pub fn data_out_format(&self) -> Result<FixedPointFormat> {
        Self::split(self.data_bits, self.frac_out)
    }

    /// Signed weight format
    ///
    /// # Errors
    ///
    /// Returns [`GoldenError::InvalidParams`] or [`GoldenError::Format`] for
    /// an unusable split.
    pub fn weight_format(&self) -> Result<FixedPointFormat> {
        Self::split(self.weight_bits, self.weight_frac)
    }

    fn validate(&self) -> Result<()> {
        if self.data_bits == 0 || self.data_bits > 63 {
            return Err(GoldenError::invalid_params(format!(
                "data width {} out of range 1..=63",
                self.data_bits
            )));
        }
        if self.frac_in > self.data_bits || self.frac_out > self.data_bits {
            return Err(GoldenError::invalid_params(format!(
                "fractional bits ({}/{}) exceed data width {}",
                self.frac_in, self.frac_out, self.data_bits
            )));
        }
        if self.weight_bits == 0 || self.weight_frac > self.weight_bits {
            return Err(GoldenError::invalid_params(format!(
                "weight split {}:{} invalid",
                self.weight_bits, self.weight_frac
            )));
        }
        Ok(())
    }
}

/// Parameters of one processing element: exactly one convolution, optional
/// activation, optional local max pooling.
///
/// This is the explicit, validated replacement for the loosely-typed
/// generic maps the original generator passed around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerParams {
    /// Convolution kernel edge length
    pub kernel_size: usize,
    /// Convolution stride
    pub stride: usize,
    /// Zero-padding border applied before the convolution (0 or 1)
    pub pad: usize,
    /// Input channel count
    pub channel_in: usize,
    /// Output channel count
    pub channel_out: usize,
    /// Apply ReLU after the convolution
    pub relu: bool,
    /// Use the leaky variant (requires `relu`)
    pub leaky_relu: bool,
    /// Max-pool kernel edge length, 0 when the stage has no pool
    pub pool_kernel: usize,
    /// Max-pool stride, 0 when the stage has no pool
    pub pool_stride: usize,
    /// Stage bit widths
    pub bitwidth: StageBitwidth,
}

impl LayerParams {
    /// Check every generator constraint.
    ///
    /// # Errors
    ///
    /// Returns [`GoldenError::InvalidParams`] naming the violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.kernel_size == 0 {
            return Err(GoldenError::invalid_params("kernel size must be >= 1"));
        }
        if self.stride == 0 || self.stride > self.kernel_size {
            return Err(GoldenError::invalid_params(format!(
                "stride {} must be in 1..=kernel_size {}",
                self.stride, self.kernel_size
            )));
        }
        if self.pad > 1 {
            return Err(GoldenError::invalid_params(format!(
                "padding {} not supported (0 or 1)",
                self.pad
            )));
        }
        if self.channel_in == 0 || self.channel_out == 0 {
            return Err(GoldenError::invalid_params("channel counts must be >= 1"));
        }
        if self.leaky_relu && !self.relu {
            return Err(GoldenError::invalid_params(
                "leaky_relu requires the relu activation",
            ));
        }
        match (self.pool_kernel, self.pool_stride) {
            (0, 0) => {}
            (k, s) if k >= 1 && s >= 1 && s <= k => {}
            (k, s) => {
                return Err(GoldenError::invalid_params(format!(
                    "pool kernel/stride {k}/{s} invalid"
                )));
            }
        }
        self.bitwidth.validate()
    }

    /// Whether the stage has a local max pool
    pub const fn has_pool(&self) -> bool {
        self.pool_kernel != 0
    }

    /// Spatial output extent of the whole stage for a given input extent.
    ///
    /// Applies padding, the convolution window, then the optional pool.
    pub fn output_extent(&self, extent: usize) -> Option<usize> {
        let padded = extent + 2 * self.pad;
        let conv_out = crate::layers::output_extent(padded, self.kernel_size, self.stride)?;
        if self.has_pool() {
            crate::layers::output_extent(conv_out, self.pool_kernel, self.pool_stride)
        } else {
            Some(conv_out)
        }
    }
}
