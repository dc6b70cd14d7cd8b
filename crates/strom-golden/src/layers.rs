//! Quantized layer reference functions.
//!
//! Pure functions `Tensor -> Tensor`, each matching the corresponding
//! hardware stage bit for bit: full-precision arithmetic with a single
//! rounding point per output element, saturation on overflow, and the
//! "full kernel fits" valid-window rule for every windowed operation.

use crate::error::{GoldenError, Result};
use crate::tensor::Tensor;
use strom_fixed::{requantize_raw, FixedPointFormat, FixedValue};

/// Convolution weights `(ch_out, ch_in, k, k)`, square by construction.
#[derive(Debug, Clone)]
pub struct Kernel {
    format: FixedPointFormat,
    ch_out: usize,
    ch_in: usize,
    ksize: usize,
    data: Vec<i64>,
}

impl Kernel {
    /// Build from raw values in `(ch_out, ch_in, k, k)` order.
    ///
    /// # Errors
    ///
    /// Returns [`GoldenError::Shape`] on an element-count mismatch.
    pub fn from_raw(
        format: FixedPointFormat,
        ch_out: usize,
        ch_in: usize,
        ksize: usize,
        data: Vec<i64>,
    ) -> Result<Self> {
        if data.len() != ch_out * ch_in * ksize * ksize {
            return Err(GoldenError::shape(format!(
                "{} weights for {ch_out}x{ch_in}x{ksize}x{ksize} kernel",
                data.len()
            )));
        }
        Ok(Self {
            format,
            ch_out,
            ch_in,
            ksize,
            data,
        })
    }

    /// Build by quantizing real weights.
    ///
    /// # Errors
    ///
    /// Returns [`GoldenError::Shape`] on an element-count mismatch.
    pub fn from_reals(
        format: FixedPointFormat,
        ch_out: usize,
        ch_in: usize,
        ksize: usize,
        reals: &[f64],
    ) -> Result<Self> {
        let data = reals
            .iter()
            .map(|&r| FixedValue::quantize(r, format).raw())
            .collect();
        Self::from_raw(format, ch_out, ch_in, ksize, data)
    }

    /// Weight format
    pub const fn format(&self) -> FixedPointFormat {
        self.format
    }

    /// Output channel count
    pub const fn ch_out(&self) -> usize {
        self.ch_out
    }

    /// Input channel count
    pub const fn ch_in(&self) -> usize {
        self.ch_in
    }

    /// Kernel edge length
    pub const fn ksize(&self) -> usize {
        self.ksize
    }

    /// Raw weight at `(ch_out, ch_in, krow, kcol)`
    pub fn get(&self, co: usize, ci: usize, kr: usize, kc: usize) -> i64 {
        self.data[((co * self.ch_in + ci) * self.ksize + kr) * self.ksize + kc]
    }

    /// Raw storage in `(ch_out, ch_in, k, k)` order
    pub fn as_raw(&self) -> &[i64] {
        &self.data
    }

    /// Weight at `(ch_out, ch_in, krow, kcol)` as a [`FixedValue`]
    pub fn value(&self, co: usize, ci: usize, kr: usize, kc: usize) -> FixedValue {
        FixedValue::from_raw_saturating(self.get(co, ci, kr, kc), self.format)
    }
}

/// Output extent of a windowed operation: positions where the full kernel
/// fits, `floor((extent - ksize) / stride) + 1`.
///
/// Returns `None` when the kernel is larger than the input.
pub fn output_extent(extent: usize, ksize: usize, stride: usize) -> Option<usize> {
    if ksize == 0 || stride == 0 || ksize > extent {
        return None;
    }
    Some((extent - ksize) / stride + 1)
}

fn windowed_shape(input: &Tensor, ksize: usize, stride: usize) -> Result<(usize, usize)> {
    let h = output_extent(input.height(), ksize, stride).ok_or_else(|| {
        GoldenError::shape(format!(
            "kernel {ksize} with stride {stride} does not fit height {}",
            input.height()
        ))
    })?;
    let w = output_extent(input.width(), ksize, stride).ok_or_else(|| {
        GoldenError::shape(format!(
            "kernel {ksize} with stride {stride} does not fit width {}",
            input.width()
        ))
    })?;
    Ok((h, w))
}

/// Convolution layer.
///
/// For every valid output position and output channel: multiply-accumulate
/// over the full receptive field at full precision, add the bias, then
/// quantize once (round half even, saturate) to `out_format`. No implicit
/// padding; apply [`zero_pad`] first if the stage pads.
///
/// # Errors
///
/// Returns [`GoldenError::Shape`] if input channels don't match the kernel,
/// the bias length doesn't match `ch_out`, or the kernel doesn't fit.
pub fn conv(
    input: &Tensor,
    weights: &Kernel,
    bias: &[FixedValue],
    stride: usize,
    out_format: FixedPointFormat,
) -> Result<Tensor> {
    if input.channels() != weights.ch_in() {
        return Err(GoldenError::shape(format!(
            "input channels don't fit: {} != {}",
            input.channels(),
            weights.ch_in()
        )));
    }
    if bias.len() != weights.ch_out() {
        return Err(GoldenError::shape(format!(
            "output channels don't fit bias: {} != {}",
            weights.ch_out(),
            bias.len()
        )));
    }
    let ksize = weights.ksize();
    let (out_h, out_w) = windowed_shape(input, ksize, stride)?;

    // Products carry frac_data + frac_weight fractional bits; the bias is
    // aligned into the same scale so the whole MAC is exact before the one
    // requantize per output element.
    let prod_frac = input.format().frac_bits() + weights.format().frac_bits();
    let mut out = Tensor::zeros(out_format, weights.ch_out(), out_h, out_w);
    for co in 0..weights.ch_out() {
        let bias_frac = bias[co].format().frac_bits();
        let acc_frac = prod_frac.max(bias_frac);
        let bias_aligned = i128::from(bias[co].raw()) << (acc_frac - bias_frac);
        for row_out in 0..out_h {
            let row_in = row_out * stride;
            for col_out in 0..out_w {
                let col_in = col_out * stride;
                let mut acc = 0_i128;
                for ci in 0..weights.ch_in() {
                    for kr in 0..ksize {
                        for kc in 0..ksize {
                            let d = i128::from(input.get(ci, row_in + kr, col_in + kc));
                            let w = i128::from(weights.get(co, ci, kr, kc));
                            acc += d * w;
                        }
                    }
                }
                let acc = (acc << (acc_frac - prod_frac)) + bias_aligned;
                out.set(co, row_out, col_out, requantize_raw(acc, acc_frac, out_format));
            }
        }
    }
    Ok(out)
}

/// Local maximum pooling.
///
/// Per-channel window maximum with the same valid-window rule as [`conv`].
/// The maximum of already-quantized values is exact, so the output keeps the
/// input format and no rounding happens.
///
/// # Errors
///
/// Returns [`GoldenError::Shape`] if the window doesn't fit.
pub fn max_pool(input: &Tensor, ksize: usize, stride: usize) -> Result<Tensor> {
    let (out_h, out_w) = windowed_shape(input, ksize, stride)?;
    let mut out = Tensor::zeros(input.format(), input.channels(), out_h, out_w);
    for ch in 0..input.channels() {
        for row_out in 0..out_h {
            let row_in = row_out * stride;
            for col_out in 0..out_w {
                let col_in = col_out * stride;
                let mut best = i64::MIN;
                for kr in 0..ksize {
                    for kc in 0..ksize {
                        best = best.max(input.get(ch, row_in + kr, col_in + kc));
                    }
                }
                out.set(ch, row_out, col_out, best);
            }
        }
    }
    Ok(out)
}

/// Fractional width of the global-average reciprocal (hardware constant).
pub const AVG_RECIPROCAL_FRAC_BITS: u32 = 16;

/// Global average pooling.
///
/// Sums each channel exactly, then multiplies by a separately quantized
/// reciprocal of `1/(W*H)` at `u1.16`. The hardware approximates the
/// average with this multiply, so an exact division here would diverge from
/// the silicon. Output is `(ch, 1, 1)` at the input format.
///
/// # Errors
///
/// Returns [`GoldenError::Shape`] for an empty spatial extent.
pub fn avg_pool_global(input: &Tensor) -> Result<Tensor> {
    let area = input.height() * input.width();
    if area == 0 {
        return Err(GoldenError::shape("average pool over empty image"));
    }
    let recip_fmt = FixedPointFormat::new(1, AVG_RECIPROCAL_FRAC_BITS, false)?;
    #[allow(clippy::cast_precision_loss)]
    let recip = FixedValue::quantize(1.0 / area as f64, recip_fmt);

    let acc_frac = input.format().frac_bits() + recip_fmt.frac_bits();
    let mut out = Tensor::zeros(input.format(), input.channels(), 1, 1);
    for ch in 0..input.channels() {
        let mut sum = 0_i128;
        for row in 0..input.height() {
            for col in 0..input.width() {
                sum += i128::from(input.get(ch, row, col));
            }
        }
        let scaled = sum * i128::from(recip.raw());
        out.set(ch, 0, 0, requantize_raw(scaled, acc_frac, input.format()));
    }
    Ok(out)
}

/// Rectified linear unit: `max(x, 0)` elementwise, exact.
pub fn relu(input: &Tensor) -> Tensor {
    let mut out = input.clone();
    for ch in 0..input.channels() {
        for row in 0..input.height() {
            for col in 0..input.width() {
                out.set(ch, row, col, input.get(ch, row, col).max(0));
            }
        }
    }
    out
}

/// Slope constant for [`leaky_relu`]: 0.125 at `u1.3` (power of two).
///
/// # Errors
///
/// Infallible in practice; the format literal is valid.
pub fn default_leaky_alpha() -> Result<FixedValue> {
    let fmt = FixedPointFormat::new(1, 3, false)?;
    Ok(FixedValue::quantize(0.125, fmt))
}

/// Leaky rectified linear unit.
///
/// Negative values are scaled by `alpha` and requantized once at the input
/// format; positive values pass through untouched (already in range).
pub fn leaky_relu(input: &Tensor, alpha: FixedValue) -> Tensor {
    let fmt = input.format();
    let prod_frac = fmt.frac_bits() + alpha.format().frac_bits();
    let mut out = input.clone();
    for ch in 0..input.channels() {
        for row in 0..input.height() {
            for col in 0..input.width() {
                let v = input.get(ch, row, col);
                if v < 0 {
                    let scaled = i128::from(v) * i128::from(alpha.raw());
                    out.set(ch, row, col, requantize_raw(scaled, prod_frac, fmt));
                }
            }
        }
    }
    out
}

/// Zero padding: `size` zero rows/columns on all four spatial edges, same
/// format as the input.
pub fn zero_pad(input: &Tensor, size: usize) -> Tensor {
    let mut out = Tensor::zeros(
        input.format(),
        input.channels(),
        input.height() + 2 * size,
        input.width() + 2 * size,
    );
    for ch in 0..input.channels() {
        for row in 0..input.height() {
            for col in 0..input.width() {
                out.set(ch, row + size, col + size, input.get(ch, row, col));
            }
        }
    }
    out
}

/// Full-width MAC result format of the hardware convolution unit.
///
/// The adder tree grows the integer part by `2 * ceil(log2(k*k - 1)) + 1`
/// bits over the product width; fractional bits are the sum of the operand
/// fractions. Per-module convolution tests monitor the DUT at this format
/// before the stage's output requantize.
///
/// # Errors
///
/// Returns [`GoldenError::Format`] if the accumulated width exceeds 63 bits.
pub fn macc_output_format(
    data: FixedPointFormat,
    weight: FixedPointFormat,
    ksize: usize,
) -> Result<FixedPointFormat> {
    let taps = ksize * ksize;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let growth = if taps > 1 {
        ((taps - 1) as f64).log2().ceil() as u32
    } else {
        0
    };
    let int_bits = data.int_bits() + weight.int_bits() + 2 * growth + 1;
    let frac_bits = data.frac_bits() + weight.frac_bits();
    Ok(FixedPointFormat::new(int_bits, frac_bits, true)?)
}
