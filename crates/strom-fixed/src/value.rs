//! Quantized values and single-rounding arithmetic

use crate::format::{FixedPointFormat, FormatError, Result};

/// A real number materialized at a [`FixedPointFormat`].
///
/// Stores the quantized raw integer, not the original real: the value is
/// `raw * 2^-frac_bits`. Two values are only combinable through [`add`] and
/// [`mul`], which take an explicit output format and round exactly once,
/// matching the single rounding point of the hardware's arithmetic units.
///
/// [`add`]: FixedValue::add
/// [`mul`]: FixedValue::mul
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedValue {
    raw: i64,
    format: FixedPointFormat,
}

impl FixedValue {
    /// Quantize a real number: round to nearest (ties to even) at the
    /// format's resolution, then saturate to the representable range.
    ///
    /// Out-of-range input is not an error; saturation is the defined
    /// behavior. NaN quantizes to zero.
    pub fn quantize(real: f64, format: FixedPointFormat) -> Self {
        let scaled = real * f64::from(format.frac_bits()).exp2();
        let rounded = if scaled.is_nan() {
            0.0
        } else {
            scaled.round_ties_even()
        };
        // The float-to-int cast saturates; clamp in the integer domain
        // because wide-format bounds are not exactly representable in f64.
        #[allow(clippy::cast_possible_truncation)]
        let raw = (rounded as i64).clamp(format.min_raw(), format.max_raw());
        Self { raw, format }
    }

    /// Zero at the given format (always raw bits `0`)
    pub const fn zero(format: FixedPointFormat) -> Self {
        Self { raw: 0, format }
    }

    /// Construct from an in-range raw integer, saturating if needed.
    pub fn from_raw_saturating(raw: i64, format: FixedPointFormat) -> Self {
        Self {
            raw: raw.clamp(format.min_raw(), format.max_raw()),
            format,
        }
    }

    /// Decode a register bit pattern.
    ///
    /// The pattern is interpreted as two's complement for signed formats.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::RawOutOfRange`] if `bits` is wider than the
    /// format's register.
    pub fn from_raw_bits(bits: u64, format: FixedPointFormat) -> Result<Self> {
        if bits > format.mask() {
            return Err(FormatError::RawOutOfRange {
                bits,
                total_bits: format.total_bits(),
            });
        }
        #[allow(clippy::cast_possible_wrap)]
        let raw = if format.signed() && bits >> (format.total_bits() - 1) == 1 {
            bits as i64 - (1_i64 << format.total_bits())
        } else {
            bits as i64
        };
        Ok(Self { raw, format })
    }

    /// Two's-complement register encoding, masked to the format width.
    ///
    /// Exactly inverse to [`FixedValue::from_raw_bits`].
    #[allow(clippy::cast_sign_loss)]
    pub const fn to_raw_bits(&self) -> u64 {
        (self.raw as u64) & self.format.mask()
    }

    /// The quantized raw integer (value is `raw * 2^-frac_bits`)
    pub const fn raw(&self) -> i64 {
        self.raw
    }

    /// The format this value is materialized at
    pub const fn format(&self) -> FixedPointFormat {
        self.format
    }

    /// The exact real value represented
    pub fn to_f64(&self) -> f64 {
        self.raw as f64 * self.format.resolution()
    }

    /// Whether the value is strictly negative
    pub const fn is_negative(&self) -> bool {
        self.raw < 0
    }

    /// Binary register string, MSB first (the weight-file encoding)
    pub fn to_binary_string(&self) -> String {
        let width = self.format.total_bits() as usize;
        format!("{:0width$b}", self.to_raw_bits())
    }

    /// Sum at a caller-specified output format.
    ///
    /// Computed at full precision, then quantized once (round half to even,
    /// saturate) at `out`, never rounded twice.
    pub fn add(&self, other: &Self, out: FixedPointFormat) -> Self {
        let frac = self.format.frac_bits().max(other.format.frac_bits());
        let a = i128::from(self.raw) << (frac - self.format.frac_bits());
        let b = i128::from(other.raw) << (frac - other.format.frac_bits());
        Self {
            raw: requantize_raw(a + b, frac, out),
            format: out,
        }
    }

    /// Product at a caller-specified output format, single rounding.
    pub fn mul(&self, other: &Self, out: FixedPointFormat) -> Self {
        let prod = i128::from(self.raw) * i128::from(other.raw);
        let frac = self.format.frac_bits() + other.format.frac_bits();
        Self {
            raw: requantize_raw(prod, frac, out),
            format: out,
        }
    }
}

impl std::fmt::Display for FixedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.to_f64(), self.format)
    }
}

/// Requantize a full-precision accumulator to an output format.
///
/// `acc` carries `frac_in` fractional bits. The result is rounded to nearest
/// (ties to even) at `out.frac_bits()` and saturated to `out`'s range. This
/// is the one rounding point shared by every arithmetic path in the golden
/// model.
#[allow(clippy::cast_possible_truncation)]
pub fn requantize_raw(acc: i128, frac_in: u32, out: FixedPointFormat) -> i64 {
    let shift = i64::from(frac_in) - i64::from(out.frac_bits());
    let scaled = if shift <= 0 {
        acc << (-shift)
    } else {
        // Arithmetic shift floors, leaving a non-negative remainder; round
        // half to even on the discarded bits.
        let div = 1_i128 << shift;
        let half = div >> 1;
        let q = acc >> shift;
        let r = acc - (q << shift);
        match r.cmp(&half) {
            std::cmp::Ordering::Less => q,
            std::cmp::Ordering::Greater => q + 1,
            std::cmp::Ordering::Equal => {
                if q & 1 == 0 {
                    q
                } else {
                    q + 1
                }
            }
        }
    };
    scaled
        .clamp(i128::from(out.min_raw()), i128::from(out.max_raw())) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s4_4() -> FixedPointFormat {
        FixedPointFormat::new(4, 4, true).unwrap()
    }

    fn u4_4() -> FixedPointFormat {
        FixedPointFormat::new(4, 4, false).unwrap()
    }

    #[test]
    fn ties_round_to_even() {
        // Mirrors python3 banker's rounding at 0 fractional bits.
        let fmt = FixedPointFormat::new(8, 0, true).unwrap();
        assert_eq!(FixedValue::quantize(-1.5, fmt).raw(), -2);
        assert_eq!(FixedValue::quantize(-0.5, fmt).raw(), 0);
        assert_eq!(FixedValue::quantize(0.5, fmt).raw(), 0);
        assert_eq!(FixedValue::quantize(1.5, fmt).raw(), 2);
        assert_eq!(FixedValue::quantize(2.5, fmt).raw(), 2);
    }

    #[test]
    fn saturates_instead_of_wrapping() {
        assert_eq!(FixedValue::quantize(100.0, s4_4()).to_f64(), 7.9375);
        assert_eq!(FixedValue::quantize(-100.0, s4_4()).to_f64(), -8.0);
        assert_eq!(FixedValue::quantize(-1.0, u4_4()).raw(), 0);
        assert_eq!(FixedValue::quantize(100.0, u4_4()).to_f64(), 15.9375);
    }

    #[test]
    fn saturation_is_exact_at_wide_formats() {
        // 63-bit register: max_raw (2^62 - 1) rounds up as f64, so a
        // float-domain clamp would land one raw step out of range.
        let fmt = FixedPointFormat::new(32, 31, true).unwrap();
        assert_eq!(FixedValue::quantize(f64::MAX, fmt).raw(), fmt.max_raw());
        assert_eq!(FixedValue::quantize(-f64::MAX, fmt).raw(), fmt.min_raw());
        assert_eq!(FixedValue::quantize(fmt.max_value(), fmt).raw(), fmt.max_raw());
    }

    #[test]
    fn negative_zero_normalizes() {
        let v = FixedValue::quantize(-0.0, s4_4());
        assert_eq!(v.raw(), 0);
        assert_eq!(v.to_raw_bits(), 0);
    }

    #[test]
    fn raw_bits_roundtrip() {
        for bits in 0..=255_u64 {
            let v = FixedValue::from_raw_bits(bits, s4_4()).unwrap();
            assert_eq!(v.to_raw_bits(), bits);
            let back = FixedValue::from_raw_bits(v.to_raw_bits(), s4_4()).unwrap();
            assert_eq!(back, v);
        }
    }

    #[test]
    fn twos_complement_decode() {
        // fixedint2ffloat(255, 4, 4) == -0.0625
        let v = FixedValue::from_raw_bits(255, s4_4()).unwrap();
        assert_eq!(v.raw(), -1);
        assert!((v.to_f64() - -0.0625).abs() < f64::EPSILON);
    }

    #[test]
    fn oversized_raw_bits_rejected() {
        assert!(matches!(
            FixedValue::from_raw_bits(256, s4_4()),
            Err(FormatError::RawOutOfRange { .. })
        ));
    }

    #[test]
    fn quantize_roundtrip_through_bits() {
        let fmt = FixedPointFormat::new(6, 2, true).unwrap();
        for i in -32..32 {
            let q = FixedValue::quantize(f64::from(i) * 0.3, fmt);
            let rt = FixedValue::from_raw_bits(q.to_raw_bits(), fmt).unwrap();
            assert_eq!(rt, q);
        }
    }

    #[test]
    fn mul_rounds_once() {
        // 0.1875 * 0.1875 = 0.03515625; one rounding to frac 4 gives 0.0625's
        // neighbour 0.03125 (raw 0.5625 -> ties-to-even at raw grid).
        let a = FixedValue::quantize(0.1875, s4_4());
        let p = a.mul(&a, s4_4());
        // full precision raw: 3 * 3 = 9 at frac 8; requantize to frac 4:
        // 9/16 = 0.5625 -> rounds to 1 (0.0625)
        assert_eq!(p.raw(), 1);
    }

    #[test]
    fn add_aligns_fractions() {
        let a = FixedValue::quantize(1.5, s4_4());
        let b = FixedValue::quantize(0.25, FixedPointFormat::new(2, 6, true).unwrap());
        let s = a.add(&b, s4_4());
        assert!((s.to_f64() - 1.75).abs() < f64::EPSILON);
    }

    #[test]
    fn add_saturates_at_output_format() {
        let a = FixedValue::quantize(7.0, s4_4());
        let s = a.add(&a, s4_4());
        assert_eq!(s.to_f64(), 7.9375);
    }

    #[test]
    fn requantize_half_even_negative() {
        let out = FixedPointFormat::new(8, 0, true).unwrap();
        // -1.5 at frac 1 -> -2 ; -0.5 -> 0
        assert_eq!(requantize_raw(-3, 1, out), -2);
        assert_eq!(requantize_raw(-1, 1, out), 0);
        assert_eq!(requantize_raw(1, 1, out), 0);
        assert_eq!(requantize_raw(3, 1, out), 2);
    }

    #[test]
    fn requantize_widens_exactly() {
        let out = FixedPointFormat::new(4, 8, true).unwrap();
        assert_eq!(requantize_raw(3, 4, out), 48);
    }

    #[test]
    fn pure_fraction_reciprocal() {
        // The global-average reciprocal format.
        let fmt = FixedPointFormat::new(1, 16, false).unwrap();
        let r = FixedValue::quantize(1.0 / 36.0, fmt);
        assert_eq!(r.raw(), 1820); // round(65536/36) = 1820.44 -> 1820
    }
}
