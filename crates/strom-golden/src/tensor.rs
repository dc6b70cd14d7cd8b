//! Fixed-point tensors and the accelerator's streaming order

use crate::error::{GoldenError, Result};
use strom_fixed::{FixedPointFormat, FixedValue};

/// A `(channel, height, width)` tensor of fixed-point raw values.
///
/// All elements share one [`FixedPointFormat`]. Batch size is always 1 in
/// this accelerator and is not represented. Storage is `(ch, h, w)`
/// row-major; the hardware's streaming order is different, see
/// [`Tensor::to_stream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tensor {
    format: FixedPointFormat,
    channels: usize,
    height: usize,
    width: usize,
    data: Vec<i64>,
}

impl Tensor {
    /// All-zero tensor
    pub fn zeros(format: FixedPointFormat, channels: usize, height: usize, width: usize) -> Self {
        Self {
            format,
            channels,
            height,
            width,
            data: vec![0; channels * height * width],
        }
    }

    /// Build from raw values in `(ch, h, w)` order.
    ///
    /// # Errors
    ///
    /// Returns [`GoldenError::Shape`] if the element count does not match the
    /// dimensions, or if any raw value is outside the format's range.
    pub fn from_raw(
        format: FixedPointFormat,
        channels: usize,
        height: usize,
        width: usize,
        data: Vec<i64>,
    ) -> Result<Self> {
        if data.len() != channels * height * width {
            return Err(GoldenError::shape(format!(
                "{} elements for {channels}x{height}x{width} tensor",
                data.len()
            )));
        }
        if let Some(bad) = data
            .iter()
            .find(|&&v| v < format.min_raw() || v > format.max_raw())
        {
            return Err(GoldenError::shape(format!(
                "raw value {bad} outside {format} range"
            )));
        }
        Ok(Self {
            format,
            channels,
            height,
            width,
            data,
        })
    }

    /// Build by quantizing real values in `(ch, h, w)` order.
    ///
    /// # Errors
    ///
    /// Returns [`GoldenError::Shape`] on an element-count mismatch.
    pub fn from_reals(
        format: FixedPointFormat,
        channels: usize,
        height: usize,
        width: usize,
        reals: &[f64],
    ) -> Result<Self> {
        let data = reals
            .iter()
            .map(|&r| FixedValue::quantize(r, format).raw())
            .collect();
        Self::from_raw(format, channels, height, width, data)
    }

    /// Build from a raw 8-bit image blob, one byte per element in `(ch, h, w)`
    /// order. Camera-style stimulus enters the bench this way.
    ///
    /// # Errors
    ///
    /// Returns [`GoldenError::Shape`] on a byte-count mismatch, a signed
    /// format, or a format narrower than 8 bits.
    pub fn from_image_bytes(
        format: FixedPointFormat,
        channels: usize,
        height: usize,
        width: usize,
        bytes: &[u8],
    ) -> Result<Self> {
        if format.signed() || format.total_bits() < 8 {
            return Err(GoldenError::shape(format!(
                "image bytes need an unsigned format of at least 8 bits, got {format}"
            )));
        }
        let data = bytes.iter().map(|&b| i64::from(b)).collect();
        Self::from_raw(format, channels, height, width, data)
    }

    /// Element format
    pub const fn format(&self) -> FixedPointFormat {
        self.format
    }

    /// Channel count
    pub const fn channels(&self) -> usize {
        self.channels
    }

    /// Spatial height
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Spatial width
    pub const fn width(&self) -> usize {
        self.width
    }

    /// `(channels, height, width)` tuple
    pub const fn shape(&self) -> (usize, usize, usize) {
        (self.channels, self.height, self.width)
    }

    /// Total element count
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the tensor has no elements
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn index(&self, ch: usize, row: usize, col: usize) -> usize {
        debug_assert!(ch < self.channels && row < self.height && col < self.width);
        (ch * self.height + row) * self.width + col
    }

    /// Raw value at `(ch, row, col)`
    pub fn get(&self, ch: usize, row: usize, col: usize) -> i64 {
        self.data[self.index(ch, row, col)]
    }

    /// Overwrite the raw value at `(ch, row, col)`
    pub fn set(&mut self, ch: usize, row: usize, col: usize, raw: i64) {
        let i = self.index(ch, row, col);
        self.data[i] = raw;
    }

    /// Element as a [`FixedValue`]
    pub fn value(&self, ch: usize, row: usize, col: usize) -> FixedValue {
        FixedValue::from_raw_saturating(self.get(ch, row, col), self.format)
    }

    /// Raw storage in `(ch, h, w)` order
    pub fn as_raw(&self) -> &[i64] {
        &self.data
    }

    /// Flatten into the hardware's streaming order.
    ///
    /// The accelerator streams channel-interleaved pixels: `(h, w, ch)`
    /// flattening with the channel axis fastest, spatial positions row-major.
    /// This must stay bit-identical to the DUT's output ordering.
    pub fn to_stream(&self) -> Vec<i64> {
        let mut out = Vec::with_capacity(self.data.len());
        for row in 0..self.height {
            for col in 0..self.width {
                for ch in 0..self.channels {
                    out.push(self.get(ch, row, col));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u8_0() -> FixedPointFormat {
        FixedPointFormat::new(8, 0, false).unwrap()
    }

    #[test]
    fn element_count_checked() {
        assert!(Tensor::from_raw(u8_0(), 2, 3, 3, vec![0; 17]).is_err());
        assert!(Tensor::from_raw(u8_0(), 2, 3, 3, vec![0; 18]).is_ok());
    }

    #[test]
    fn out_of_range_raw_rejected() {
        assert!(Tensor::from_raw(u8_0(), 1, 1, 1, vec![256]).is_err());
    }

    #[test]
    fn stream_order_is_channel_fastest() {
        // 2 channels, 2x2: storage (ch,h,w), stream (h,w,ch)
        let t = Tensor::from_raw(u8_0(), 2, 2, 2, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(t.to_stream(), vec![1, 5, 2, 6, 3, 7, 4, 8]);
    }

    #[test]
    fn image_bytes_constructor() {
        let t = Tensor::from_image_bytes(u8_0(), 1, 2, 2, &[0, 128, 200, 255]).unwrap();
        assert_eq!(t.as_raw(), &[0, 128, 200, 255]);
        let signed = FixedPointFormat::new(8, 0, true).unwrap();
        assert!(Tensor::from_image_bytes(signed, 1, 2, 2, &[0; 4]).is_err());
        assert!(Tensor::from_image_bytes(u8_0(), 1, 2, 2, &[0; 3]).is_err());
    }

    #[test]
    fn quantizing_constructor() {
        let fmt = FixedPointFormat::new(4, 4, true).unwrap();
        let t = Tensor::from_reals(fmt, 1, 1, 2, &[0.5, -0.5]).unwrap();
        assert_eq!(t.get(0, 0, 0), 8);
        assert_eq!(t.get(0, 0, 1), -8);
    }
}
