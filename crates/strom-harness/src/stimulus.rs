// SPDX-License-Identifier: AGPL-3.0-only
//! Reproducible stimulus generation.
//!
//! The generator is an explicit value passed into whatever needs randomness;
//! two benches built from the same seed produce identical stimulus no matter
//! what else runs in the process.

use crate::error::{HarnessError, Result};
use bytes::{BufMut, Bytes, BytesMut};
use strom_fixed::{FixedPointFormat, FixedValue};
use strom_golden::{Kernel, Tensor};

/// xoshiro256++, seeded deterministically. Not cryptographic.
#[derive(Debug, Clone)]
pub struct Xoshiro {
    s: [u64; 4],
}

impl Xoshiro {
    /// Seed the generator; equal seeds give equal streams.
    pub fn new(seed: u64) -> Self {
        let s = [
            seed ^ 0x9e37_79b9_7f4a_7c15,
            seed.wrapping_add(0x6c62_272e_07bb_0142),
            seed.rotate_left(17),
            seed.rotate_right(5),
        ];
        let mut rng = Self { s };
        for _ in 0..20 {
            let _ = rng.next_u64();
        }
        rng
    }

    /// Next 64 raw bits
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);
        let t = self.s[1].wrapping_shl(17);
        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];
        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);
        result
    }

    /// Uniform in `[0, 1)`
    pub fn next_f64(&mut self) -> f64 {
        let bits = (self.next_u64() >> 12) | 0x3ff0_0000_0000_0000;
        f64::from_bits(bits) - 1.0
    }

    /// Uniform raw value across the format's full representable range
    pub fn next_raw(&mut self, format: FixedPointFormat) -> i64 {
        // The raw span is 2^total_bits, which fits u64 but not i64 at the
        // 63-bit register width.
        let span = format.mask() + 1;
        #[allow(clippy::cast_possible_wrap)]
        let offset = (self.next_u64() % span) as i64;
        format.min_raw() + offset
    }
}

/// Random tensor with every element uniform over the format's range.
///
/// # Errors
///
/// Propagates tensor construction errors (shape only; values are in range
/// by construction).
pub fn random_tensor(
    rng: &mut Xoshiro,
    format: FixedPointFormat,
    channels: usize,
    height: usize,
    width: usize,
) -> Result<Tensor> {
    let data = (0..channels * height * width)
        .map(|_| rng.next_raw(format))
        .collect();
    Ok(Tensor::from_raw(format, channels, height, width, data)?)
}

/// Random kernel with every weight uniform over the format's range.
///
/// # Errors
///
/// Propagates kernel construction errors.
pub fn random_kernel(
    rng: &mut Xoshiro,
    format: FixedPointFormat,
    ch_out: usize,
    ch_in: usize,
    ksize: usize,
) -> Result<Kernel> {
    let data = (0..ch_out * ch_in * ksize * ksize)
        .map(|_| rng.next_raw(format))
        .collect();
    Ok(Kernel::from_raw(format, ch_out, ch_in, ksize, data)?)
}

/// Random bias vector, one value per output channel
pub fn random_bias(rng: &mut Xoshiro, format: FixedPointFormat, ch_out: usize) -> Vec<FixedValue> {
    (0..ch_out)
        .map(|_| FixedValue::from_raw_saturating(rng.next_raw(format), format))
        .collect()
}

/// Pre-encoded input word stream for one run.
///
/// Words are the unsigned bus encodings of the tensor's values in streaming
/// order; the driver feeds them to `in_data` one per transfer.
#[derive(Debug, Clone)]
pub struct Stimulus {
    words: Vec<u64>,
    word_bits: u32,
}

impl Stimulus {
    /// Encode a tensor in streaming order.
    pub fn from_tensor(tensor: &Tensor) -> Self {
        let format = tensor.format();
        let words = tensor
            .to_stream()
            .into_iter()
            .map(|raw| FixedValue::from_raw_saturating(raw, format).to_raw_bits())
            .collect();
        Self {
            words,
            word_bits: format.total_bits(),
        }
    }

    /// Rebuild from a packed big-endian byte capture, 8 bytes per word.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::TruncatedStimulus`] when the blob length is
    /// not a whole number of words; a silently dropped tail would shorten
    /// the drive sequence.
    pub fn from_bytes(bytes: &Bytes, word_bits: u32) -> Result<Self> {
        if bytes.len() % 8 != 0 {
            return Err(HarnessError::TruncatedStimulus { len: bytes.len() });
        }
        let words = bytes
            .chunks_exact(8)
            .map(|c| {
                let mut w = [0_u8; 8];
                w.copy_from_slice(c);
                u64::from_be_bytes(w)
            })
            .collect();
        Ok(Self { words, word_bits })
    }

    /// Pack into bytes, 8 big-endian bytes per word.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.words.len() * 8);
        for &w in &self.words {
            buf.put_u64(w);
        }
        buf.freeze()
    }

    /// Encoded words in drive order
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Bus width of each word
    pub const fn word_bits(&self) -> u32 {
        self.word_bits
    }

    /// Number of words
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the stimulus is empty
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
