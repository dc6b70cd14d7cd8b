//! Passive bus monitors.
//!
//! A monitor samples a valid/data pair in every observe phase and decodes
//! the word into one or more signed raw values. It never drives anything;
//! a monitored run and an unmonitored run are cycle-identical.

use crate::bus::{SignalBus, SignalId};
use crate::error::Result;
use strom_fixed::{FixedPointFormat, FixedValue};
use tracing::trace;

/// How one bus word maps to captured raw values.
#[derive(Debug, Clone, Copy)]
pub enum WordDecoder {
    /// Unsigned passthrough of the low `bits`
    Raw {
        /// Word width
        bits: u32,
    },
    /// One fixed-point value per word, sign-extended per the format
    Fixed {
        /// Value format
        format: FixedPointFormat,
    },
    /// `lanes` equal-width fixed-point values packed into one word,
    /// lane 0 in the least significant bits
    Split {
        /// Lane count
        lanes: u32,
        /// Per-lane format
        format: FixedPointFormat,
    },
}

impl WordDecoder {
    /// Decode one word into raw values, lane order preserved.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Format`] when a lane's bit pattern does not
    /// fit its format.
    pub fn decode(&self, word: u64) -> Result<Vec<i64>> {
        match *self {
            Self::Raw { bits } => {
                let mask = if bits >= 64 {
                    u64::MAX
                } else {
                    (1_u64 << bits) - 1
                };
                #[allow(clippy::cast_possible_wrap)]
                Ok(vec![(word & mask) as i64])
            }
            Self::Fixed { format } => Ok(vec![FixedValue::from_raw_bits(word, format)?.raw()]),
            Self::Split { lanes, format } => {
                let width = format.total_bits();
                let mask = (1_u64 << width) - 1;
                let mut out = Vec::with_capacity(lanes as usize);
                for lane in 0..lanes {
                    let bits = (word >> (lane * width)) & mask;
                    out.push(FixedValue::from_raw_bits(bits, format)?.raw());
                }
                Ok(out)
            }
        }
    }

    /// Total bits one word carries under this decoder
    pub fn word_bits(&self) -> u32 {
        match *self {
            Self::Raw { bits } => bits,
            Self::Fixed { format } => format.total_bits(),
            Self::Split { lanes, format } => lanes * format.total_bits(),
        }
    }
}

/// Everything one monitor captured over a run, in observation order.
#[derive(Debug, Clone, Default)]
pub struct CapturedSequence {
    values: Vec<i64>,
}

impl CapturedSequence {
    /// Captured raw values
    pub fn as_slice(&self) -> &[i64] {
        &self.values
    }

    /// Number of captured values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing was captured
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Valid/data observer for one interface.
#[derive(Debug)]
pub struct BusMonitor {
    name: String,
    valid: SignalId,
    data: SignalId,
    ready: Option<SignalId>,
    decoder: WordDecoder,
    captured: CapturedSequence,
}

impl BusMonitor {
    /// Monitor a valid/data pair; `ready` gates the transfer when present.
    pub fn new(
        name: impl Into<String>,
        valid: SignalId,
        data: SignalId,
        ready: Option<SignalId>,
        decoder: WordDecoder,
    ) -> Self {
        Self {
            name: name.into(),
            valid,
            data,
            ready,
            decoder,
            captured: CapturedSequence::default(),
        }
    }

    /// Interface name (scoreboard key)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sample the bus at one rising edge.
    ///
    /// A word transfers when `valid` is high and, if a ready signal is
    /// wired, `ready` is high too.
    ///
    /// # Errors
    ///
    /// Propagates decode failures; a bad bit pattern on a valid transfer is
    /// a bench wiring defect.
    pub fn sample(&mut self, bus: &SignalBus) -> Result<()> {
        if !bus.is_high(self.valid) {
            return Ok(());
        }
        if let Some(ready) = self.ready {
            if !bus.is_high(ready) {
                return Ok(());
            }
        }
        let word = bus.get(self.data);
        let values = self.decoder.decode(word)?;
        trace!(monitor = %self.name, word, count = values.len(), "transfer captured");
        self.captured.values.extend(values);
        Ok(())
    }

    /// Hand the capture to the scoreboard
    pub fn into_captured(self) -> (String, CapturedSequence) {
        (self.name, self.captured)
    }
}
