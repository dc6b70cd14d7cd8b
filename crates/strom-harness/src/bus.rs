//! Typed signal storage shared by every task in a simulation.
//!
//! Signals are plain integers sampled at rising clock edges; the harness
//! never models sub-cycle timing. Each signal is registered once with a
//! name and a width, then addressed by the cheap copyable [`SignalId`].

use crate::error::{HarnessError, Result};

/// Handle to one registered signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalId(usize);

#[derive(Debug)]
struct Signal {
    name: String,
    bits: u32,
    value: u64,
}

/// All signal state of one simulation.
///
/// Reads are always allowed; writes check the declared width so a driver
/// bug shows up at the offending edge instead of as a silent truncation.
#[derive(Debug, Default)]
pub struct SignalBus {
    signals: Vec<Signal>,
}

impl SignalBus {
    /// Empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a signal, initial value `0`.
    pub fn register(&mut self, name: impl Into<String>, bits: u32) -> SignalId {
        let id = SignalId(self.signals.len());
        self.signals.push(Signal {
            name: name.into(),
            bits,
            value: 0,
        });
        id
    }

    /// Look up a signal by name.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::UnknownSignal`] if nothing registered it.
    pub fn lookup(&self, name: &str) -> Result<SignalId> {
        self.signals
            .iter()
            .position(|s| s.name == name)
            .map(SignalId)
            .ok_or_else(|| HarnessError::unknown_signal(name))
    }

    /// Current value
    pub fn get(&self, id: SignalId) -> u64 {
        self.signals[id.0].value
    }

    /// Current value interpreted as a boolean (nonzero = asserted)
    pub fn is_high(&self, id: SignalId) -> bool {
        self.get(id) != 0
    }

    /// Drive a new value, effective immediately.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::WidthExceeded`] when the value does not fit
    /// the signal's declared width.
    pub fn set(&mut self, id: SignalId, value: u64) -> Result<()> {
        let s = &mut self.signals[id.0];
        let mask = if s.bits >= 64 {
            u64::MAX
        } else {
            (1_u64 << s.bits) - 1
        };
        if value > mask {
            return Err(HarnessError::WidthExceeded {
                name: s.name.clone(),
                bits: s.bits,
                value,
            });
        }
        s.value = value;
        Ok(())
    }

    /// Declared width of a signal
    pub fn width(&self, id: SignalId) -> u32 {
        self.signals[id.0].bits
    }
}

/// The accelerator's standard port set, registered as one group.
///
/// Handshake protocol: input words transfer when `in_valid` is high at a
/// rising edge; output words transfer when `out_valid && out_ready`; the
/// DUT raises `finish` after its last output word.
#[derive(Debug, Clone, Copy)]
pub struct DutPorts {
    /// Active-low reset
    pub rst_n: SignalId,
    /// Clock enable
    pub ce: SignalId,
    /// Start-of-frame pulse
    pub start: SignalId,
    /// Input handshake valid
    pub in_valid: SignalId,
    /// Input data word
    pub in_data: SignalId,
    /// Output handshake valid
    pub out_valid: SignalId,
    /// Output handshake ready (driven by the consumer)
    pub out_ready: SignalId,
    /// Output data word
    pub out_data: SignalId,
    /// End-of-run flag
    pub finish: SignalId,
}

impl DutPorts {
    /// Register the standard port set on a bus.
    ///
    /// `in_bits`/`out_bits` are the data word widths from the test
    /// configuration; all control signals are single bits.
    pub fn attach(bus: &mut SignalBus, in_bits: u32, out_bits: u32) -> Self {
        Self {
            rst_n: bus.register("rst_n", 1),
            ce: bus.register("ce", 1),
            start: bus.register("start", 1),
            in_valid: bus.register("in_valid", 1),
            in_data: bus.register("in_data", in_bits),
            out_valid: bus.register("out_valid", 1),
            out_ready: bus.register("out_ready", 1),
            out_data: bus.register("out_data", out_bits),
            finish: bus.register("finish", 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_checked_on_set() {
        let mut bus = SignalBus::new();
        let s = bus.register("data", 8);
        assert!(bus.set(s, 255).is_ok());
        assert!(matches!(
            bus.set(s, 256),
            Err(HarnessError::WidthExceeded { bits: 8, .. })
        ));
        // Rejected write leaves the old value in place.
        assert_eq!(bus.get(s), 255);
    }

    #[test]
    fn lookup_by_name() {
        let mut bus = SignalBus::new();
        let a = bus.register("a", 1);
        assert_eq!(bus.lookup("a").unwrap(), a);
        assert!(bus.lookup("b").is_err());
    }

    #[test]
    fn ports_attach_with_configured_widths() {
        let mut bus = SignalBus::new();
        let ports = DutPorts::attach(&mut bus, 8, 12);
        assert_eq!(bus.width(ports.in_data), 8);
        assert_eq!(bus.width(ports.out_data), 12);
        assert_eq!(bus.width(ports.finish), 1);
        assert!(!bus.is_high(ports.rst_n));
    }

    #[test]
    fn wide_signal_accepts_full_range() {
        let mut bus = SignalBus::new();
        let s = bus.register("wide", 64);
        assert!(bus.set(s, u64::MAX).is_ok());
    }
}
