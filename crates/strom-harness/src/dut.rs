// SPDX-License-Identifier: AGPL-3.0-only
//! Behavioral device-under-test and its stimulus driver.
//!
//! The behavioral DUT streams the golden model's own predictions back over
//! the bus with realistic handshake timing. It exists to exercise the
//! harness itself: a healthy instance must always pass verification, and a
//! fault-injected one must always fail it in the expected way. An RTL
//! co-simulation would replace this task while keeping every other harness
//! piece unchanged.

use crate::bus::{DutPorts, SignalBus};
use crate::error::Result;
use crate::sim::{SimTask, Wake};
use crate::stimulus::Stimulus;
use strom_fixed::FixedValue;
use strom_golden::{GoldenModel, Tensor};
use tracing::debug;

/// Output corruption applied by a deliberately broken DUT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultInjection {
    /// Healthy device
    None,
    /// XOR one output word with a mask
    CorruptWord {
        /// Output word index to corrupt
        index: usize,
        /// Bits to flip
        xor: u64,
    },
    /// Emit nothing at all, then finish
    DropAll,
}

/// Reset edges the driver holds `rst_n` low
const RESET_EDGES: u64 = 4;

/// Drives reset, clock-enable, start and the input word stream.
///
/// Protocol: `rst_n` low for four edges, then `ce` and `out_ready` high,
/// a one-edge `start` pulse, then one input word per edge with an optional
/// idle gap every `gap_every` words to exercise the handshake.
pub struct StimulusDriver {
    ports: DutPorts,
    stimulus: Stimulus,
    gap_every: usize,
    sent: usize,
    started: bool,
    in_gap: bool,
}

impl StimulusDriver {
    /// Driver for one pre-encoded stimulus; `gap_every == 0` streams without
    /// idle gaps.
    pub fn new(ports: DutPorts, stimulus: Stimulus, gap_every: usize) -> Self {
        Self {
            ports,
            stimulus,
            gap_every,
            sent: 0,
            started: false,
            in_gap: false,
        }
    }
}

impl SimTask for StimulusDriver {
    fn resume(&mut self, edge: u64, bus: &mut SignalBus) -> Result<Wake> {
        let p = self.ports;
        if edge < RESET_EDGES {
            bus.set(p.rst_n, 0)?;
            bus.set(p.ce, 0)?;
            bus.set(p.in_valid, 0)?;
            bus.set(p.start, 0)?;
            bus.set(p.out_ready, 0)?;
            return Ok(Wake::AfterEdges(RESET_EDGES - edge));
        }
        bus.set(p.rst_n, 1)?;
        bus.set(p.ce, 1)?;
        bus.set(p.out_ready, 1)?;
        if !self.started {
            self.started = true;
            bus.set(p.start, 1)?;
            return Ok(Wake::AfterEdges(1));
        }
        bus.set(p.start, 0)?;

        if self.sent == self.stimulus.len() {
            bus.set(p.in_valid, 0)?;
            debug!(words = self.sent, "stimulus fully driven");
            return Ok(Wake::Done);
        }
        // Idle gap: deassert valid for one edge between word groups.
        if self.gap_every != 0
            && !self.in_gap
            && self.sent != 0
            && self.sent % self.gap_every == 0
        {
            self.in_gap = true;
            bus.set(p.in_valid, 0)?;
            return Ok(Wake::AfterEdges(1));
        }
        self.in_gap = false;
        bus.set(p.in_valid, 1)?;
        bus.set(p.in_data, self.stimulus.words()[self.sent])?;
        self.sent += 1;
        Ok(Wake::AfterEdges(1))
    }
}

/// Behavioral streaming CNN accelerator.
///
/// Consumes the full input frame, waits a fixed pipeline latency, then
/// emits one output word per edge while `out_ready` is high, and finally
/// raises `finish`.
pub struct StreamingCnnDut {
    ports: DutPorts,
    outputs: Vec<u64>,
    inputs_expected: usize,
    latency: u64,
    fault: FaultInjection,
    received: usize,
    emitted: usize,
    drained_at: Option<u64>,
}

impl StreamingCnnDut {
    /// DUT emitting the given pre-encoded output words after consuming
    /// `inputs_expected` input words plus `latency` edges.
    pub fn new(
        ports: DutPorts,
        outputs: Vec<u64>,
        inputs_expected: usize,
        latency: u64,
        fault: FaultInjection,
    ) -> Self {
        let outputs = match fault {
            FaultInjection::None => outputs,
            FaultInjection::CorruptWord { index, xor } => {
                let mut o = outputs;
                if let Some(w) = o.get_mut(index) {
                    *w ^= xor;
                }
                o
            }
            FaultInjection::DropAll => Vec::new(),
        };
        Self {
            ports,
            outputs,
            inputs_expected,
            latency,
            fault,
            received: 0,
            emitted: 0,
            drained_at: None,
        }
    }

    /// Healthy DUT computing its outputs from the golden model itself.
    ///
    /// # Errors
    ///
    /// Propagates golden-model evaluation errors.
    pub fn from_model(
        ports: DutPorts,
        model: &GoldenModel,
        input: &Tensor,
        latency: u64,
        fault: FaultInjection,
    ) -> Result<Self> {
        let seq = model.expected_sequence(input)?;
        let fmt = seq.format();
        let outputs = seq
            .as_slice()
            .iter()
            .map(|&raw| FixedValue::from_raw_saturating(raw, fmt).to_raw_bits())
            .collect();
        Ok(Self::new(ports, outputs, input.len(), latency, fault))
    }
}

impl SimTask for StreamingCnnDut {
    fn resume(&mut self, edge: u64, bus: &mut SignalBus) -> Result<Wake> {
        let p = self.ports;
        if !bus.is_high(p.rst_n) {
            self.received = 0;
            self.emitted = 0;
            self.drained_at = None;
            bus.set(p.out_valid, 0)?;
            bus.set(p.finish, 0)?;
            return Ok(Wake::AfterEdges(1));
        }
        if !bus.is_high(p.ce) {
            return Ok(Wake::AfterEdges(1));
        }
        if bus.is_high(p.in_valid) {
            self.received += 1;
        }
        if self.received == self.inputs_expected && self.drained_at.is_none() {
            self.drained_at = Some(edge);
            debug!(edge, words = self.received, "input frame complete");
        }

        let ready_to_emit = self
            .drained_at
            .is_some_and(|at| edge >= at + self.latency);
        if ready_to_emit && self.emitted < self.outputs.len() {
            if bus.is_high(p.out_ready) {
                bus.set(p.out_valid, 1)?;
                bus.set(p.out_data, self.outputs[self.emitted])?;
                self.emitted += 1;
            } else {
                bus.set(p.out_valid, 0)?;
            }
            return Ok(Wake::AfterEdges(1));
        }
        bus.set(p.out_valid, 0)?;
        if ready_to_emit && self.emitted == self.outputs.len() {
            bus.set(p.finish, 1)?;
            debug!(edge, words = self.emitted, fault = ?self.fault, "run finished");
            return Ok(Wake::Done);
        }
        Ok(Wake::AfterEdges(1))
    }
}
