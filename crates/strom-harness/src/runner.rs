//! One-call bench composition.
//!
//! Wires the standard bench: stimulus driver, behavioral DUT, one output
//! monitor, scoreboard. Callers that need extra taps (per-stage monitors,
//! custom decoders) assemble the pieces themselves instead.

use crate::bus::{DutPorts, SignalBus};
use crate::dut::{FaultInjection, StimulusDriver, StreamingCnnDut};
use crate::error::Result;
use crate::monitor::{BusMonitor, WordDecoder};
use crate::scoreboard::{Scoreboard, VerificationReport};
use crate::sim::{SimConfig, Simulation};
use crate::stimulus::Stimulus;
use strom_golden::{GoldenModel, Tensor};
use tracing::info;

/// Knobs of one standard verification run.
#[derive(Debug, Clone, Copy)]
pub struct BenchConfig {
    /// Pipeline latency of the behavioral DUT, in edges
    pub latency: u64,
    /// Edge limit
    pub max_cycles: u64,
    /// Input idle gap period, 0 for back-to-back words
    pub gap_every: usize,
    /// Output corruption
    pub fault: FaultInjection,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            latency: 8,
            max_cycles: 100_000,
            gap_every: 0,
            fault: FaultInjection::None,
        }
    }
}

/// Run the standard bench: golden model vs behavioral DUT on one input.
///
/// Returns the passing report; a diverging run comes back as
/// [`crate::HarnessError::Verification`] with the full report inside.
///
/// # Errors
///
/// Configuration defects (shapes, formats, widths) abort immediately;
/// scoreboard divergence is returned after the full capture.
pub fn run_verification(
    model: &GoldenModel,
    input: &Tensor,
    config: &BenchConfig,
) -> Result<VerificationReport> {
    let expected = model.expected_sequence(input)?;
    let out_format = expected.format();

    let mut bus = SignalBus::new();
    let ports = DutPorts::attach(
        &mut bus,
        input.format().total_bits(),
        out_format.total_bits(),
    );
    let monitor = BusMonitor::new(
        "output",
        ports.out_valid,
        ports.out_data,
        Some(ports.out_ready),
        WordDecoder::Fixed { format: out_format },
    );

    let stimulus = Stimulus::from_tensor(input);
    let driver = StimulusDriver::new(ports, stimulus, config.gap_every);
    let dut = StreamingCnnDut::from_model(ports, model, input, config.latency, config.fault)?;

    let mut sim = Simulation::new(
        SimConfig {
            max_cycles: config.max_cycles,
        },
        bus,
    );
    sim.add_task(Box::new(driver));
    sim.add_task(Box::new(dut));
    sim.add_monitor(monitor);
    let outcome = sim.run(ports.finish)?;
    info!(?outcome, expected = expected.len(), "run complete");

    let mut scoreboard = Scoreboard::new();
    for m in sim.into_monitors() {
        let (name, captured) = m.into_captured();
        scoreboard.add_interface(name, expected.clone(), captured);
    }
    scoreboard.into_result()
}
