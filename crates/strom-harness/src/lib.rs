#![deny(unsafe_code)]

//! Cycle-synchronous verification harness for the streaming CNN accelerator
//!
//! Monitors sample the bus strictly before any task drives it on the same
//! edge, the scoreboard compares raw integers with zero tolerance, and a
//! run that captures nothing while values were expected is a failure, never
//! a silent pass.
//!
//! # Example
//!
//! ```no_run
//! use strom_harness::runner::{run_verification, BenchConfig};
//! # fn model() -> strom_golden::GoldenModel { unimplemented!() }
//! # fn input() -> strom_golden::Tensor { unimplemented!() }
//!
//! # fn main() -> strom_harness::Result<()> {
//! let report = run_verification(&model(), &input(), &BenchConfig::default())?;
//! assert!(report.passed());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod bus;
pub mod dut;
mod error;
pub mod monitor;
pub mod runner;
pub mod scoreboard;
pub mod sim;
pub mod stimulus;

pub use bus::{DutPorts, SignalBus, SignalId};
pub use dut::{FaultInjection, StimulusDriver, StreamingCnnDut};
pub use error::{HarnessError, Result};
pub use monitor::{BusMonitor, CapturedSequence, WordDecoder};
pub use scoreboard::{InterfaceReport, Mismatch, Scoreboard, VerificationReport};
pub use sim::{RunOutcome, SimConfig, SimTask, Simulation, Wake};
pub use stimulus::{random_bias, random_kernel, random_tensor, Stimulus, Xoshiro};
