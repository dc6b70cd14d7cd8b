//! Ordered comparison of captured sequences against golden expectations.
//!
//! Comparison is positional and exact: raw integer equality, no tolerance.
//! All mismatches of a run are collected before anything is reported, so a
//! failing regression shows the full divergence pattern instead of just the
//! first bad value.

use crate::error::{HarnessError, Result};
use crate::monitor::CapturedSequence;
use std::fmt;
use strom_golden::ExpectedSequence;
use tracing::{debug, warn};

/// One position where capture and expectation disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    /// Position in the sequence
    pub index: usize,
    /// Golden-model raw value
    pub expected: i64,
    /// Captured raw value
    pub actual: i64,
}

/// Verdict for one monitored interface.
#[derive(Debug, Clone)]
pub struct InterfaceReport {
    /// Interface name (monitor key)
    pub name: String,
    /// Golden-model sequence length
    pub expected_len: usize,
    /// Captured sequence length
    pub captured_len: usize,
    /// Positional value divergences, capped at the shorter length
    pub mismatches: Vec<Mismatch>,
}

impl InterfaceReport {
    /// Whether this interface matched completely.
    ///
    /// A run that captured nothing while values were expected fails here
    /// even though it has zero positional mismatches.
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty() && self.expected_len == self.captured_len
    }
}

impl fmt::Display for InterfaceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed() {
            return write!(f, "{}: {} values ok", self.name, self.expected_len);
        }
        writeln!(
            f,
            "{}: {} mismatches (expected {} values, captured {})",
            self.name,
            self.mismatches.len(),
            self.expected_len,
            self.captured_len
        )?;
        for m in &self.mismatches {
            writeln!(
                f,
                "  [{}] expected {} got {}",
                m.index, m.expected, m.actual
            )?;
        }
        Ok(())
    }
}

/// Aggregated verdict of one verification run.
#[derive(Debug, Clone)]
pub struct VerificationReport {
    /// Per-interface verdicts in registration order
    pub interfaces: Vec<InterfaceReport>,
}

impl VerificationReport {
    /// Whether every interface matched
    pub fn passed(&self) -> bool {
        self.interfaces.iter().all(InterfaceReport::passed)
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "verification failed:")?;
        for i in &self.interfaces {
            write!(f, "{i}")?;
            if i.passed() {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Collects (expected, captured) pairs and judges them at drain.
#[derive(Debug, Default)]
pub struct Scoreboard {
    interfaces: Vec<(String, ExpectedSequence, CapturedSequence)>,
}

impl Scoreboard {
    /// Empty scoreboard
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one interface's expectation and capture
    pub fn add_interface(
        &mut self,
        name: impl Into<String>,
        expected: ExpectedSequence,
        captured: CapturedSequence,
    ) {
        self.interfaces.push((name.into(), expected, captured));
    }

    /// Compare everything and build the report.
    pub fn drain(self) -> VerificationReport {
        let mut interfaces = Vec::with_capacity(self.interfaces.len());
        for (name, expected, captured) in self.interfaces {
            let exp = expected.as_slice();
            let cap = captured.as_slice();
            // Every divergence is recorded; the report must show the whole
            // pattern, never a truncated prefix.
            let mut mismatches = Vec::new();
            for (index, (&e, &a)) in exp.iter().zip(cap.iter()).enumerate() {
                if e != a {
                    mismatches.push(Mismatch {
                        index,
                        expected: e,
                        actual: a,
                    });
                }
            }
            let report = InterfaceReport {
                name,
                expected_len: exp.len(),
                captured_len: cap.len(),
                mismatches,
            };
            if report.passed() {
                debug!(interface = %report.name, len = report.expected_len, "interface matched");
            } else {
                warn!(
                    interface = %report.name,
                    mismatches = report.mismatches.len(),
                    expected = report.expected_len,
                    captured = report.captured_len,
                    "interface diverged"
                );
            }
            interfaces.push(report);
        }
        VerificationReport { interfaces }
    }

    /// Drain and convert a failing report into an error.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Verification`] carrying the full report when
    /// any interface diverged.
    pub fn into_result(self) -> Result<VerificationReport> {
        let report = self.drain();
        if report.passed() {
            Ok(report)
        } else {
            Err(HarnessError::Verification(Box::new(report)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strom_fixed::FixedPointFormat;

    fn expected(values: &[i64]) -> ExpectedSequence {
        let fmt = FixedPointFormat::new(8, 0, true).unwrap();
        let mut seq = ExpectedSequence::new(fmt);
        for &v in values {
            seq.push(v);
        }
        seq
    }

    fn captured(values: &[i64]) -> CapturedSequence {
        let mut bus = crate::bus::SignalBus::new();
        let valid = bus.register("v", 1);
        let data = bus.register("d", 16);
        let mut m = crate::monitor::BusMonitor::new(
            "t",
            valid,
            data,
            None,
            crate::monitor::WordDecoder::Fixed {
                format: FixedPointFormat::new(16, 0, true).unwrap(),
            },
        );
        bus.set(valid, 1).unwrap();
        for &v in values {
            #[allow(clippy::cast_sign_loss)]
            bus.set(data, (v as u64) & 0xFFFF).unwrap();
            m.sample(&bus).unwrap();
        }
        m.into_captured().1
    }

    #[test]
    fn matching_run_passes() {
        let mut sb = Scoreboard::new();
        sb.add_interface("out", expected(&[1, 2, 3]), captured(&[1, 2, 3]));
        assert!(sb.into_result().is_ok());
    }

    #[test]
    fn all_mismatches_collected() {
        let mut sb = Scoreboard::new();
        sb.add_interface("out", expected(&[1, 2, 3, 4]), captured(&[1, 9, 3, 8]));
        let report = sb.drain();
        assert_eq!(report.interfaces[0].mismatches.len(), 2);
        assert_eq!(
            report.interfaces[0].mismatches[0],
            Mismatch {
                index: 1,
                expected: 2,
                actual: 9
            }
        );
        assert_eq!(report.interfaces[0].mismatches[1].index, 3);
    }

    #[test]
    fn long_divergence_reports_every_mismatch() {
        // A fully diverged 100-element run must surface all 100 positions.
        let mut sb = Scoreboard::new();
        sb.add_interface("out", expected(&[1; 100]), captured(&[2; 100]));
        let report = sb.drain();
        let iface = &report.interfaces[0];
        assert_eq!(iface.mismatches.len(), 100);
        assert_eq!(iface.mismatches[99].index, 99);
        assert_eq!(iface.mismatches[99].expected, 1);
        assert_eq!(iface.mismatches[99].actual, 2);
    }

    #[test]
    fn empty_capture_with_expectations_fails() {
        let mut sb = Scoreboard::new();
        sb.add_interface("out", expected(&[1]), captured(&[]));
        let err = sb.into_result().unwrap_err();
        assert!(matches!(err, HarnessError::Verification(_)));
    }

    #[test]
    fn length_divergence_fails_without_value_mismatch() {
        let mut sb = Scoreboard::new();
        sb.add_interface("out", expected(&[1, 2]), captured(&[1, 2, 3]));
        let report = sb.drain();
        assert!(!report.passed());
        assert!(report.interfaces[0].mismatches.is_empty());
    }

    #[test]
    fn report_display_names_first_divergence() {
        let mut sb = Scoreboard::new();
        sb.add_interface("out", expected(&[5]), captured(&[6]));
        let err = sb.into_result().unwrap_err();
        let text = err.to_string();
        assert!(text.contains("out"));
        assert!(text.contains("expected 5 got 6"));
    }
}
