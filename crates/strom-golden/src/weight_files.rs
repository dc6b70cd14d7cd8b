//! Plain-text weight and bias persistence.
//!
//! The hardware's memory-initialization mechanism consumes these files, so
//! their byte layout is a hard contract: one two's-complement binary string
//! per line, a blank line after each input-channel group of `K*K` weights,
//! and a parallel `_debug` file carrying the human-readable real values in
//! the same layout.

use crate::error::{GoldenError, Result};
use crate::layers::Kernel;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use strom_fixed::{FixedPointFormat, FixedValue};
use tracing::debug;

/// Paths of the four files one call to [`write_weight_files`] produces.
#[derive(Debug, Clone)]
pub struct WeightFileSet {
    /// Binary weight file (`W_<name>.txt`)
    pub weights: PathBuf,
    /// Human-readable weight file (`W_<name>_debug.txt`)
    pub weights_debug: PathBuf,
    /// Binary bias file (`B_<name>.txt`)
    pub bias: PathBuf,
    /// Human-readable bias file (`B_<name>_debug.txt`)
    pub bias_debug: PathBuf,
}

/// Write a stage's quantized weights and bias for the DUT's loader.
///
/// Weights are emitted in `(ch_out, ch_in, k, k)` order, one binary string
/// per line, with a blank line closing each `(ch_out, ch_in)` group. Bias
/// values follow the same encoding, one line per output channel, no blanks.
///
/// # Errors
///
/// Returns [`GoldenError::Shape`] when the bias length does not match the
/// kernel, or [`GoldenError::Io`] when the directory or files cannot be
/// written.
pub fn write_weight_files(
    kernel: &Kernel,
    bias: &[FixedValue],
    layer_name: &str,
    dir: &Path,
) -> Result<WeightFileSet> {
    if bias.len() != kernel.ch_out() {
        return Err(GoldenError::shape(format!(
            "{} bias values for {} output channels",
            bias.len(),
            kernel.ch_out()
        )));
    }

    let mut line_w = String::new();
    let mut debug_w = String::new();
    for co in 0..kernel.ch_out() {
        for ci in 0..kernel.ch_in() {
            for kr in 0..kernel.ksize() {
                for kc in 0..kernel.ksize() {
                    let v = kernel.value(co, ci, kr, kc);
                    let _ = writeln!(line_w, "{}", v.to_binary_string());
                    let _ = writeln!(debug_w, "{}", v.to_f64());
                }
            }
            line_w.push('\n');
            debug_w.push('\n');
        }
    }

    let mut line_b = String::new();
    let mut debug_b = String::new();
    for v in bias {
        let _ = writeln!(line_b, "{}", v.to_binary_string());
        let _ = writeln!(debug_b, "{}", v.to_f64());
    }

    fs::create_dir_all(dir)?;
    let set = WeightFileSet {
        weights: dir.join(format!("W_{layer_name}.txt")),
        weights_debug: dir.join(format!("W_{layer_name}_debug.txt")),
        bias: dir.join(format!("B_{layer_name}.txt")),
        bias_debug: dir.join(format!("B_{layer_name}_debug.txt")),
    };
    fs::write(&set.weights, line_w)?;
    fs::write(&set.weights_debug, debug_w)?;
    fs::write(&set.bias, line_b)?;
    fs::write(&set.bias_debug, debug_b)?;
    debug!(layer = layer_name, dir = %dir.display(), "weight files written");
    Ok(set)
}

/// Parse a binary weight or bias file back into raw values.
///
/// Blank group-separator lines are skipped; every other line must be exactly
/// `format.total_bits()` characters of `0`/`1`.
///
/// # Errors
///
/// Returns [`GoldenError::WeightFile`] for a malformed line and
/// [`GoldenError::Io`] when the file cannot be read.
pub fn read_weight_file(path: &Path, format: FixedPointFormat) -> Result<Vec<i64>> {
    let text = fs::read_to_string(path)?;
    let mut out = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let width = format.total_bits() as usize;
        if line.len() != width || !line.bytes().all(|b| b == b'0' || b == b'1') {
            return Err(GoldenError::weight_file(format!(
                "{}:{}: expected {width} binary digits, got {line:?}",
                path.display(),
                lineno + 1
            )));
        }
        let bits = u64::from_str_radix(line, 2).map_err(|e| {
            GoldenError::weight_file(format!("{}:{}: {e}", path.display(), lineno + 1))
        })?;
        out.push(FixedValue::from_raw_bits(bits, format)?.raw());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s4_4() -> FixedPointFormat {
        FixedPointFormat::new(4, 4, true).unwrap()
    }

    #[test]
    fn round_trips_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let fmt = s4_4();
        let kernel = Kernel::from_reals(fmt, 2, 1, 2, &[0.5, -0.5, 1.0, -1.0, 0.0625, -7.5, 2.0, 3.0]).unwrap();
        let bias = vec![
            FixedValue::quantize(0.25, fmt),
            FixedValue::quantize(-0.25, fmt),
        ];
        let set = write_weight_files(&kernel, &bias, "conv0", dir.path()).unwrap();

        assert_eq!(read_weight_file(&set.weights, fmt).unwrap(), kernel.as_raw());
        assert_eq!(
            read_weight_file(&set.bias, fmt).unwrap(),
            bias.iter().map(FixedValue::raw).collect::<Vec<_>>()
        );
    }

    #[test]
    fn rejects_malformed_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("W_bad.txt");
        fs::write(&path, "0101\n").unwrap();
        assert!(matches!(
            read_weight_file(&path, s4_4()),
            Err(GoldenError::WeightFile { .. })
        ));
    }

    #[test]
    fn bias_length_checked() {
        let dir = tempfile::tempdir().unwrap();
        let fmt = s4_4();
        let kernel = Kernel::from_raw(fmt, 2, 1, 1, vec![0, 0]).unwrap();
        let bias = vec![FixedValue::zero(fmt)];
        assert!(write_weight_files(&kernel, &bias, "x", dir.path()).is_err());
    }
}
