//! Byte-for-byte checks of the weight/bias persistence format.
//!
//! The DUT's memory loader parses these files with a fixed grammar, so the
//! exact bytes matter, not just the parsed values.

use std::fs;
use strom_fixed::{FixedPointFormat, FixedValue};
use strom_golden::weight_files::write_weight_files;
use strom_golden::Kernel;

#[test]
fn weight_file_layout_is_exact() {
    let dir = tempfile::tempdir().unwrap();
    let fmt = FixedPointFormat::new(4, 4, true).unwrap();

    // 1 output channel, 2 input channels, 2x2 kernel.
    let kernel = Kernel::from_reals(
        fmt,
        1,
        2,
        2,
        &[1.0, -1.0, 0.5, -0.5, 2.0, -2.0, 0.0625, -0.0625],
    )
    .unwrap();
    let bias = vec![FixedValue::quantize(0.25, fmt)];
    let set = write_weight_files(&kernel, &bias, "conv0", dir.path()).unwrap();

    // One binary string per line, blank line after each input-channel group.
    let expected_w = "\
00010000\n\
11110000\n\
00001000\n\
11111000\n\
\n\
00100000\n\
11100000\n\
00000001\n\
11111111\n\
\n";
    assert_eq!(fs::read_to_string(&set.weights).unwrap(), expected_w);

    let expected_b = "00000100\n";
    assert_eq!(fs::read_to_string(&set.bias).unwrap(), expected_b);
}

#[test]
fn debug_files_carry_real_values() {
    let dir = tempfile::tempdir().unwrap();
    let fmt = FixedPointFormat::new(4, 4, true).unwrap();
    let kernel = Kernel::from_reals(fmt, 1, 1, 1, &[-0.5]).unwrap();
    let bias = vec![FixedValue::quantize(1.5, fmt)];
    let set = write_weight_files(&kernel, &bias, "conv1", dir.path()).unwrap();

    assert_eq!(
        fs::read_to_string(&set.weights_debug).unwrap(),
        "-0.5\n\n"
    );
    assert_eq!(fs::read_to_string(&set.bias_debug).unwrap(), "1.5\n");
}

#[test]
fn file_names_follow_loader_convention() {
    let dir = tempfile::tempdir().unwrap();
    let fmt = FixedPointFormat::new(4, 4, true).unwrap();
    let kernel = Kernel::from_raw(fmt, 1, 1, 1, vec![0]).unwrap();
    let bias = vec![FixedValue::zero(fmt)];
    let set = write_weight_files(&kernel, &bias, "stage3", dir.path()).unwrap();

    assert!(set.weights.ends_with("W_stage3.txt"));
    assert!(set.weights_debug.ends_with("W_stage3_debug.txt"));
    assert!(set.bias.ends_with("B_stage3.txt"));
    assert!(set.bias_debug.ends_with("B_stage3_debug.txt"));
}
