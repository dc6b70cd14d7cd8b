//! End-to-end verification runs against the behavioral device.

use strom_fixed::{FixedPointFormat, FixedValue};
use strom_golden::{layers, GoldenModel, Kernel, LayerParams, Stage, StageBitwidth, Tensor};
use strom_harness::runner::{run_verification, BenchConfig};
use strom_harness::{random_kernel, random_tensor, FaultInjection, HarnessError, Xoshiro};

fn s4_4() -> FixedPointFormat {
    FixedPointFormat::new(4, 4, true).unwrap()
}

fn small_model() -> (GoldenModel, Tensor) {
    let bitwidth = StageBitwidth {
        data_bits: 8,
        frac_in: 4,
        frac_out: 4,
        weight_bits: 8,
        weight_frac: 4,
    };
    let params = LayerParams {
        kernel_size: 3,
        stride: 1,
        pad: 0,
        channel_in: 1,
        channel_out: 4,
        relu: true,
        leaky_relu: false,
        pool_kernel: 2,
        pool_stride: 2,
        bitwidth,
    };
    let mut rng = Xoshiro::new(0xC0FFEE);
    let weights = random_kernel(&mut rng, s4_4(), 4, 1, 3).unwrap();
    let bias = vec![FixedValue::quantize(0.25, s4_4()); 4];
    let stage = Stage::new(params, weights, bias).unwrap();
    let model = GoldenModel::new(vec![stage]).unwrap();
    let input = random_tensor(&mut rng, s4_4(), 1, 6, 6).unwrap();
    (model, input)
}

#[test]
fn convolution_matches_double_precision_reference() {
    // 6x6 single-channel image, 3x3 kernel, stride 1, 4 output channels:
    // the quantized convolution must equal a double-precision convolution
    // quantized once per output element.
    let data_fmt = FixedPointFormat::new(4, 4, false).unwrap();
    let weight_fmt = s4_4();
    let mut rng = Xoshiro::new(99);
    let input = random_tensor(&mut rng, data_fmt, 1, 6, 6).unwrap();
    let weights = random_kernel(&mut rng, weight_fmt, 4, 1, 3).unwrap();
    let bias = vec![FixedValue::zero(weight_fmt); 4];

    let out = layers::conv(&input, &weights, &bias, 1, s4_4()).unwrap();
    assert_eq!(out.shape(), (4, 4, 4));

    for co in 0..4 {
        for row in 0..4 {
            for col in 0..4 {
                let mut acc = 0.0_f64;
                for kr in 0..3 {
                    for kc in 0..3 {
                        acc += input.value(0, row + kr, col + kc).to_f64()
                            * weights.value(co, 0, kr, kc).to_f64();
                    }
                }
                let reference = FixedValue::quantize(acc, s4_4()).raw();
                assert_eq!(out.get(co, row, col), reference, "at ({co},{row},{col})");
            }
        }
    }
}

#[test]
fn max_pool_window_maxima_are_exact() {
    let fmt = FixedPointFormat::new(8, 0, false).unwrap();
    let data: Vec<i64> = (0..128).collect();
    let input = Tensor::from_raw(fmt, 2, 8, 8, data).unwrap();
    let out = layers::max_pool(&input, 2, 2).unwrap();
    assert_eq!(out.shape(), (2, 4, 4));
    for ch in 0..2 {
        for row in 0..4 {
            for col in 0..4 {
                let mut best = i64::MIN;
                for kr in 0..2 {
                    for kc in 0..2 {
                        best = best.max(input.get(ch, 2 * row + kr, 2 * col + kc));
                    }
                }
                assert_eq!(out.get(ch, row, col), best);
            }
        }
    }
}

#[test]
fn healthy_device_passes_verification() {
    let (model, input) = small_model();
    let report = run_verification(&model, &input, &BenchConfig::default()).unwrap();
    assert!(report.passed());
    assert_eq!(report.interfaces[0].expected_len, 4);
}

#[test]
fn healthy_device_passes_with_input_gaps() {
    let (model, input) = small_model();
    let config = BenchConfig {
        gap_every: 5,
        ..BenchConfig::default()
    };
    assert!(run_verification(&model, &input, &config).unwrap().passed());
}

#[test]
fn corrupted_word_is_reported_at_its_position() {
    let (model, input) = small_model();
    let config = BenchConfig {
        fault: FaultInjection::CorruptWord { index: 2, xor: 0x01 },
        ..BenchConfig::default()
    };
    let err = run_verification(&model, &input, &config).unwrap_err();
    let HarnessError::Verification(report) = err else {
        panic!("expected a verification failure, got {err}");
    };
    let iface = &report.interfaces[0];
    assert_eq!(iface.mismatches.len(), 1);
    assert_eq!(iface.mismatches[0].index, 2);
}

#[test]
fn silent_device_fails_instead_of_passing_empty() {
    let (model, input) = small_model();
    let config = BenchConfig {
        fault: FaultInjection::DropAll,
        ..BenchConfig::default()
    };
    let err = run_verification(&model, &input, &config).unwrap_err();
    let HarnessError::Verification(report) = err else {
        panic!("expected a verification failure, got {err}");
    };
    let iface = &report.interfaces[0];
    assert_eq!(iface.captured_len, 0);
    assert!(iface.expected_len > 0);
    assert!(iface.mismatches.is_empty());
}
