//! `strom` — command-line interface for the streaming CNN verification bench.
//!
//! ```text
//! USAGE:
//!   strom verify [--seed N] [--image-size N] ...   Run a randomized verification
//!   strom quantize-weights --out <dir> ...         Emit weight files for the loader
//!   strom quantize <value> --int N --frac N        Inspect one fixed-point quantization
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use strom_fixed::{FixedPointFormat, FixedValue};
use strom_golden::weight_files::write_weight_files;
use strom_golden::{GoldenModel, LayerParams, Stage, StageBitwidth};
use strom_harness::runner::{run_verification, BenchConfig};
use strom_harness::{random_bias, random_kernel, random_tensor, FaultInjection, Xoshiro};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "strom", about = "Streaming CNN accelerator verification bench", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Verify the behavioral device against the golden model on random stimulus.
    Verify {
        /// Stimulus and weight seed.
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Square input image edge length.
        #[arg(long, default_value_t = 6)]
        image_size: usize,
        /// Convolution kernel edge length.
        #[arg(long, default_value_t = 3)]
        kernel_size: usize,
        /// Convolution stride.
        #[arg(long, default_value_t = 1)]
        stride: usize,
        /// Output channel count.
        #[arg(long, default_value_t = 4)]
        channels: usize,
        /// Drive an input idle gap every N words (0 = back to back).
        #[arg(long, default_value_t = 0)]
        gap_every: usize,
        /// Corrupt output word at this index, to demonstrate a failing run.
        #[arg(long)]
        corrupt: Option<usize>,
    },
    /// Quantize random weights and write them in the loader's file format.
    QuantizeWeights {
        /// Output directory.
        #[arg(long)]
        out: PathBuf,
        /// Layer name used in the file names.
        #[arg(long, default_value = "conv0")]
        layer: String,
        /// Weight seed.
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Output channel count.
        #[arg(long, default_value_t = 4)]
        channels: usize,
        /// Input channel count.
        #[arg(long, default_value_t = 1)]
        channels_in: usize,
        /// Kernel edge length.
        #[arg(long, default_value_t = 3)]
        kernel_size: usize,
    },
    /// Quantize one real value and print its fixed-point encoding.
    Quantize {
        /// Real value.
        value: f64,
        /// Integer bits.
        #[arg(long, default_value_t = 4)]
        int: u32,
        /// Fractional bits.
        #[arg(long, default_value_t = 4)]
        frac: u32,
        /// Treat the format as unsigned.
        #[arg(long)]
        unsigned: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Cmd::Verify {
            seed,
            image_size,
            kernel_size,
            stride,
            channels,
            gap_every,
            corrupt,
        } => cmd_verify(seed, image_size, kernel_size, stride, channels, gap_every, corrupt)?,
        Cmd::QuantizeWeights {
            out,
            layer,
            seed,
            channels,
            channels_in,
            kernel_size,
        } => cmd_quantize_weights(&out, &layer, seed, channels, channels_in, kernel_size)?,
        Cmd::Quantize {
            value,
            int,
            frac,
            unsigned,
        } => cmd_quantize(value, int, frac, unsigned)?,
    }

    Ok(())
}

fn default_bitwidth() -> StageBitwidth {
    StageBitwidth {
        data_bits: 8,
        frac_in: 4,
        frac_out: 4,
        weight_bits: 8,
        weight_frac: 4,
    }
}

fn cmd_verify(
    seed: u64,
    image_size: usize,
    kernel_size: usize,
    stride: usize,
    channels: usize,
    gap_every: usize,
    corrupt: Option<usize>,
) -> Result<()> {
    let bitwidth = default_bitwidth();
    let params = LayerParams {
        kernel_size,
        stride,
        pad: 0,
        channel_in: 1,
        channel_out: channels,
        relu: true,
        leaky_relu: false,
        pool_kernel: 0,
        pool_stride: 0,
        bitwidth,
    };
    params.validate()?;

    let weight_fmt = bitwidth.weight_format()?;
    let data_fmt = bitwidth.data_in_format()?;
    let mut rng = Xoshiro::new(seed);
    let weights = random_kernel(&mut rng, weight_fmt, channels, 1, kernel_size)?;
    let bias = random_bias(&mut rng, weight_fmt, channels);
    let model = GoldenModel::new(vec![Stage::new(params, weights, bias)?])?;
    let input = random_tensor(&mut rng, data_fmt, 1, image_size, image_size)?;

    let config = BenchConfig {
        gap_every,
        fault: corrupt.map_or(FaultInjection::None, |index| FaultInjection::CorruptWord {
            index,
            xor: 0x01,
        }),
        ..BenchConfig::default()
    };

    match run_verification(&model, &input, &config) {
        Ok(report) => {
            for iface in &report.interfaces {
                println!("{iface}");
            }
            println!("PASS (seed {seed})");
            Ok(())
        }
        Err(strom_harness::HarnessError::Verification(report)) => {
            print!("{report}");
            println!("FAIL (seed {seed})");
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_quantize_weights(
    out: &std::path::Path,
    layer: &str,
    seed: u64,
    channels: usize,
    channels_in: usize,
    kernel_size: usize,
) -> Result<()> {
    let bitwidth = default_bitwidth();
    let weight_fmt = bitwidth.weight_format()?;
    let mut rng = Xoshiro::new(seed);
    let kernel = random_kernel(&mut rng, weight_fmt, channels, channels_in, kernel_size)?;
    let bias = random_bias(&mut rng, weight_fmt, channels);
    let set = write_weight_files(&kernel, &bias, layer, out)?;

    println!("wrote {}", set.weights.display());
    println!("wrote {}", set.weights_debug.display());
    println!("wrote {}", set.bias.display());
    println!("wrote {}", set.bias_debug.display());
    Ok(())
}

fn cmd_quantize(value: f64, int: u32, frac: u32, unsigned: bool) -> Result<()> {
    let format = FixedPointFormat::new(int, frac, !unsigned)?;
    let q = FixedValue::quantize(value, format);

    println!("format     {format}");
    println!("real       {}", q.to_f64());
    println!("raw        {}", q.raw());
    println!("bits       {}", q.to_binary_string());
    println!("resolution {}", format.resolution());
    Ok(())
}
