//! The end-to-end golden model: a pipeline of validated stages.
//!
//! Construction validates everything up front so inference can't fail on a
//! well-formed model; [`GoldenModel::infer`] then chains the layer reference
//! functions stage by stage and finishes with the global average pool, the
//! same topology the generated hardware instantiates.

use crate::error::{GoldenError, Result};
use crate::layers::{
    avg_pool_global, conv, default_leaky_alpha, leaky_relu, max_pool, relu, zero_pad, Kernel,
};
use crate::params::LayerParams;
use crate::tensor::Tensor;
use strom_fixed::{FixedPointFormat, FixedValue};
use tracing::debug;

/// Append-only expected-value sequence for one monitored interface.
///
/// Values are raw fixed-point integers in the order the hardware must emit
/// them. Once pushed, a value is never reordered or removed; comparison
/// against the capture is strictly positional.
#[derive(Debug, Clone)]
pub struct ExpectedSequence {
    format: FixedPointFormat,
    values: Vec<i64>,
}

impl ExpectedSequence {
    /// Empty sequence for values of the given format
    pub const fn new(format: FixedPointFormat) -> Self {
        Self {
            format,
            values: Vec::new(),
        }
    }

    /// Element format
    pub const fn format(&self) -> FixedPointFormat {
        self.format
    }

    /// Append one expected raw value
    pub fn push(&mut self, raw: i64) {
        self.values.push(raw);
    }

    /// Append a whole tensor in streaming order
    pub fn extend_from_tensor(&mut self, tensor: &Tensor) {
        self.values.extend(tensor.to_stream());
    }

    /// Number of expected values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no values are expected
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Expected raw values in emission order
    pub fn as_slice(&self) -> &[i64] {
        &self.values
    }
}

/// One processing element: validated parameters plus quantized weights.
#[derive(Debug, Clone)]
pub struct Stage {
    params: LayerParams,
    weights: Kernel,
    bias: Vec<FixedValue>,
}

impl Stage {
    /// Bundle parameters with weights and bias, checking that they agree.
    ///
    /// # Errors
    ///
    /// Returns [`GoldenError::InvalidParams`] for a bad parameter set and
    /// [`GoldenError::Shape`] when weights or bias don't match it.
    pub fn new(params: LayerParams, weights: Kernel, bias: Vec<FixedValue>) -> Result<Self> {
        params.validate()?;
        if weights.ch_in() != params.channel_in
            || weights.ch_out() != params.channel_out
            || weights.ksize() != params.kernel_size
        {
            return Err(GoldenError::shape(format!(
                "kernel {}x{}x{k}x{k} does not match stage {}x{} k={}",
                weights.ch_out(),
                weights.ch_in(),
                params.channel_out,
                params.channel_in,
                params.kernel_size,
                k = weights.ksize(),
            )));
        }
        if bias.len() != params.channel_out {
            return Err(GoldenError::shape(format!(
                "{} bias values for {} output channels",
                bias.len(),
                params.channel_out
            )));
        }
        let weight_fmt = params.bitwidth.weight_format()?;
        if weights.format() != weight_fmt {
            return Err(GoldenError::shape(format!(
                "weight format {} does not match stage widths {weight_fmt}",
                weights.format()
            )));
        }
        Ok(Self {
            params,
            weights,
            bias,
        })
    }

    /// Stage parameters
    pub const fn params(&self) -> &LayerParams {
        &self.params
    }

    /// Stage weights
    pub const fn weights(&self) -> &Kernel {
        &self.weights
    }

    /// Stage bias values, one per output channel
    pub fn bias(&self) -> &[FixedValue] {
        &self.bias
    }

    /// Run the stage: pad, convolve, activate, pool.
    ///
    /// # Errors
    ///
    /// Returns [`GoldenError::Shape`] when the input extent is too small for
    /// the stage's windows.
    pub fn apply(&self, input: &Tensor) -> Result<Tensor> {
        let p = &self.params;
        let padded;
        let conv_in = if p.pad > 0 {
            padded = zero_pad(input, p.pad);
            &padded
        } else {
            input
        };
        let out_fmt = p.bitwidth.data_out_format()?;
        let mut t = conv(conv_in, &self.weights, &self.bias, p.stride, out_fmt)?;
        if p.relu {
            t = if p.leaky_relu {
                leaky_relu(&t, default_leaky_alpha()?)
            } else {
                relu(&t)
            };
        }
        if p.has_pool() {
            t = max_pool(&t, p.pool_kernel, p.pool_stride)?;
        }
        Ok(t)
    }
}

/// The whole accelerator's bit-exact software twin.
#[derive(Debug, Clone)]
pub struct GoldenModel {
    stages: Vec<Stage>,
}

impl GoldenModel {
    /// Chain stages into a model, checking channel continuity.
    ///
    /// # Errors
    ///
    /// Returns [`GoldenError::InvalidParams`] for an empty pipeline or a
    /// channel-count break between consecutive stages.
    pub fn new(stages: Vec<Stage>) -> Result<Self> {
        if stages.is_empty() {
            return Err(GoldenError::invalid_params("model needs at least one stage"));
        }
        for (i, pair) in stages.windows(2).enumerate() {
            let (a, b) = (&pair[0], &pair[1]);
            if a.params().channel_out != b.params().channel_in {
                return Err(GoldenError::invalid_params(format!(
                    "stage {} emits {} channels but stage {} expects {}",
                    i,
                    a.params().channel_out,
                    i + 1,
                    b.params().channel_in
                )));
            }
        }
        Ok(Self { stages })
    }

    /// Pipeline stages in order
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Input channel count of the first stage
    pub fn channel_in(&self) -> usize {
        self.stages[0].params().channel_in
    }

    /// Output channel count of the last stage (= classifier width)
    pub fn channel_out(&self) -> usize {
        self.stages[self.stages.len() - 1].params().channel_out
    }

    /// Run the full pipeline including the terminal global average pool.
    ///
    /// # Errors
    ///
    /// Returns [`GoldenError::Shape`] when the input does not fit the first
    /// stage or shrinks below a later stage's window.
    pub fn infer(&self, input: &Tensor) -> Result<Tensor> {
        let mut t = input.clone();
        for (i, stage) in self.stages.iter().enumerate() {
            t = stage.apply(&t)?;
            debug!(
                stage = i,
                shape = ?t.shape(),
                format = %t.format(),
                "stage evaluated"
            );
        }
        avg_pool_global(&t)
    }

    /// Expected top-level output sequence for the given input.
    ///
    /// One value per output channel, in streaming order, at the last stage's
    /// output format.
    ///
    /// # Errors
    ///
    /// Propagates [`GoldenModel::infer`] errors.
    pub fn expected_sequence(&self, input: &Tensor) -> Result<ExpectedSequence> {
        let out = self.infer(input)?;
        let mut seq = ExpectedSequence::new(out.format());
        seq.extend_from_tensor(&out);
        Ok(seq)
    }

    /// Per-stage expected sequences, one per processing element output.
    ///
    /// Index `i` holds the streamed output of stage `i` before the global
    /// average pool; internal monitors compare against these.
    ///
    /// # Errors
    ///
    /// Propagates stage evaluation errors.
    pub fn stage_sequences(&self, input: &Tensor) -> Result<Vec<ExpectedSequence>> {
        let mut out = Vec::with_capacity(self.stages.len());
        let mut t = input.clone();
        for stage in &self.stages {
            t = stage.apply(&t)?;
            let mut seq = ExpectedSequence::new(t.format());
            seq.extend_from_tensor(&t);
            out.push(seq);
        }
        Ok(out)
    }
}
