//! Causal 1D convolution with ReLU
//!
//! Output at step `t` only depends on inputs at steps `<= t`; the input is left
//! padded with `kernel_size - 1` zeros so the output keeps the input length.

use ndarray::{s, Array1, Array2, ArrayViewD, ArrayViewMutD};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CausalConv1d {
    /// Weights `[out_channels, in_channels * kernel_size]`
    pub weights: Array2<f64>,
    /// Bias `[out_channels]`
    pub bias: Array1<f64>,
    pub kernel_size: usize,
    pub in_channels: usize,
    pub out_channels: usize,
}

#[derive(Debug, Clone)]
pub struct ConvCache {
    padded: Array2<f64>,
    z: Array2<f64>,
}

#[derive(Debug, Clone)]
pub struct ConvGradients {
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
}

impl CausalConv1d {
    /// He-uniform initialisation
    pub fn new<R: Rng>(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        rng: &mut R,
    ) -> Self {
        let fan_in = (in_channels * kernel_size) as f64;
        let limit = (6.0 / fan_in).sqrt();

        Self {
            weights: Array2::random_using(
                (out_channels, in_channels * kernel_size),
                Uniform::new(-limit, limit),
                rng,
            ),
            bias: Array1::zeros(out_channels),
            kernel_size,
            in_channels,
            out_channels,
        }
    }

    pub fn padding(&self) -> usize {
        self.kernel_size - 1
    }

    fn pad(&self, input: &Array2<f64>) -> Array2<f64> {
        let (channels, seq_len) = input.dim();
        let padding = self.padding();
        let mut padded = Array2::zeros((channels, seq_len + padding));
        padded.slice_mut(s![.., padding..]).assign(input);
        padded
    }

    /// Pre-activation output for an already padded input
    fn convolve(&self, padded: &Array2<f64>, seq_len: usize) -> Array2<f64> {
        let padding = self.padding();
        let mut z = Array2::zeros((self.out_channels, seq_len));

        for t in 0..seq_len {
            for out_c in 0..self.out_channels {
                let mut sum = self.bias[out_c];
                for k in 0..self.kernel_size {
                    // k = 0 is the current step, larger k looks further back
                    let input_idx = t + padding - k;
                    for in_c in 0..self.in_channels {
                        sum += self.weights[[out_c, in_c * self.kernel_size + k]]
                            * padded[[in_c, input_idx]];
                    }
                }
                z[[out_c, t]] = sum;
            }
        }

        z
    }

    /// Forward pass
    ///
    /// * `input` - `[in_channels, seq_len]`
    ///
    /// Returns `[out_channels, seq_len]` after ReLU.
    pub fn forward(&self, input: &Array2<f64>) -> Array2<f64> {
        let padded = self.pad(input);
        self.convolve(&padded, input.ncols()).mapv(relu)
    }

    pub fn forward_cached(&self, input: &Array2<f64>) -> (Array2<f64>, ConvCache) {
        let padded = self.pad(input);
        let z = self.convolve(&padded, input.ncols());
        let output = z.mapv(relu);
        (output, ConvCache { padded, z })
    }

    /// Accumulates parameter gradients. The convolution is always the first
    /// layer, so no input gradient is produced.
    pub fn backward(&self, cache: &ConvCache, output_grad: &Array2<f64>, grads: &mut ConvGradients) {
        let padding = self.padding();
        let seq_len = cache.z.ncols();

        for out_c in 0..self.out_channels {
            for t in 0..seq_len {
                if cache.z[[out_c, t]] <= 0.0 {
                    continue;
                }
                let delta = output_grad[[out_c, t]];
                grads.bias[out_c] += delta;
                for k in 0..self.kernel_size {
                    let input_idx = t + padding - k;
                    for in_c in 0..self.in_channels {
                        grads.weights[[out_c, in_c * self.kernel_size + k]] +=
                            delta * cache.padded[[in_c, input_idx]];
                    }
                }
            }
        }
    }

    pub fn zero_gradients(&self) -> ConvGradients {
        ConvGradients {
            weights: Array2::zeros(self.weights.dim()),
            bias: Array1::zeros(self.bias.len()),
        }
    }

    pub fn params_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>> {
        vec![
            self.weights.view_mut().into_dyn(),
            self.bias.view_mut().into_dyn(),
        ]
    }

    pub fn num_parameters(&self) -> usize {
        self.weights.len() + self.bias.len()
    }
}

impl ConvGradients {
    pub fn views(&self) -> Vec<ArrayViewD<'_, f64>> {
        vec![self.weights.view().into_dyn(), self.bias.view().into_dyn()]
    }

    pub fn views_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>> {
        vec![
            self.weights.view_mut().into_dyn(),
            self.bias.view_mut().into_dyn(),
        ]
    }
}

fn relu(v: f64) -> f64 {
    v.max(0.0)
}
