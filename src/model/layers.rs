//! Dense layer and activations

use ndarray::{Array1, Array2, ArrayView1, ArrayViewD, ArrayViewMutD, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Element-wise activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Linear,
    Relu,
}

impl Activation {
    pub fn apply(&self, z: &Array1<f64>) -> Array1<f64> {
        match self {
            Activation::Linear => z.clone(),
            Activation::Relu => z.mapv(|v| v.max(0.0)),
        }
    }

    /// Derivative with respect to the pre-activation `z`
    pub fn derivative(&self, z: &Array1<f64>) -> Array1<f64> {
        match self {
            Activation::Linear => Array1::ones(z.len()),
            Activation::Relu => z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
        }
    }
}

/// Fully connected layer: `output = activation(input · W + b)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    /// Weights `[input_size, output_size]`
    pub weights: Array2<f64>,
    /// Biases `[output_size]`
    pub biases: Array1<f64>,
    pub activation: Activation,
}

/// Values kept from the forward pass for backpropagation
#[derive(Debug, Clone)]
pub struct DenseCache {
    input: Array1<f64>,
    z: Array1<f64>,
}

/// Gradients of one dense layer
#[derive(Debug, Clone)]
pub struct DenseGradients {
    pub weights: Array2<f64>,
    pub biases: Array1<f64>,
}

impl Dense {
    /// Xavier/Glorot uniform initialisation
    pub fn new<R: Rng>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        let limit = (6.0 / (input_size + output_size) as f64).sqrt();
        Self {
            weights: Array2::random_using(
                (input_size, output_size),
                Uniform::new(-limit, limit),
                rng,
            ),
            biases: Array1::zeros(output_size),
            activation,
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.nrows()
    }

    pub fn output_size(&self) -> usize {
        self.weights.ncols()
    }

    pub fn forward(&self, input: ArrayView1<'_, f64>) -> Array1<f64> {
        let z = input.dot(&self.weights) + &self.biases;
        self.activation.apply(&z)
    }

    pub fn forward_cached(&self, input: ArrayView1<'_, f64>) -> (Array1<f64>, DenseCache) {
        let z = input.dot(&self.weights) + &self.biases;
        let output = self.activation.apply(&z);
        (
            output,
            DenseCache {
                input: input.to_owned(),
                z,
            },
        )
    }

    /// Accumulates parameter gradients into `grads` and returns the gradient
    /// with respect to the layer input.
    pub fn backward(
        &self,
        cache: &DenseCache,
        output_grad: &Array1<f64>,
        grads: &mut DenseGradients,
    ) -> Array1<f64> {
        let delta = output_grad * &self.activation.derivative(&cache.z);

        grads.weights += &outer(&cache.input, &delta);
        grads.biases += &delta;

        self.weights.dot(&delta)
    }

    pub fn zero_gradients(&self) -> DenseGradients {
        DenseGradients {
            weights: Array2::zeros(self.weights.dim()),
            biases: Array1::zeros(self.biases.len()),
        }
    }

    pub fn params_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>> {
        vec![
            self.weights.view_mut().into_dyn(),
            self.biases.view_mut().into_dyn(),
        ]
    }

    pub fn num_parameters(&self) -> usize {
        self.weights.len() + self.biases.len()
    }
}

impl DenseGradients {
    pub fn views(&self) -> Vec<ArrayViewD<'_, f64>> {
        vec![self.weights.view().into_dyn(), self.biases.view().into_dyn()]
    }

    pub fn views_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>> {
        vec![
            self.weights.view_mut().into_dyn(),
            self.biases.view_mut().into_dyn(),
        ]
    }
}

/// Outer product `a ⊗ b`, shape `[a.len(), b.len()]`
pub fn outer(a: &Array1<f64>, b: &Array1<f64>) -> Array2<f64> {
    let column = a.view().insert_axis(Axis(1));
    let row = b.view().insert_axis(Axis(0));
    column.dot(&row)
}
