//! Stochastic gradient descent with momentum

use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD};

/// SGD with classical momentum:
/// `v = momentum * v - lr * grad`, `param += v`.
///
/// Velocities are kept per parameter tensor, in the order the tensors are
/// passed to [`step`](Sgd::step).
#[derive(Debug, Clone)]
pub struct Sgd {
    pub learning_rate: f64,
    pub momentum: f64,
    velocities: Vec<ArrayD<f64>>,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            momentum: 0.0,
            velocities: Vec::new(),
        }
    }

    pub fn with_momentum(mut self, momentum: f64) -> Self {
        self.momentum = momentum;
        self
    }

    /// Applies one update to every parameter tensor
    pub fn step(&mut self, params: Vec<ArrayViewMutD<'_, f64>>, grads: Vec<ArrayViewD<'_, f64>>) {
        let shapes_changed = self.velocities.len() != grads.len()
            || self
                .velocities
                .iter()
                .zip(grads.iter())
                .any(|(v, g)| v.shape() != g.shape());
        if shapes_changed {
            self.velocities = grads.iter().map(|g| ArrayD::zeros(g.raw_dim())).collect();
        }

        let lr = self.learning_rate;
        let momentum = self.momentum;

        for ((mut param, grad), velocity) in params
            .into_iter()
            .zip(grads.iter())
            .zip(self.velocities.iter_mut())
        {
            velocity.zip_mut_with(grad, |v, &g| *v = momentum * *v - lr * g);
            param += &*velocity;
        }
    }
}
