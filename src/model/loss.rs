//! Huber loss
//!
//! For a residual `r = target - prediction`:
//! `0.5 r²` when `|r| <= δ`, otherwise `δ (|r| - 0.5 δ)`.
//! Quadratic near zero, linear for large residuals.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HuberLoss {
    pub delta: f64,
}

impl HuberLoss {
    pub fn new(delta: f64) -> Self {
        Self { delta }
    }

    /// Loss of a single prediction
    pub fn loss(&self, prediction: f64, target: f64) -> f64 {
        let r = (target - prediction).abs();
        if r <= self.delta {
            0.5 * r * r
        } else {
            self.delta * (r - 0.5 * self.delta)
        }
    }

    /// Derivative of [`loss`](Self::loss) with respect to the prediction
    pub fn gradient(&self, prediction: f64, target: f64) -> f64 {
        let r = target - prediction;
        if r.abs() <= self.delta {
            -r
        } else {
            -self.delta * r.signum()
        }
    }
}

impl Default for HuberLoss {
    fn default() -> Self {
        Self::new(1.0)
    }
}
