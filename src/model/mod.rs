//! # Forecasting model
//!
//! [`ForecastModel`] is the seam between the windowing/forecasting pipeline and
//! the network: anything that can be trained on a [`WindowDataset`] and maps a
//! batch of windows to one value per window.
//!
//! [`ConvLstmNetwork`] is the concrete implementation: causal Conv1D → stacked
//! LSTM → dense head, trained with Huber loss and SGD with momentum.
//!
//! ```rust
//! use temperature_rnn::model::{ConvLstmNetwork, ForecastModel, ModelConfig, TrainingConfig};
//! use temperature_rnn::preprocessing::WindowDataset;
//!
//! let values: Vec<f64> = (0..40).map(|i| (i as f64 * 0.2).sin()).collect();
//! let dataset = WindowDataset::new(&values, 5, 8, 16).unwrap();
//!
//! let mut model = ConvLstmNetwork::new(
//!     ModelConfig::small().with_seed(1),
//!     TrainingConfig::default(),
//! ).unwrap();
//! let report = model.train(&dataset, 2).unwrap();
//! assert_eq!(report.epochs(), 2);
//! ```

mod config;
mod conv;
mod layers;
mod loss;
mod lstm;
mod network;
mod optimizer;

pub use config::{ModelConfig, TrainingConfig};
pub use conv::CausalConv1d;
pub use layers::{Activation, Dense};
pub use loss::HuberLoss;
pub use lstm::LstmLayer;
pub use network::{ConvLstmNetwork, NetworkGradients};
pub use optimizer::Sgd;

use crate::error::Result;
use crate::preprocessing::WindowDataset;
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// A trainable mapping from a window of consecutive values to the next value
pub trait ForecastModel {
    /// Updates the parameters over `epochs` passes of `dataset`
    fn train(&mut self, dataset: &WindowDataset<'_>, epochs: usize) -> Result<TrainingReport>;

    /// Predicts one value per row of `inputs` `[batch, window_size]`.
    ///
    /// Returns `[batch, 1]`. Must not change the model.
    fn predict(&self, inputs: ArrayView2<'_, f64>) -> Array2<f64>;
}

/// Per-epoch training history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Mean Huber loss of every epoch
    pub loss: Vec<f64>,
    /// Mean absolute error of every epoch
    pub mae: Vec<f64>,
    pub windows_per_epoch: usize,
    pub batches_per_epoch: usize,
}

impl TrainingReport {
    pub fn new(windows_per_epoch: usize, batches_per_epoch: usize) -> Self {
        Self {
            loss: Vec::new(),
            mae: Vec::new(),
            windows_per_epoch,
            batches_per_epoch,
        }
    }

    pub fn push_epoch(&mut self, loss: f64, mae: f64) {
        self.loss.push(loss);
        self.mae.push(mae);
    }

    /// Number of completed epochs
    pub fn epochs(&self) -> usize {
        self.loss.len()
    }

    pub fn final_loss(&self) -> Option<f64> {
        self.loss.last().copied()
    }

    pub fn final_mae(&self) -> Option<f64> {
        self.mae.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_history() {
        let mut report = TrainingReport::new(10, 2);
        assert_eq!(report.final_loss(), None);

        report.push_epoch(0.5, 0.9);
        report.push_epoch(0.25, 0.6);

        assert_eq!(report.epochs(), 2);
        assert_eq!(report.final_loss(), Some(0.25));
        assert_eq!(report.final_mae(), Some(0.6));
    }
}
