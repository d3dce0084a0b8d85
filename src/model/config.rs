//! Model and training configuration

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Architecture of the convolutional + recurrent forecaster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Number of causal convolution filters
    pub conv_filters: usize,
    /// Convolution kernel width
    pub kernel_size: usize,
    /// Hidden units of each stacked LSTM layer, bottom to top
    pub lstm_units: Vec<usize>,
    /// Hidden ReLU dense layers between the last LSTM state and the output
    pub dense_units: Vec<usize>,
    /// Seed for weight initialisation and shuffling; entropy when `None`
    pub seed: Option<u64>,
}

impl ModelConfig {
    /// Conv1D(64, k=3) → LSTM(64) → LSTM(64) → Dense(30) → Dense(10) → Dense(1)
    pub fn new() -> Self {
        Self {
            conv_filters: 64,
            kernel_size: 3,
            lstm_units: vec![64, 64],
            dense_units: vec![30, 10],
            seed: None,
        }
    }

    /// Small network, quick to train
    pub fn small() -> Self {
        Self {
            conv_filters: 8,
            kernel_size: 3,
            lstm_units: vec![8],
            dense_units: vec![4],
            seed: None,
        }
    }

    pub fn with_conv(mut self, filters: usize, kernel_size: usize) -> Self {
        self.conv_filters = filters;
        self.kernel_size = kernel_size;
        self
    }

    pub fn with_lstm_units(mut self, units: Vec<usize>) -> Self {
        self.lstm_units = units;
        self
    }

    pub fn with_dense_units(mut self, units: Vec<usize>) -> Self {
        self.dense_units = units;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.conv_filters == 0 || self.kernel_size == 0 {
            return Err(ForecastError::Config(
                "convolution needs at least one filter of width >= 1".to_string(),
            ));
        }
        if self.lstm_units.is_empty() || self.lstm_units.contains(&0) {
            return Err(ForecastError::Config(
                "at least one LSTM layer with a non-zero number of units is required".to_string(),
            ));
        }
        if self.dense_units.contains(&0) {
            return Err(ForecastError::Config(
                "dense layers need at least one unit".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Optimisation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Passes over the training windows
    pub epochs: usize,
    /// SGD step size
    pub learning_rate: f64,
    /// SGD momentum
    pub momentum: f64,
    /// Huber loss threshold δ
    pub huber_delta: f64,
    /// Global gradient norm cap
    pub gradient_clip: Option<f64>,
    /// Draw an epoch progress bar on stderr
    pub show_progress: bool,
}

impl TrainingConfig {
    pub fn new() -> Self {
        Self {
            epochs: 50,
            learning_rate: 5e-3,
            momentum: 0.9,
            huber_delta: 1.0,
            gradient_clip: None,
            show_progress: false,
        }
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_momentum(mut self, momentum: f64) -> Self {
        self.momentum = momentum;
        self
    }

    pub fn with_huber_delta(mut self, delta: f64) -> Self {
        self.huber_delta = delta;
        self
    }

    pub fn with_gradient_clip(mut self, clip: f64) -> Self {
        self.gradient_clip = Some(clip);
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ForecastError::Config(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return Err(ForecastError::Config(format!(
                "momentum must lie in [0, 1), got {}",
                self.momentum
            )));
        }
        if !(self.huber_delta > 0.0 && self.huber_delta.is_finite()) {
            return Err(ForecastError::Config(format!(
                "Huber delta must be positive, got {}",
                self.huber_delta
            )));
        }
        if let Some(clip) = self.gradient_clip {
            if !(clip > 0.0) {
                return Err(ForecastError::Config(format!(
                    "gradient clip must be positive, got {}",
                    clip
                )));
            }
        }
        Ok(())
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self::new()
    }
}
