//! Pipeline configuration

use crate::error::{ForecastError, Result};
use crate::forecast::{AlignmentPolicy, DEFAULT_FORECAST_BATCH};
use crate::model::{ModelConfig, TrainingConfig};
use crate::preprocessing::SplitPoint;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Every setting of one training and evaluation run.
///
/// Missing fields in a JSON file fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Input values per window
    pub window_size: usize,
    /// Windows per training batch
    pub batch_size: usize,
    /// Shuffle reservoir size, 0 disables shuffling
    pub shuffle_buffer: usize,
    /// Train/validation cut
    pub split: SplitPoint,
    pub model: ModelConfig,
    pub training: TrainingConfig,
    /// Windows per prediction call when forecasting
    pub forecast_batch_size: usize,
    pub alignment: AlignmentPolicy,
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self {
            window_size: 64,
            batch_size: 32,
            shuffle_buffer: 1000,
            split: SplitPoint::default(),
            model: ModelConfig::default(),
            training: TrainingConfig::default(),
            forecast_batch_size: DEFAULT_FORECAST_BATCH,
            alignment: AlignmentPolicy::default(),
        }
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_shuffle_buffer(mut self, shuffle_buffer: usize) -> Self {
        self.shuffle_buffer = shuffle_buffer;
        self
    }

    pub fn with_split(mut self, split: SplitPoint) -> Self {
        self.split = split;
        self
    }

    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.model = model;
        self
    }

    pub fn with_training(mut self, training: TrainingConfig) -> Self {
        self.training = training;
        self
    }

    pub fn with_forecast_batch_size(mut self, batch_size: usize) -> Self {
        self.forecast_batch_size = batch_size;
        self
    }

    pub fn with_alignment(mut self, alignment: AlignmentPolicy) -> Self {
        self.alignment = alignment;
        self
    }

    /// Checks the settings that do not depend on the series length
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(ForecastError::Config(
                "window size must be at least 1".to_string(),
            ));
        }
        if self.batch_size == 0 || self.forecast_batch_size == 0 {
            return Err(ForecastError::Config(
                "batch sizes must be at least 1".to_string(),
            ));
        }
        if let SplitPoint::Ratio(ratio) = self.split {
            if !(ratio > 0.0 && ratio < 1.0) {
                return Err(ForecastError::Config(format!(
                    "split ratio must lie in (0, 1), got {}",
                    ratio
                )));
            }
        }
        self.model.validate()?;
        self.training.validate()?;
        Ok(())
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}
