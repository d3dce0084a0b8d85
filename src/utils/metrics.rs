//! Forecast error metrics

use crate::error::{ForecastError, Result};
use crate::forecast::AlignedForecast;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors of an aligned forecast
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Evaluation {
    /// Mean Squared Error
    pub mse: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Number of compared points
    pub points: usize,
}

impl Evaluation {
    pub fn calculate(predicted: &[f64], actual: &[f64]) -> Result<Self> {
        let mse = mse(predicted, actual)?;
        Ok(Self {
            mse,
            mae: mae(predicted, actual)?,
            rmse: mse.sqrt(),
            points: predicted.len(),
        })
    }

    pub fn from_aligned(aligned: &AlignedForecast) -> Result<Self> {
        Self::calculate(&aligned.predicted, &aligned.actual)
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MSE: {:.2}, MAE: {:.2}", self.mse, self.mae)
    }
}

/// Mean of `(predicted - actual)²`
pub fn mse(predicted: &[f64], actual: &[f64]) -> Result<f64> {
    check_lengths(predicted, actual)?;
    let sum: f64 = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a).powi(2))
        .sum();
    Ok(sum / predicted.len() as f64)
}

/// Mean of `|predicted - actual|`
pub fn mae(predicted: &[f64], actual: &[f64]) -> Result<f64> {
    check_lengths(predicted, actual)?;
    let sum: f64 = predicted.iter().zip(actual).map(|(p, a)| (p - a).abs()).sum();
    Ok(sum / predicted.len() as f64)
}

pub fn rmse(predicted: &[f64], actual: &[f64]) -> Result<f64> {
    mse(predicted, actual).map(f64::sqrt)
}

fn check_lengths(predicted: &[f64], actual: &[f64]) -> Result<()> {
    if predicted.len() != actual.len() {
        return Err(ForecastError::MalformedInput(format!(
            "cannot compare {} predictions with {} observations",
            predicted.len(),
            actual.len()
        )));
    }
    if predicted.is_empty() {
        return Err(ForecastError::MalformedInput(
            "no points to evaluate".to_string(),
        ));
    }
    Ok(())
}
