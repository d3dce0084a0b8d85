//! Error types for the forecasting pipeline

use crate::forecast::AlignmentPolicy;
use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors raised anywhere between loading the series and evaluating a forecast.
///
/// Every variant is fatal for the current run: the pipeline stops at the first
/// error and hands it back to the caller.
#[derive(Error, Debug)]
pub enum ForecastError {
    /// Unparseable or absent required data
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Split point outside `1..len`
    #[error("Invalid split point {cut} for a series of length {len}")]
    InvalidSplit { cut: usize, len: usize },

    /// Window or batch sizing infeasible for the series length
    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    /// Not enough history before the split point to align the forecast
    #[error("Cannot align forecast: split time {split_time} is smaller than window size {window_size}")]
    Alignment {
        split_time: usize,
        window_size: usize,
    },

    /// Split leaves no validation point to compare under the alignment policy
    #[error("Nothing to evaluate: split time {split_time} of a series of length {len} leaves no validation points under the {policy} alignment policy")]
    EmptyAlignment {
        split_time: usize,
        len: usize,
        policy: AlignmentPolicy,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Training produced a non-finite loss
    #[error("Training diverged at epoch {epoch}: loss = {loss}")]
    Diverged { epoch: usize, loss: f64 },

    /// Model returned more than one value per window
    #[error("Model produced {0} outputs per window, expected 1")]
    OutputShape(usize),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading/writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (configuration) error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Model artifact encoding error
    #[error("Model artifact error: {0}")]
    Artifact(#[from] bincode::Error),
}

impl ForecastError {
    /// True for the errors caused by the shape of the input data rather than by
    /// the environment (files, encodings).
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            ForecastError::MalformedInput(_)
                | ForecastError::InvalidSplit { .. }
                | ForecastError::InvalidWindow(_)
                | ForecastError::Alignment { .. }
                | ForecastError::EmptyAlignment { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ForecastError::InvalidSplit { cut: 0, len: 10 };
        assert_eq!(err.to_string(), "Invalid split point 0 for a series of length 10");

        let err = ForecastError::Alignment {
            split_time: 2,
            window_size: 5,
        };
        assert!(err.to_string().contains("split time 2"));
    }

    #[test]
    fn test_data_errors() {
        assert!(ForecastError::InvalidWindow("w".into()).is_data_error());
        assert!(!ForecastError::OutputShape(2).is_data_error());
        assert!(ForecastError::EmptyAlignment {
            split_time: 9,
            len: 10,
            policy: AlignmentPolicy::DropLast,
        }
        .is_data_error());
    }
}
