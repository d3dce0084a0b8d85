//! # Forecasting and alignment
//!
//! Slides a window of `W` values over the whole series, predicts the next value
//! for each window in batches, and lines the predictions up with the
//! validation range.
//!
//! With `N` values there are `N - W` windows, starting at `0..N-W`, so
//! `forecast[i]` predicts `series[i + W]`.
//!
//! ```rust
//! use ndarray::{Array2, ArrayView2, Axis};
//! use temperature_rnn::forecast::{AlignmentPolicy, Forecaster};
//! use temperature_rnn::model::{ForecastModel, TrainingReport};
//! use temperature_rnn::preprocessing::WindowDataset;
//!
//! /// Predicts the last value of every window
//! struct Persistence;
//!
//! impl ForecastModel for Persistence {
//!     fn train(&mut self, dataset: &WindowDataset<'_>, _: usize) -> temperature_rnn::Result<TrainingReport> {
//!         Ok(TrainingReport::new(dataset.len(), dataset.num_batches()))
//!     }
//!
//!     fn predict(&self, inputs: ArrayView2<'_, f64>) -> Array2<f64> {
//!         inputs.column(inputs.ncols() - 1).to_owned().insert_axis(Axis(1))
//!     }
//! }
//!
//! let series: Vec<f64> = (0..10).map(f64::from).collect();
//! let forecast = Forecaster::new(4).forecast(&Persistence, &series, 3).unwrap();
//! assert_eq!(forecast.len(), 7);
//!
//! let aligned = forecast.align(&series, 6, AlignmentPolicy::DropLast).unwrap();
//! assert_eq!(aligned.actual, vec![6.0, 7.0, 8.0]);
//! ```

use crate::error::{ForecastError, Result};
use crate::model::ForecastModel;
use crate::preprocessing::validate_window;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Default number of windows per prediction call
pub const DEFAULT_FORECAST_BATCH: usize = 32;

/// Which forecast values are compared against the validation range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentPolicy {
    /// `forecast[S-W .. len-1]` against `series[S .. N-1]`; the final
    /// validation point is left out
    #[default]
    DropLast,
    /// `forecast[S-W ..]` against `series[S ..]`
    Full,
}

impl AlignmentPolicy {
    /// Number of prediction/observation pairs for a series of `len` values
    /// split at `split_time`
    pub fn compared_len(&self, len: usize, split_time: usize) -> usize {
        match self {
            AlignmentPolicy::DropLast => len.saturating_sub(1).saturating_sub(split_time),
            AlignmentPolicy::Full => len.saturating_sub(split_time),
        }
    }

    /// Checks that a split of a `len`-value series leaves at least one pair to
    /// compare, before any forecast is computed
    pub fn check(&self, len: usize, split_time: usize, window_size: usize) -> Result<()> {
        if split_time < window_size {
            return Err(ForecastError::Alignment {
                split_time,
                window_size,
            });
        }
        if split_time > len {
            return Err(ForecastError::InvalidSplit {
                cut: split_time,
                len,
            });
        }
        if self.compared_len(len, split_time) == 0 {
            return Err(ForecastError::EmptyAlignment {
                split_time,
                len,
                policy: *self,
            });
        }
        Ok(())
    }
}

impl fmt::Display for AlignmentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignmentPolicy::DropLast => write!(f, "drop-last"),
            AlignmentPolicy::Full => write!(f, "full"),
        }
    }
}

/// Runs a trained model over every window of a series
#[derive(Debug, Clone, Copy)]
pub struct Forecaster {
    batch_size: usize,
}

impl Forecaster {
    pub fn new(batch_size: usize) -> Self {
        Self { batch_size }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Predicts the value following every length-`window_size` window of
    /// `series`.
    ///
    /// Fails with `InvalidWindow` under the same conditions as
    /// [`WindowDataset::new`](crate::preprocessing::WindowDataset::new), and
    /// with `OutputShape` if the model returns more than one column.
    pub fn forecast<M: ForecastModel + ?Sized>(
        &self,
        model: &M,
        series: &[f64],
        window_size: usize,
    ) -> Result<Forecast> {
        validate_window(series.len(), window_size, self.batch_size)?;

        let count = series.len() - window_size;
        let mut values = Vec::with_capacity(count);

        let starts: Vec<usize> = (0..count).collect();
        for (batch_idx, chunk) in starts.chunks(self.batch_size).enumerate() {
            let inputs = Array2::from_shape_fn((chunk.len(), window_size), |(row, col)| {
                series[chunk[row] + col]
            });

            let outputs = model.predict(inputs.view());
            if outputs.ncols() != 1 {
                return Err(ForecastError::OutputShape(outputs.ncols()));
            }
            values.extend(outputs.column(0).iter().copied());

            debug!("Forecast batch {}: {} windows", batch_idx + 1, chunk.len());
        }

        Ok(Forecast {
            values,
            window_size,
        })
    }
}

impl Default for Forecaster {
    fn default() -> Self {
        Self::new(DEFAULT_FORECAST_BATCH)
    }
}

/// One prediction per window, in window order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub values: Vec<f64>,
    pub window_size: usize,
}

impl Forecast {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Series index predicted by `values[i]`
    pub fn target_index(&self, i: usize) -> usize {
        i + self.window_size
    }

    /// Pairs predictions with the observed values from `split_time` on.
    ///
    /// `series` must be the series the forecast was computed from.
    pub fn align(
        &self,
        series: &[f64],
        split_time: usize,
        policy: AlignmentPolicy,
    ) -> Result<AlignedForecast> {
        if series.len() != self.values.len() + self.window_size {
            return Err(ForecastError::MalformedInput(format!(
                "forecast of {} values with window {} does not match a series of length {}",
                self.values.len(),
                self.window_size,
                series.len()
            )));
        }
        policy.check(series.len(), split_time, self.window_size)?;

        let first = split_time - self.window_size;
        let count = policy.compared_len(series.len(), split_time);

        let predicted = self.values[first..first + count].to_vec();
        let actual = series[split_time..split_time + count].to_vec();

        Ok(AlignedForecast {
            start: split_time,
            predicted,
            actual,
        })
    }
}

/// Predictions and observations over the same index range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedForecast {
    /// Series index of the first pair
    pub start: usize,
    pub predicted: Vec<f64>,
    pub actual: Vec<f64>,
}

impl AlignedForecast {
    pub fn len(&self) -> usize {
        self.predicted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TrainingReport;
    use crate::preprocessing::WindowDataset;
    use ndarray::{ArrayView2, Axis};

    /// Predicts the last value of every window
    struct Persistence;

    impl ForecastModel for Persistence {
        fn train(&mut self, dataset: &WindowDataset<'_>, _: usize) -> Result<TrainingReport> {
            Ok(TrainingReport::new(dataset.len(), dataset.num_batches()))
        }

        fn predict(&self, inputs: ArrayView2<'_, f64>) -> Array2<f64> {
            inputs
                .column(inputs.ncols() - 1)
                .to_owned()
                .insert_axis(Axis(1))
        }
    }

    /// Returns two columns per window
    struct TwoOutputs;

    impl ForecastModel for TwoOutputs {
        fn train(&mut self, dataset: &WindowDataset<'_>, _: usize) -> Result<TrainingReport> {
            Ok(TrainingReport::new(dataset.len(), dataset.num_batches()))
        }

        fn predict(&self, inputs: ArrayView2<'_, f64>) -> Array2<f64> {
            Array2::zeros((inputs.nrows(), 2))
        }
    }

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn test_one_value_per_window() {
        let series = ramp(10);
        let forecast = Forecaster::new(2).forecast(&Persistence, &series, 3).unwrap();

        assert_eq!(forecast.len(), 7);
        // window [i, i+3) ends at series[i + 2]
        assert_eq!(forecast.values, vec![2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert_eq!(forecast.target_index(0), 3);
        assert_eq!(forecast.target_index(6), 9);
    }

    #[test]
    fn test_drop_last_alignment() {
        let series = ramp(10);
        let forecast = Forecaster::default().forecast(&Persistence, &series, 3).unwrap();

        let aligned = forecast.align(&series, 6, AlignmentPolicy::DropLast).unwrap();

        assert_eq!(aligned.start, 6);
        assert_eq!(aligned.predicted, forecast.values[3..6].to_vec());
        assert_eq!(aligned.actual, series[6..9].to_vec());
    }

    #[test]
    fn test_full_alignment() {
        let series = ramp(10);
        let forecast = Forecaster::default().forecast(&Persistence, &series, 3).unwrap();

        let aligned = forecast.align(&series, 6, AlignmentPolicy::Full).unwrap();

        assert_eq!(aligned.predicted, forecast.values[3..].to_vec());
        assert_eq!(aligned.actual, series[6..].to_vec());
        assert_eq!(aligned.len(), 4);
    }

    #[test]
    fn test_twenty_point_scenario() {
        let series = ramp(20);
        let forecast = Forecaster::new(32).forecast(&Persistence, &series, 5).unwrap();
        assert_eq!(forecast.len(), 15);

        let aligned = forecast.align(&series, 15, AlignmentPolicy::default()).unwrap();
        assert_eq!(aligned.predicted, forecast.values[10..14].to_vec());
        assert_eq!(aligned.actual, series[15..19].to_vec());
    }

    #[test]
    fn test_batch_size_does_not_change_values() {
        let series: Vec<f64> = (0..37).map(|i| (i as f64 * 0.4).cos()).collect();
        let reference = Forecaster::new(1).forecast(&Persistence, &series, 4).unwrap();

        for batch_size in [2, 5, 33, 100] {
            let forecast = Forecaster::new(batch_size)
                .forecast(&Persistence, &series, 4)
                .unwrap();
            assert_eq!(forecast, reference);
        }
    }

    #[test]
    fn test_split_before_first_target() {
        let series = ramp(10);
        let forecast = Forecaster::default().forecast(&Persistence, &series, 3).unwrap();

        let err = forecast.align(&series, 2, AlignmentPolicy::DropLast).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::Alignment {
                split_time: 2,
                window_size: 3
            }
        ));
    }

    #[test]
    fn test_split_at_window_size() {
        let series = ramp(10);
        let forecast = Forecaster::default().forecast(&Persistence, &series, 3).unwrap();

        let aligned = forecast.align(&series, 3, AlignmentPolicy::Full).unwrap();
        assert_eq!(aligned.predicted, forecast.values);
        assert_eq!(aligned.actual, series[3..].to_vec());
    }

    #[test]
    fn test_nothing_left_to_compare() {
        let series = ramp(10);
        let forecast = Forecaster::default().forecast(&Persistence, &series, 3).unwrap();

        // drop-last leaves no pair when only the last point is held out
        let err = forecast.align(&series, 9, AlignmentPolicy::DropLast).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::EmptyAlignment {
                split_time: 9,
                len: 10,
                policy: AlignmentPolicy::DropLast
            }
        ));
        assert!(err.to_string().contains("drop-last"));

        let aligned = forecast.align(&series, 9, AlignmentPolicy::Full).unwrap();
        assert_eq!(aligned.actual, vec![9.0]);

        assert!(matches!(
            forecast.align(&series, 10, AlignmentPolicy::Full),
            Err(ForecastError::EmptyAlignment { .. })
        ));
        assert!(matches!(
            forecast.align(&series, 11, AlignmentPolicy::Full),
            Err(ForecastError::InvalidSplit { cut: 11, len: 10 })
        ));
    }

    #[test]
    fn test_compared_len() {
        assert_eq!(AlignmentPolicy::DropLast.compared_len(20, 15), 4);
        assert_eq!(AlignmentPolicy::Full.compared_len(20, 15), 5);
        assert_eq!(AlignmentPolicy::DropLast.compared_len(20, 19), 0);
        assert!(AlignmentPolicy::DropLast.check(20, 15, 5).is_ok());
    }

    #[test]
    fn test_invalid_window() {
        let series = ramp(3);
        let forecaster = Forecaster::default();

        assert!(matches!(
            forecaster.forecast(&Persistence, &series, 3),
            Err(ForecastError::InvalidWindow(_))
        ));
        assert!(matches!(
            forecaster.forecast(&Persistence, &series, 0),
            Err(ForecastError::InvalidWindow(_))
        ));
        assert!(matches!(
            Forecaster::new(0).forecast(&Persistence, &series, 1),
            Err(ForecastError::InvalidWindow(_))
        ));
    }

    #[test]
    fn test_multi_column_output_rejected() {
        let series = ramp(10);
        let err = Forecaster::default()
            .forecast(&TwoOutputs, &series, 3)
            .unwrap_err();
        assert!(matches!(err, ForecastError::OutputShape(2)));
    }

    #[test]
    fn test_mismatched_series() {
        let series = ramp(10);
        let forecast = Forecaster::default().forecast(&Persistence, &series, 3).unwrap();

        let other = ramp(12);
        assert!(forecast.align(&other, 6, AlignmentPolicy::Full).is_err());
    }
}
