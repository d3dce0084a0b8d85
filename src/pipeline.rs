//! End-to-end run: load → split → window → train → forecast → align → evaluate

use crate::config::PipelineConfig;
use crate::data::{SeriesLoader, TimeSeries};
use crate::error::Result;
use crate::forecast::{AlignedForecast, Forecast, Forecaster};
use crate::model::{ConvLstmNetwork, ForecastModel, TrainingReport};
use crate::preprocessing::WindowDataset;
use crate::utils::Evaluation;
use std::path::Path;
use tracing::info;

/// Everything one run produced
#[derive(Debug, Clone)]
pub struct PipelineReport<M = ConvLstmNetwork> {
    pub split_time: usize,
    pub train_len: usize,
    pub valid_len: usize,
    pub training: TrainingReport,
    pub forecast: Forecast,
    pub aligned: AlignedForecast,
    pub evaluation: Evaluation,
    /// The trained model
    pub model: M,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Loads the series from a CSV file and runs the pipeline on it
    pub fn run_path<P: AsRef<Path>>(&self, path: P) -> Result<PipelineReport> {
        let series = SeriesLoader::load_path(path)?;
        self.run(&series)
    }

    /// Trains a fresh [`ConvLstmNetwork`] built from the configuration
    pub fn run(&self, series: &TimeSeries) -> Result<PipelineReport> {
        let model = ConvLstmNetwork::new(self.config.model.clone(), self.config.training.clone())?;
        model.summary();
        self.run_with_model(series, model)
    }

    /// Trains and evaluates any model
    pub fn run_with_model<M: ForecastModel>(
        &self,
        series: &TimeSeries,
        mut model: M,
    ) -> Result<PipelineReport<M>> {
        let config = &self.config;
        info!("Series has {} points", series.len());

        let parts = config.split.apply(series)?;
        info!(
            "Split at {}: {} training points, {} validation points",
            parts.split_time,
            parts.train.len(),
            parts.valid.len()
        );

        let dataset = WindowDataset::from_view(
            parts.train,
            config.window_size,
            config.batch_size,
            config.shuffle_buffer,
        )?;
        config
            .alignment
            .check(series.len(), parts.split_time, config.window_size)?;

        let training = model.train(&dataset, config.training.epochs)?;

        let forecast = Forecaster::new(config.forecast_batch_size).forecast(
            &model,
            series.values(),
            config.window_size,
        )?;
        info!("Forecast {} values", forecast.len());

        let aligned = forecast.align(series.values(), parts.split_time, config.alignment)?;
        let evaluation = Evaluation::from_aligned(&aligned)?;
        info!("Evaluated {} points: {}", evaluation.points, evaluation);

        Ok(PipelineReport {
            split_time: parts.split_time,
            train_len: parts.train.len(),
            valid_len: parts.valid.len(),
            training,
            forecast,
            aligned,
            evaluation,
            model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ForecastError;
    use crate::forecast::AlignmentPolicy;
    use crate::model::TrainingConfig;
    use crate::preprocessing::SplitPoint;
    use approx::assert_relative_eq;
    use ndarray::{Array1, Array2, ArrayView2, Axis};

    /// Predicts the mean of the training targets
    #[derive(Debug, Default)]
    struct MeanModel {
        mean: f64,
        epochs_seen: usize,
    }

    impl ForecastModel for MeanModel {
        fn train(&mut self, dataset: &WindowDataset<'_>, epochs: usize) -> Result<TrainingReport> {
            let targets: Vec<f64> = dataset.windows().map(|w| w.target).collect();
            self.mean = targets.iter().sum::<f64>() / targets.len() as f64;
            self.epochs_seen += epochs;

            let mut report = TrainingReport::new(dataset.len(), dataset.num_batches());
            for _ in 0..epochs {
                report.push_epoch(0.0, 0.0);
            }
            Ok(report)
        }

        fn predict(&self, inputs: ArrayView2<'_, f64>) -> Array2<f64> {
            Array1::from_elem(inputs.nrows(), self.mean).insert_axis(Axis(1))
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig::new()
            .with_window_size(5)
            .with_batch_size(4)
            .with_shuffle_buffer(8)
            .with_split(SplitPoint::At(15))
            .with_training(TrainingConfig::default().with_epochs(3))
    }

    #[test]
    fn test_twenty_point_run() {
        let series = TimeSeries::new((0..20).map(f64::from).collect());
        let pipeline = Pipeline::new(config()).unwrap();

        let report = pipeline.run_with_model(&series, MeanModel::default()).unwrap();

        assert_eq!(report.split_time, 15);
        assert_eq!(report.train_len, 15);
        assert_eq!(report.valid_len, 5);
        assert_eq!(report.training.windows_per_epoch, 10);
        assert_eq!(report.training.epochs(), 3);
        assert_eq!(report.model.epochs_seen, 3);
        assert_eq!(report.forecast.len(), 15);
        assert_eq!(report.aligned.actual, vec![15.0, 16.0, 17.0, 18.0]);

        // targets of the training windows are 5..=14
        assert_relative_eq!(report.model.mean, 9.5);
        assert_eq!(report.evaluation.points, 4);
        let expected_mae = [5.5, 6.5, 7.5, 8.5].iter().sum::<f64>() / 4.0;
        assert_relative_eq!(report.evaluation.mae, expected_mae);
    }

    #[test]
    fn test_full_alignment_run() {
        let series = TimeSeries::new((0..20).map(f64::from).collect());
        let pipeline = Pipeline::new(config().with_alignment(AlignmentPolicy::Full)).unwrap();

        let report = pipeline.run_with_model(&series, MeanModel::default()).unwrap();
        assert_eq!(report.aligned.actual, vec![15.0, 16.0, 17.0, 18.0, 19.0]);
    }

    #[test]
    fn test_split_shorter_than_window() {
        let series = TimeSeries::new((0..20).map(f64::from).collect());
        let pipeline = Pipeline::new(config().with_split(SplitPoint::At(3))).unwrap();

        let err = pipeline
            .run_with_model(&series, MeanModel::default())
            .unwrap_err();
        assert!(matches!(err, ForecastError::InvalidWindow(_)));
    }

    #[test]
    fn test_split_out_of_range() {
        let series = TimeSeries::new((0..20).map(f64::from).collect());
        let pipeline = Pipeline::new(config().with_split(SplitPoint::At(20))).unwrap();

        let err = pipeline
            .run_with_model(&series, MeanModel::default())
            .unwrap_err();
        assert!(matches!(err, ForecastError::InvalidSplit { cut: 20, len: 20 }));
    }

    #[test]
    fn test_drop_last_needs_two_validation_points() {
        let series = TimeSeries::new((0..20).map(f64::from).collect());
        let pipeline = Pipeline::new(config().with_split(SplitPoint::At(19))).unwrap();

        let err = pipeline
            .run_with_model(&series, MeanModel::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ForecastError::EmptyAlignment {
                split_time: 19,
                len: 20,
                policy: AlignmentPolicy::DropLast
            }
        ));

        // full alignment still compares the final point
        let pipeline = Pipeline::new(
            config()
                .with_split(SplitPoint::At(19))
                .with_alignment(AlignmentPolicy::Full),
        )
        .unwrap();
        let report = pipeline.run_with_model(&series, MeanModel::default()).unwrap();
        assert_eq!(report.evaluation.points, 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(Pipeline::new(config().with_window_size(0)).is_err());
    }
}
