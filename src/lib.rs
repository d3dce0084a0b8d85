//! # Temperature RNN
//!
//! Forecasting a country's average land temperature one step ahead with a
//! convolutional + recurrent network.
//!
//! ## Modules
//!
//! - `data` - cleaning the raw country table and loading the univariate series
//! - `preprocessing` - train/validation split and shuffled, batched windows
//! - `model` - the `ForecastModel` trait and the Conv1D + LSTM network
//! - `forecast` - sliding-window prediction and alignment with the validation range
//! - `utils` - MSE / MAE evaluation
//! - `pipeline` - the whole run driven by one `PipelineConfig`
//!
//! ## Example
//!
//! ```rust,no_run
//! use temperature_rnn::prelude::*;
//!
//! fn main() -> temperature_rnn::Result<()> {
//!     let config = PipelineConfig::default()
//!         .with_model(ModelConfig::default().with_seed(42));
//!
//!     let report = Pipeline::new(config)?.run_path("data/turkey_temperature.csv")?;
//!     println!("{} for temperature forecast.", report.evaluation);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod forecast;
pub mod model;
pub mod pipeline;
pub mod preprocessing;
pub mod utils;

pub use config::PipelineConfig;
pub use data::{CountryFilter, SeriesLoader, SeriesView, TimeSeries};
pub use error::{ForecastError, Result};
pub use forecast::{AlignedForecast, AlignmentPolicy, Forecast, Forecaster};
pub use model::{ConvLstmNetwork, ForecastModel, ModelConfig, TrainingConfig, TrainingReport};
pub use pipeline::{Pipeline, PipelineReport};
pub use preprocessing::{split, SeriesSplit, SplitPoint, WindowDataset};
pub use utils::Evaluation;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::PipelineConfig;
    pub use crate::data::{CountryFilter, SeriesLoader, SeriesView, TimeSeries};
    pub use crate::error::{ForecastError, Result};
    pub use crate::forecast::{AlignedForecast, AlignmentPolicy, Forecast, Forecaster};
    pub use crate::model::{
        ConvLstmNetwork, ForecastModel, ModelConfig, TrainingConfig, TrainingReport,
    };
    pub use crate::pipeline::{Pipeline, PipelineReport};
    pub use crate::preprocessing::{split, Batch, SeriesSplit, SplitPoint, WindowDataset};
    pub use crate::utils::{mae, mse, Evaluation};
}
