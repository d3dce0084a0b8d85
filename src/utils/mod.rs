//! Utility functions

mod metrics;

pub use metrics::{mae, mse, rmse, Evaluation};
