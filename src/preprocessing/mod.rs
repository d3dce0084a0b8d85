//! # Preprocessing
//!
//! Framing a univariate series as a supervised learning problem:
//! - train/validation split at a cut point
//! - sliding windows of `W` inputs plus one target, shuffled and batched
//!
//! ```rust
//! use temperature_rnn::data::TimeSeries;
//! use temperature_rnn::preprocessing::{split, WindowDataset};
//!
//! let series = TimeSeries::new((0..20).map(f64::from).collect());
//! let parts = split(&series, 15).unwrap();
//!
//! let dataset = WindowDataset::from_view(parts.train, 5, 32, 0).unwrap();
//! assert_eq!(dataset.len(), 10);
//! ```

mod split;
mod window;

pub use split::{split, SeriesSplit, SplitPoint};
pub use window::{
    validate_window, Batch, ShuffleBuffer, Window, WindowBatches, WindowDataset, WindowIter,
};
