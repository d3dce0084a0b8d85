//! # Data module
//!
//! - `country` - cleaning the raw global temperature table down to one country
//! - `loader` - reading the cleaned table as a univariate series
//! - `types` - series and series views

mod country;
mod loader;
mod types;

pub use country::{CountryFilter, FilterSummary, TemperatureRecord};
pub use loader::{SeriesLoader, VALUE_COLUMN};
pub use types::{SeriesView, TimeSeries};
