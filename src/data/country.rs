//! Country filter for the global land temperature table
//!
//! Produces the intermediate cleaned table consumed by
//! [`SeriesLoader`](super::SeriesLoader): same columns as the raw table, only
//! the rows of one country, rows with missing fields removed.

use crate::error::Result;
use csv::{Reader, Writer};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{info, warn};

/// One row of `GlobalLandTemperaturesByCountry.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRecord {
    /// Month of the observation (first day of month)
    #[serde(rename = "dt")]
    pub date: Option<String>,
    /// Monthly average land temperature, °C
    #[serde(rename = "AverageTemperature")]
    pub average_temperature: Option<f64>,
    /// 95% confidence interval around the average
    #[serde(rename = "AverageTemperatureUncertainty")]
    pub uncertainty: Option<f64>,
    #[serde(rename = "Country")]
    pub country: Option<String>,
}

impl TemperatureRecord {
    /// Checks that every field is present
    pub fn is_complete(&self) -> bool {
        self.date.as_deref().map_or(false, |d| !d.is_empty())
            && self.average_temperature.is_some()
            && self.uncertainty.is_some()
            && self.country.as_deref().map_or(false, |c| !c.is_empty())
    }
}

/// Row counts from one filtering run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterSummary {
    pub rows_read: usize,
    pub rows_matched: usize,
    pub rows_dropped: usize,
    pub rows_written: usize,
}

/// Keeps the complete rows of a single country
#[derive(Debug, Clone)]
pub struct CountryFilter {
    country: String,
}

impl CountryFilter {
    pub fn new(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
        }
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    /// Filters `source` into `destination` (both CSV files)
    pub fn filter_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        source: P,
        destination: Q,
    ) -> Result<FilterSummary> {
        info!(
            "Filtering {:?} for {} into {:?}",
            source.as_ref(),
            self.country,
            destination.as_ref()
        );
        let input = File::open(source)?;
        let output = File::create(destination)?;
        self.filter(input, output)
    }

    /// Filters CSV rows from `input` and writes the kept rows to `output`
    pub fn filter<R: Read, W: Write>(&self, input: R, output: W) -> Result<FilterSummary> {
        let mut reader = Reader::from_reader(input);
        let mut writer = Writer::from_writer(output);
        let mut summary = FilterSummary::default();

        for result in reader.deserialize() {
            let record: TemperatureRecord = result?;
            summary.rows_read += 1;

            if record.country.as_deref() != Some(self.country.as_str()) {
                continue;
            }
            summary.rows_matched += 1;

            if !record.is_complete() {
                summary.rows_dropped += 1;
                continue;
            }

            writer.serialize(&record)?;
            summary.rows_written += 1;
        }

        writer.flush()?;

        if summary.rows_dropped > 0 {
            warn!(
                "Dropped {} of {} rows for {} with missing values",
                summary.rows_dropped, summary.rows_matched, self.country
            );
        }
        info!(
            "Kept {} rows for {} out of {} read",
            summary.rows_written, self.country, summary.rows_read
        );

        Ok(summary)
    }
}
