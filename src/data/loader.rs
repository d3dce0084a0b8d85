//! Loading a univariate series from CSV
//!
//! The expected layout is a header row followed by one row per observation,
//! with the observed value in column 1. Column 0 (usually the date) is ignored.

use super::types::TimeSeries;
use crate::error::{ForecastError, Result};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Column holding the observed value
pub const VALUE_COLUMN: usize = 1;

/// Reads a [`TimeSeries`] from tabular input
pub struct SeriesLoader;

impl SeriesLoader {
    /// Loads a series from a CSV file
    pub fn load_path<P: AsRef<Path>>(path: P) -> Result<TimeSeries> {
        let path = path.as_ref();
        info!("Loading series from {:?}", path);
        let file = File::open(path)?;
        Self::load(file)
    }

    /// Loads a series from any CSV reader.
    ///
    /// Step indices are assigned in row order starting at 0. Fails if a value
    /// cannot be parsed as a finite real number or if there are no data rows.
    pub fn load<R: Read>(reader: R) -> Result<TimeSeries> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut values = Vec::new();

        for (row, record) in reader.records().enumerate() {
            let record = record?;
            // +2: one for the header, one for 1-based line numbers
            let line = row + 2;

            let field = record.get(VALUE_COLUMN).ok_or_else(|| {
                ForecastError::MalformedInput(format!(
                    "line {}: missing column {}",
                    line, VALUE_COLUMN
                ))
            })?;

            let value: f64 = field.trim().parse().map_err(|_| {
                ForecastError::MalformedInput(format!(
                    "line {}: cannot parse {:?} as a number",
                    line, field
                ))
            })?;

            if !value.is_finite() {
                return Err(ForecastError::MalformedInput(format!(
                    "line {}: value {} is not finite",
                    line, value
                )));
            }

            values.push(value);
        }

        if values.is_empty() {
            return Err(ForecastError::MalformedInput(
                "table has no data rows".to_string(),
            ));
        }

        debug!("Loaded {} observations", values.len());
        Ok(TimeSeries::new(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_assigns_steps() {
        let csv = "dt,AverageTemperature,Uncertainty,Country\n\
                   1850-01-01,1.5,0.3,Turkey\n\
                   1850-02-01, 2.25 ,0.3,Turkey\n\
                   1850-03-01,-4,0.3,Turkey\n";

        let series = SeriesLoader::load(csv.as_bytes()).unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series.values(), &[1.5, 2.25, -4.0]);
        assert_eq!(series.times(), 0..3);
    }

    #[test]
    fn test_unparseable_value() {
        let csv = "dt,value\n2000-01-01,1.0\n2000-02-01,abc\n";
        let err = SeriesLoader::load(csv.as_bytes()).unwrap_err();

        assert!(matches!(err, ForecastError::MalformedInput(_)));
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_non_finite_value() {
        for bad in ["NaN", "inf", "-inf"] {
            let csv = format!("dt,value\n2000-01-01,1.0\n2000-02-01,{}\n", bad);
            let err = SeriesLoader::load(csv.as_bytes()).unwrap_err();

            assert!(matches!(err, ForecastError::MalformedInput(_)));
            assert!(err.to_string().contains("not finite"), "{}", err);
        }
    }

    #[test]
    fn test_missing_column() {
        let csv = "dt,value\n2000-01-01\n";
        let err = SeriesLoader::load(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ForecastError::MalformedInput(_)));
    }

    #[test]
    fn test_empty_value_is_malformed() {
        let csv = "dt,value\n2000-01-01,\n";
        assert!(matches!(
            SeriesLoader::load(csv.as_bytes()),
            Err(ForecastError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_header_only() {
        let csv = "dt,value\n";
        assert!(matches!(
            SeriesLoader::load(csv.as_bytes()),
            Err(ForecastError::MalformedInput(_))
        ));
    }
}
