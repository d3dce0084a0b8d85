//! Train/validation split at a fixed cut point

use crate::data::{SeriesView, TimeSeries};
use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Training prefix and validation suffix of one series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesSplit<'a> {
    /// First step of the validation range
    pub split_time: usize,
    /// Steps `[0, split_time)`
    pub train: SeriesView<'a>,
    /// Steps `[split_time, len)`
    pub valid: SeriesView<'a>,
}

/// Splits `series` into `[0, cut)` and `[cut, len)`.
///
/// Both parts must be non-empty, so `cut` has to lie in `1..len`.
pub fn split(series: &TimeSeries, cut: usize) -> Result<SeriesSplit<'_>> {
    let len = series.len();
    if cut == 0 || cut >= len {
        return Err(ForecastError::InvalidSplit { cut, len });
    }

    let (train, valid) = series.values().split_at(cut);
    Ok(SeriesSplit {
        split_time: cut,
        train: SeriesView::new(0, train),
        valid: SeriesView::new(cut, valid),
    })
}

/// Where to cut a series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitPoint {
    /// Fixed step index
    At(usize),
    /// Fraction of the series used for training, `floor(len * ratio)`
    Ratio(f64),
}

impl SplitPoint {
    /// Resolves the cut index for a series of length `len`
    pub fn resolve(&self, len: usize) -> Result<usize> {
        let cut = match *self {
            SplitPoint::At(cut) => cut,
            SplitPoint::Ratio(ratio) => {
                if !(ratio > 0.0 && ratio < 1.0) {
                    return Err(ForecastError::Config(format!(
                        "split ratio must lie in (0, 1), got {}",
                        ratio
                    )));
                }
                (len as f64 * ratio).floor() as usize
            }
        };

        if cut == 0 || cut >= len {
            return Err(ForecastError::InvalidSplit { cut, len });
        }
        Ok(cut)
    }

    /// Resolves the cut and splits `series`
    pub fn apply<'a>(&self, series: &'a TimeSeries) -> Result<SeriesSplit<'a>> {
        split(series, self.resolve(series.len())?)
    }
}

impl Default for SplitPoint {
    fn default() -> Self {
        SplitPoint::At(2270)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> TimeSeries {
        TimeSeries::new((0..n).map(|i| i as f64).collect())
    }

    #[test]
    fn test_split_partitions_series() {
        let series = ramp(20);

        for cut in 1..20 {
            let parts = split(&series, cut).unwrap();

            assert_eq!(parts.train.len() + parts.valid.len(), series.len());
            assert_eq!(parts.train.values(), &series.values()[..cut]);
            assert_eq!(parts.valid.values(), &series.values()[cut..]);
            assert_eq!(parts.valid.times(), cut..20);
        }
    }

    #[test]
    fn test_split_bounds() {
        let series = ramp(10);

        assert!(matches!(
            split(&series, 0),
            Err(ForecastError::InvalidSplit { cut: 0, len: 10 })
        ));
        assert!(matches!(
            split(&series, 10),
            Err(ForecastError::InvalidSplit { cut: 10, len: 10 })
        ));
        assert!(split(&series, 11).is_err());
    }

    #[test]
    fn test_ratio_split() {
        // 2838 * 0.8 = 2270.4
        assert_eq!(SplitPoint::Ratio(0.8).resolve(2838).unwrap(), 2270);
        assert!(SplitPoint::Ratio(1.0).resolve(100).is_err());
        assert!(matches!(
            SplitPoint::Ratio(0.01).resolve(10),
            Err(ForecastError::InvalidSplit { cut: 0, len: 10 })
        ));
    }

    #[test]
    fn test_apply() {
        let series = ramp(20);
        let parts = SplitPoint::At(15).apply(&series).unwrap();
        assert_eq!(parts.train.len(), 15);
        assert_eq!(parts.valid.len(), 5);
    }
}
