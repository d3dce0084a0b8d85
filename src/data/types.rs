//! Univariate series types

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Ordered sequence of observations with implicit step indices `0..len`.
///
/// Step indices are not stored: they always start at 0 and grow by one, so the
/// times and values stay aligned and gap-free by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    values: Vec<f64>,
}

impl TimeSeries {
    /// Creates a series from values in time order
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Checks whether the series is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Observed values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Step indices, `0..len`
    pub fn times(&self) -> Range<usize> {
        0..self.values.len()
    }

    /// `(step, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values.iter().copied().enumerate()
    }

    /// Borrowed view of the whole series
    pub fn view(&self) -> SeriesView<'_> {
        SeriesView::new(0, &self.values)
    }

    /// Borrowed view of `range`, keeping the original step indices.
    ///
    /// Returns `None` if the range falls outside the series.
    pub fn slice(&self, range: Range<usize>) -> Option<SeriesView<'_>> {
        let start = range.start;
        self.values.get(range).map(|values| SeriesView::new(start, values))
    }
}

impl From<Vec<f64>> for TimeSeries {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

/// Read-only window onto a contiguous part of a [`TimeSeries`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesView<'a> {
    offset: usize,
    values: &'a [f64],
}

impl<'a> SeriesView<'a> {
    /// Creates a view whose first element sits at step `offset`
    pub fn new(offset: usize, values: &'a [f64]) -> Self {
        Self { offset, values }
    }

    /// Step index of the first element
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Checks whether the view is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Observed values
    pub fn values(&self) -> &'a [f64] {
        self.values
    }

    /// Step indices covered by the view
    pub fn times(&self) -> Range<usize> {
        self.offset..self.offset + self.values.len()
    }
}
