//! Windowed dataset for supervised training on a univariate series
//!
//! A series of length `N` is cut into the `N - W` overlapping windows of
//! length `W + 1` (start index sliding by one, incomplete remainder dropped).
//! The first `W` values of a window are the model input, the last one is the
//! target. Windows are produced lazily, optionally shuffled through a bounded
//! reservoir, and grouped into batches. The final batch is kept even when it
//! is shorter than `batch_size`.

use crate::data::SeriesView;
use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::slice;

/// One training example
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window<'a> {
    /// Index of the first input value in the source sequence
    pub start: usize,
    /// `W` consecutive values
    pub input: &'a [f64],
    /// Value right after the input
    pub target: f64,
}

/// Lazy iterator over all windows of a sequence, in order
#[derive(Debug, Clone)]
pub struct WindowIter<'a> {
    inner: slice::Windows<'a, f64>,
    next_start: usize,
}

impl<'a> WindowIter<'a> {
    fn new(values: &'a [f64], window_size: usize) -> Self {
        Self {
            inner: values.windows(window_size + 1),
            next_start: 0,
        }
    }
}

impl<'a> Iterator for WindowIter<'a> {
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let values = self.inner.next()?;
        let (input, target) = values.split_at(values.len() - 1);
        let start = self.next_start;
        self.next_start += 1;
        Some(Window {
            start,
            input,
            target: target[0],
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for WindowIter<'_> {}

/// Approximate shuffle with a bounded reservoir.
///
/// Keeps up to `capacity` pending items; each pull emits a uniformly chosen
/// pending item and the reservoir is topped up from the source on the next
/// pull. With `capacity >= len` this is a uniform permutation.
pub struct ShuffleBuffer<I: Iterator> {
    source: I,
    buffer: Vec<I::Item>,
    capacity: usize,
    rng: StdRng,
}

impl<I: Iterator> ShuffleBuffer<I> {
    pub fn new(source: I, capacity: usize, rng: StdRng) -> Self {
        // the reservoir never holds more than the source yields
        let reserved = capacity.min(source.size_hint().0);
        Self {
            source,
            buffer: Vec::with_capacity(reserved),
            capacity: capacity.max(1),
            rng,
        }
    }
}

impl<I: Iterator> Iterator for ShuffleBuffer<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        while self.buffer.len() < self.capacity {
            match self.source.next() {
                Some(item) => self.buffer.push(item),
                None => break,
            }
        }

        if self.buffer.is_empty() {
            return None;
        }

        let index = self.rng.gen_range(0..self.buffer.len());
        Some(self.buffer.swap_remove(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (low, high) = self.source.size_hint();
        let pending = self.buffer.len();
        (low + pending, high.map(|h| h + pending))
    }
}

/// A batch of windows
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Inputs `[batch, window_size]`
    pub inputs: Array2<f64>,
    /// Targets `[batch]`
    pub targets: Array1<f64>,
    /// Start index of every window, in batch order
    pub starts: Vec<usize>,
}

impl Batch {
    fn from_windows(windows: &[Window<'_>], window_size: usize) -> Self {
        let inputs = Array2::from_shape_fn((windows.len(), window_size), |(row, col)| {
            windows[row].input[col]
        });
        let targets = windows.iter().map(|w| w.target).collect::<Array1<f64>>();
        let starts = windows.iter().map(|w| w.start).collect();

        Self {
            inputs,
            targets,
            starts,
        }
    }

    /// Number of windows in the batch
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

enum WindowSource<'a> {
    Ordered(WindowIter<'a>),
    Shuffled(ShuffleBuffer<WindowIter<'a>>),
}

impl<'a> Iterator for WindowSource<'a> {
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            WindowSource::Ordered(iter) => iter.next(),
            WindowSource::Shuffled(iter) => iter.next(),
        }
    }
}

/// Lazy, finite sequence of batches produced by [`WindowDataset::batches`]
pub struct WindowBatches<'a> {
    source: WindowSource<'a>,
    window_size: usize,
    batch_size: usize,
}

impl Iterator for WindowBatches<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Self::Item> {
        let windows: Vec<Window<'_>> = self.source.by_ref().take(self.batch_size).collect();
        if windows.is_empty() {
            return None;
        }
        Some(Batch::from_windows(&windows, self.window_size))
    }
}

/// Windowed, optionally shuffled, batched view over a sequence
#[derive(Debug, Clone, Copy)]
pub struct WindowDataset<'a> {
    values: &'a [f64],
    window_size: usize,
    batch_size: usize,
    shuffle_buffer: usize,
}

impl<'a> WindowDataset<'a> {
    /// Creates a dataset over `values`.
    ///
    /// `shuffle_buffer == 0` disables shuffling. Fails if `window_size` or
    /// `batch_size` is zero, or if `values` cannot hold a single window of
    /// `window_size + 1` elements.
    pub fn new(
        values: &'a [f64],
        window_size: usize,
        batch_size: usize,
        shuffle_buffer: usize,
    ) -> Result<Self> {
        validate_window(values.len(), window_size, batch_size)?;

        Ok(Self {
            values,
            window_size,
            batch_size,
            shuffle_buffer,
        })
    }

    /// Creates a dataset over the values of a series view
    pub fn from_view(
        view: SeriesView<'a>,
        window_size: usize,
        batch_size: usize,
        shuffle_buffer: usize,
    ) -> Result<Self> {
        Self::new(view.values(), window_size, batch_size, shuffle_buffer)
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn shuffle_buffer(&self) -> usize {
        self.shuffle_buffer
    }

    /// Number of windows, `len - window_size`
    pub fn len(&self) -> usize {
        self.values.len() - self.window_size
    }

    /// Always false: construction requires at least one window
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of batches per pass, counting the short final batch
    pub fn num_batches(&self) -> usize {
        (self.len() + self.batch_size - 1) / self.batch_size
    }

    /// All windows in series order, before shuffling and batching
    pub fn windows(&self) -> WindowIter<'a> {
        WindowIter::new(self.values, self.window_size)
    }

    /// Starts a new pass over the batches.
    ///
    /// Every call begins again at the first window; with shuffling enabled the
    /// order is drawn afresh from `rng`.
    pub fn batches<R: Rng>(&self, rng: &mut R) -> WindowBatches<'a> {
        let windows = self.windows();
        let source = if self.shuffle_buffer > 0 {
            let shuffle_rng = StdRng::seed_from_u64(rng.gen());
            WindowSource::Shuffled(ShuffleBuffer::new(windows, self.shuffle_buffer, shuffle_rng))
        } else {
            WindowSource::Ordered(windows)
        };

        WindowBatches {
            source,
            window_size: self.window_size,
            batch_size: self.batch_size,
        }
    }

    /// Batches in series order, ignoring the shuffle buffer
    pub fn ordered_batches(&self) -> WindowBatches<'a> {
        WindowBatches {
            source: WindowSource::Ordered(self.windows()),
            window_size: self.window_size,
            batch_size: self.batch_size,
        }
    }
}

/// Checks that a sequence of `len` values supports windows of `window_size`
/// inputs plus one target, and that `batch_size` is usable.
pub fn validate_window(len: usize, window_size: usize, batch_size: usize) -> Result<()> {
    if window_size < 1 {
        return Err(ForecastError::InvalidWindow(
            "window size must be at least 1".to_string(),
        ));
    }
    if batch_size < 1 {
        return Err(ForecastError::InvalidWindow(
            "batch size must be at least 1".to_string(),
        ));
    }
    if len < window_size + 1 {
        return Err(ForecastError::InvalidWindow(format!(
            "series of length {} is too short for window size {} (need at least {})",
            len,
            window_size,
            window_size + 1
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn test_window_count_and_targets() {
        for n in 2..30 {
            for w in 1..n {
                let values = ramp(n);
                let dataset = WindowDataset::new(&values, w, 4, 0).unwrap();
                let windows: Vec<_> = dataset.windows().collect();

                assert_eq!(windows.len(), n - w);
                assert_eq!(dataset.len(), n - w);
                for (i, window) in windows.iter().enumerate() {
                    assert_eq!(window.start, i);
                    assert_eq!(window.input.len(), w);
                    assert_eq!(window.target, (i + w) as f64);
                }
            }
        }
    }

    #[test]
    fn test_train_windows_of_ramp() {
        let values = ramp(15);
        let dataset = WindowDataset::new(&values, 5, 32, 0).unwrap();
        let windows: Vec<_> = dataset.windows().collect();

        assert_eq!(windows.len(), 10);
        assert_eq!(windows[0].input, &[0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(windows[0].target, 5.0);
        assert_eq!(windows[1].input, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(windows[1].target, 6.0);
        assert_eq!(windows[9].target, 14.0);
    }

    #[test]
    fn test_short_final_batch_is_kept() {
        let values = ramp(100);
        let dataset = WindowDataset::new(&values, 10, 32, 0).unwrap();
        let batches: Vec<_> = dataset.ordered_batches().collect();

        // 90 windows: 32 + 32 + 26
        assert_eq!(dataset.num_batches(), 3);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].inputs.dim(), (32, 10));
        assert_eq!(batches[2].len(), 26);
        assert_eq!(batches[2].targets[25], 99.0);
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let values = ramp(50);
        let dataset = WindowDataset::new(&values, 3, 8, 10).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let mut targets: Vec<f64> = dataset
            .batches(&mut rng)
            .flat_map(|b| b.targets.to_vec())
            .collect();
        assert_eq!(targets.len(), 47);

        targets.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let expected: Vec<f64> = (3..50).map(|i| i as f64).collect();
        assert_eq!(targets, expected);
    }

    #[test]
    fn test_buffer_larger_than_dataset() {
        let values = ramp(20);
        let dataset = WindowDataset::new(&values, 3, 4, usize::MAX / 8).unwrap();
        let mut rng = StdRng::seed_from_u64(5);

        let mut starts: Vec<usize> = dataset.batches(&mut rng).flat_map(|b| b.starts).collect();
        assert_eq!(starts.len(), 17);

        starts.sort_unstable();
        assert_eq!(starts, (0..17).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffled_batches_keep_windows_intact() {
        let values = ramp(40);
        let dataset = WindowDataset::new(&values, 4, 5, 16).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        for batch in dataset.batches(&mut rng) {
            for (row, &start) in batch.starts.iter().enumerate() {
                for col in 0..4 {
                    assert_eq!(batch.inputs[[row, col]], (start + col) as f64);
                }
                assert_eq!(batch.targets[row], (start + 4) as f64);
            }
        }
    }

    #[test]
    fn test_passes_restart_and_reshuffle() {
        let values = ramp(200);
        let dataset = WindowDataset::new(&values, 2, 200, 1000).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        let first: Vec<usize> = dataset.batches(&mut rng).flat_map(|b| b.starts).collect();
        let second: Vec<usize> = dataset.batches(&mut rng).flat_map(|b| b.starts).collect();

        assert_eq!(first.len(), 198);
        assert_eq!(second.len(), 198);
        assert_ne!(first, second);

        // Same seed, same order
        let mut rng_a = StdRng::seed_from_u64(11);
        let mut rng_b = StdRng::seed_from_u64(11);
        let a: Vec<usize> = dataset.batches(&mut rng_a).flat_map(|b| b.starts).collect();
        let b: Vec<usize> = dataset.batches(&mut rng_b).flat_map(|b| b.starts).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_sizes() {
        let values = ramp(5);

        assert!(matches!(
            WindowDataset::new(&values, 0, 1, 0),
            Err(ForecastError::InvalidWindow(_))
        ));
        assert!(matches!(
            WindowDataset::new(&values, 2, 0, 0),
            Err(ForecastError::InvalidWindow(_))
        ));
        assert!(matches!(
            WindowDataset::new(&values, 5, 1, 0),
            Err(ForecastError::InvalidWindow(_))
        ));
        assert!(WindowDataset::new(&values, 4, 1, 0).is_ok());
    }
}
