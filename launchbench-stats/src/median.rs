//! Median Selection
//!
//! The reported "median" is the element at index `n/2 - 1` of the sorted
//! samples (integer division). For odd `n` this is the element just below
//! the middle one, for even `n` it is the lower of the two middle elements.
//! Downstream dashboards were built against this exact selection, so it is
//! kept as-is rather than replaced by the textbook median.

use crate::MIN_SAMPLE_COUNT;
use thiserror::Error;

/// Errors raised while reducing samples
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    /// Too few samples for the selection index to exist
    #[error("need at least {min} samples to select a median, got {count}")]
    EmptySample {
        /// Number of samples supplied
        count: usize,
        /// Minimum number of samples required
        min: usize,
    },
}

/// Index selected from a sorted sequence of `n` samples.
///
/// Returns `None` when `n` is below [`MIN_SAMPLE_COUNT`].
pub fn median_index(n: usize) -> Option<usize> {
    if n < MIN_SAMPLE_COUNT {
        return None;
    }
    Some(n / 2 - 1)
}

/// Select the reported median from unsorted samples.
///
/// # Examples
///
/// ```
/// # use launchbench_stats::select_median;
/// let median = select_median(&[5.0, 1.0, 3.0, 2.0, 4.0]).unwrap();
/// assert_eq!(median, 2.0);
/// ```
pub fn select_median(samples: &[f64]) -> Result<f64, StatsError> {
    let index = median_index(samples.len()).ok_or(StatsError::EmptySample {
        count: samples.len(),
        min: MIN_SAMPLE_COUNT,
    })?;

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    Ok(sorted[index])
}
