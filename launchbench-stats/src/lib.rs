#![warn(missing_docs)]
//! launchbench Statistical Engine
//!
//! Reduces a sequence of startup timings to the single figure reported
//! downstream. Only the median selection rule lives here; everything else
//! about a run is kept as raw samples in the report.

mod median;

pub use median::{StatsError, median_index, select_median};

/// Fewest samples the median selection rule can be applied to
pub const MIN_SAMPLE_COUNT: usize = 2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(MIN_SAMPLE_COUNT, 2);
    }
}
