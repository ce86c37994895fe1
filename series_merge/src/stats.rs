//! Per-series statistics
//!
//! Statistics are computed from a series' own valid samples in a single pass,
//! never from the merged table, so they do not depend on how other series
//! cover the time axis.

use serde::Serialize;

use crate::{decode::DecodedSeries, name::SeriesName};

/// Descriptive summary of one series' valid samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    /// Value of the last valid sample, in input order.
    pub last: f64,
    /// Smallest valid value.
    pub min: f64,
    /// Largest valid value.
    pub max: f64,
    /// Arithmetic mean of the valid values.
    pub avg: f64,
    /// Number of valid samples observed.
    pub count: usize,
}

impl Summary {
    /// The summary of a series without valid samples. Every statistic is
    /// zero so the series still renders a row.
    pub const EMPTY: Self = Self {
        last: 0.0,
        min: 0.0,
        max: 0.0,
        avg: 0.0,
        count: 0,
    };
}

/// One-pass accumulator behind [`Summary`].
#[derive(Debug, Clone, Copy)]
pub struct Accumulator {
    last: f64,
    min: f64,
    max: f64,
    mean: f64,
    count: usize,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self {
            last: 0.0,
            min: f64::MAX,
            max: f64::MIN,
            mean: 0.0,
            count: 0,
        }
    }
}

impl Accumulator {
    /// Fold one valid value into the accumulator.
    ///
    /// The mean is a running mean and stays finite for any finite input.
    #[inline]
    pub fn observe(&mut self, value: f64) {
        self.last = value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.count += 1;
        let n = self.count as f64;
        let delta = value - self.mean;
        // The difference overflows only for opposite-sign values near the
        // f64 limits.
        self.mean += if delta.is_finite() {
            delta / n
        } else {
            value / n - self.mean / n
        };
    }

    /// Finish accumulation.
    #[must_use]
    pub fn finish(self) -> Summary {
        if self.count == 0 {
            return Summary::EMPTY;
        }
        Summary {
            last: self.last,
            min: self.min,
            max: self.max,
            avg: self.mean,
            count: self.count,
        }
    }
}

/// Summarize the valid samples of `series`.
#[must_use]
pub fn summarize(series: &DecodedSeries) -> Summary {
    let mut acc = Accumulator::default();
    for sample in series.valid() {
        acc.observe(sample.value);
    }
    acc.finish()
}

/// The statistics row of one series, as rendered in the summary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesStats {
    /// Column name of the series.
    pub name: SeriesName,
    /// Palette index of the series.
    pub color_index: usize,
    /// Value of the last valid sample.
    pub last: f64,
    /// Smallest valid value.
    pub min: f64,
    /// Largest valid value.
    pub max: f64,
    /// Mean of the valid values.
    pub avg: f64,
}

impl SeriesStats {
    /// Combine a summary with the series' identity.
    #[must_use]
    pub fn new(name: SeriesName, color_index: usize, summary: Summary) -> Self {
        Self {
            name,
            color_index,
            last: summary.last,
            min: summary.min,
            max: summary.max,
            avg: summary.avg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode::decode, query::RawSeries};
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn decoded(values: &[&str]) -> DecodedSeries {
        let samples = values
            .iter()
            .enumerate()
            .map(|(i, v)| (i as f64, (*v).to_string()))
            .collect();
        decode(&RawSeries::new([("job", "node")], samples))
    }

    #[test]
    fn ten_twenty_thirty() {
        let summary = summarize(&decoded(&["10", "20", "30"]));
        assert_eq!(summary.avg, 20.0);
        assert_eq!(summary.min, 10.0);
        assert_eq!(summary.max, 30.0);
        assert_eq!(summary.last, 30.0);
        assert_eq!(summary.count, 3);
    }

    #[test]
    fn no_valid_samples_falls_back_to_zero() {
        assert_eq!(summarize(&decoded(&[])), Summary::EMPTY);
        assert_eq!(summarize(&decoded(&["NaN", "+Inf", "x"])), Summary::EMPTY);
    }

    #[test]
    fn invalid_samples_are_excluded() {
        let summary = summarize(&decoded(&["5", "NaN", "-5", "+Inf"]));
        assert_eq!(summary.count, 2);
        assert_eq!(summary.min, -5.0);
        assert_eq!(summary.max, 5.0);
        assert_eq!(summary.avg, 0.0);
        assert_eq!(summary.last, -5.0);
    }

    #[test]
    fn all_equal_values() {
        let summary = summarize(&decoded(&["7", "7", "7"]));
        assert_eq!(summary.min, 7.0);
        assert_eq!(summary.max, 7.0);
        assert_eq!(summary.avg, 7.0);
    }

    #[test]
    fn negative_only_series_max() {
        let summary = summarize(&decoded(&["-3", "-1", "-2"]));
        assert_eq!(summary.max, -1.0);
        assert_eq!(summary.min, -3.0);
        assert_eq!(summary.last, -2.0);
    }

    #[test]
    fn huge_values_do_not_overflow_mean() {
        let summary = summarize(&decoded(&["1e308", "1e308"]));
        assert!(summary.avg.is_finite());
        assert_relative_eq!(summary.avg, 1e308, max_relative = 1e-12);

        let summary = summarize(&decoded(&["1.7e308", "-1.7e308", "1.7e308"]));
        assert!(summary.avg.is_finite());
        assert!(summary.avg <= summary.max && summary.avg >= summary.min);
    }

    proptest! {
        #[test]
        fn bounds_hold(values in prop::collection::vec(-1.0e9f64..1.0e9, 1..200)) {
            let raw: Vec<String> = values.iter().map(ToString::to_string).collect();
            let refs: Vec<&str> = raw.iter().map(String::as_str).collect();
            let summary = summarize(&decoded(&refs));

            prop_assert_eq!(summary.count, values.len());
            let slack = 1e-6 * summary.max.abs().max(summary.min.abs()).max(1.0);
            prop_assert!(summary.min <= summary.avg + slack);
            prop_assert!(summary.avg <= summary.max + slack);
            prop_assert_eq!(summary.last, *values.last().expect("non-empty"));

            let mean = values.iter().sum::<f64>() / values.len() as f64;
            assert_relative_eq!(summary.avg, mean, epsilon = 1e-3, max_relative = 1e-6);
        }
    }
}
