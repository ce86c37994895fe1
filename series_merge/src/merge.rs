//! Time-axis merge
//!
//! Every valid sample of every series is placed into the bucket named by its
//! formatted time label, under the series' column. Buckets are sparse: a
//! series without a sample at a label leaves its cell unset, nothing is
//! interpolated.
//!
//! Labels are formatted at a fixed [`Granularity`]. When the granularity is
//! coarser than the query step, several timestamps share one label and the
//! later sample overwrites the earlier one in that cell. That loss is the
//! accepted policy, not an error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, macros::format_description};
use tracing::trace;

use crate::decode::DecodedSeries;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Resolution of bucket time labels. All labels are UTC.
pub enum Granularity {
    /// `YYYY-MM-DD HH:MM`. Lexicographic order always follows time.
    #[default]
    DateMinute,
    /// `HH:MM`. Lexicographic order follows time within a single day only,
    /// a window crossing midnight sorts out of time order.
    Minute,
    /// `HH:MM:SS`. Lexicographic order follows time within a single day.
    Second,
    /// `YYYY-MM-DD HH:MM:SS`. Lexicographic order always follows time.
    DateTime,
}

impl Granularity {
    /// Format `timestamp`, seconds since epoch, as a bucket label.
    ///
    /// Returns `None` if the timestamp is not finite or is outside the
    /// representable calendar range.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn label(self, timestamp: f64) -> Option<String> {
        if !timestamp.is_finite() {
            return None;
        }
        let instant = OffsetDateTime::from_unix_timestamp(timestamp.floor() as i64).ok()?;
        let formatted = match self {
            Granularity::DateMinute => {
                instant.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
            }
            Granularity::Minute => instant.format(format_description!("[hour]:[minute]")),
            Granularity::Second => {
                instant.format(format_description!("[hour]:[minute]:[second]"))
            }
            Granularity::DateTime => instant.format(format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second]"
            )),
        };
        formatted.ok()
    }
}

/// One row of the merged table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeBucket {
    /// The formatted time label keying this row.
    pub label: String,
    /// Values by column index. Columns without a sample here are absent.
    pub values: BTreeMap<usize, f64>,
}

impl TimeBucket {
    /// The value of `column` in this bucket, if the column has one.
    #[must_use]
    pub fn get(&self, column: usize) -> Option<f64> {
        self.values.get(&column).copied()
    }

    /// Number of columns holding a value in this bucket.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no column holds a value in this bucket.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Merge `columns` onto one time axis. The column index of each series is its
/// position in `columns`.
///
/// Buckets are returned ascending by label. Only valid samples produce cells,
/// so a bucket is never created from invalid samples alone.
#[must_use]
pub fn merge(columns: &[&DecodedSeries], granularity: Granularity) -> Vec<TimeBucket> {
    let mut buckets: BTreeMap<String, BTreeMap<usize, f64>> = BTreeMap::new();

    for (column, series) in columns.iter().enumerate() {
        for sample in series.valid() {
            let Some(label) = granularity.label(sample.timestamp) else {
                trace!(
                    "column {column}: timestamp {ts} has no label, skipping",
                    ts = sample.timestamp
                );
                continue;
            };
            buckets.entry(label).or_default().insert(column, sample.value);
        }
    }

    buckets
        .into_iter()
        .map(|(label, values)| TimeBucket { label, values })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode::decode, query::RawSeries};
    use proptest::prelude::*;

    // 2023-11-14 22:13:20 UTC
    const T0: f64 = 1_700_000_000.0;

    fn decoded(samples: &[(f64, &str)]) -> DecodedSeries {
        let samples = samples.iter().map(|(t, v)| (*t, (*v).to_string())).collect();
        decode(&RawSeries::new([("job", "node")], samples))
    }

    #[test]
    fn labels_at_each_granularity() {
        assert_eq!(
            Granularity::DateMinute.label(T0).as_deref(),
            Some("2023-11-14 22:13")
        );
        assert_eq!(Granularity::Minute.label(T0).as_deref(), Some("22:13"));
        assert_eq!(Granularity::Second.label(T0).as_deref(), Some("22:13:20"));
        assert_eq!(
            Granularity::DateTime.label(T0 + 0.9).as_deref(),
            Some("2023-11-14 22:13:20")
        );
        assert_eq!(Granularity::Minute.label(f64::NAN), None);
        assert_eq!(Granularity::Minute.label(1.0e300), None);
    }

    #[test]
    fn sparse_rows_in_label_order() {
        let a = decoded(&[(T0, "1"), (T0 + 60.0, "2")]);
        let b = decoded(&[(T0 + 120.0, "3"), (T0 + 60.0, "4")]);
        let rows = merge(&[&a, &b], Granularity::Minute);

        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["22:13", "22:14", "22:15"]);

        assert_eq!(rows[0].get(0), Some(1.0));
        assert_eq!(rows[0].get(1), None);
        assert_eq!(rows[1].get(0), Some(2.0));
        assert_eq!(rows[1].get(1), Some(4.0));
        assert_eq!(rows[2].get(0), None);
        assert_eq!(rows[2].get(1), Some(3.0));
    }

    #[test]
    fn coarse_label_collision_keeps_later_sample() {
        let a = decoded(&[(T0, "1"), (T0 + 15.0, "2"), (T0 + 30.0, "3")]);
        let rows = merge(&[&a], Granularity::Minute);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(0), Some(3.0));

        let rows = merge(&[&a], Granularity::Second);
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn date_minute_orders_across_midnight() {
        // 2023-11-14 23:59:00 UTC
        let before = 1_700_006_340.0;
        let a = decoded(&[(before, "1"), (before + 60.0, "2")]);

        let rows = merge(&[&a], Granularity::DateMinute);
        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["2023-11-14 23:59", "2023-11-15 00:00"]);
        assert_eq!(rows[0].get(0), Some(1.0));
        assert_eq!(rows[1].get(0), Some(2.0));

        // Bare clock labels wrap at midnight.
        let rows = merge(&[&a], Granularity::Minute);
        assert_eq!(rows[0].label, "00:00");
    }

    #[test]
    fn date_minute_keeps_per_minute_overwrite() {
        let a = decoded(&[(T0, "1"), (T0 + 15.0, "2")]);
        let rows = merge(&[&a], Granularity::DateMinute);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(0), Some(2.0));
    }

    #[test]
    fn invalid_samples_make_no_cells() {
        let a = decoded(&[(T0, "NaN"), (T0 + 60.0, "5")]);
        let rows = merge(&[&a], Granularity::Minute);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].label, "22:14");
    }

    #[test]
    fn nothing_to_merge() {
        assert!(merge(&[], Granularity::Minute).is_empty());
        let empty = decoded(&[]);
        assert!(merge(&[&empty], Granularity::Minute).is_empty());
    }

    proptest! {
        #[test]
        fn row_count_is_distinct_labels(
            offsets in prop::collection::vec(prop::collection::vec(0u32..86_400, 0..40), 0..6),
        ) {
            let series: Vec<DecodedSeries> = offsets
                .iter()
                .map(|offs| {
                    let samples: Vec<(f64, String)> = offs
                        .iter()
                        .map(|o| (T0 + f64::from(*o), "1".to_string()))
                        .collect();
                    decode(&RawSeries::new([("job", "x")], samples))
                })
                .collect();
            let columns: Vec<&DecodedSeries> = series.iter().collect();
            let rows = merge(&columns, Granularity::DateTime);

            let mut distinct: Vec<String> = offsets
                .iter()
                .flatten()
                .filter_map(|o| Granularity::DateTime.label(T0 + f64::from(*o)))
                .collect();
            distinct.sort();
            distinct.dedup();
            prop_assert_eq!(rows.len(), distinct.len());
            prop_assert!(rows.windows(2).all(|w| w[0].label < w[1].label));
        }
    }
}
