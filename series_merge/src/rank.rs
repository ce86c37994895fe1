//! Ranked point-in-time view
//!
//! Selects the top `limit` series of one bucket by value, descending, and
//! counts the rest. Equal values keep their input order so the same bucket
//! always renders identically. Cost depends only on the bucket's width.

use serde::Serialize;

use crate::name::SeriesName;

/// Default number of series shown in a ranked view.
pub const DEFAULT_LIMIT: usize = 15;

/// One shown series of a ranked view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    /// Column name of the series.
    pub name: SeriesName,
    /// The series' value in the ranked bucket.
    pub value: f64,
    /// Palette index of the series.
    pub color_index: usize,
}

/// A bounded, descending view of one bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankedView {
    /// At most `limit` entries, largest value first.
    pub shown: Vec<RankedEntry>,
    /// How many entries were left out.
    pub hidden_count: usize,
}

impl RankedView {
    /// The footer line for a truncated view, `None` when nothing is hidden.
    #[must_use]
    pub fn hidden_summary(&self) -> Option<String> {
        (self.hidden_count > 0).then(|| format!("...and {} more series", self.hidden_count))
    }
}

/// Rank `entries` descending by value and keep the first `limit`.
#[must_use]
pub fn rank_bucket<I>(entries: I, limit: usize) -> RankedView
where
    I: IntoIterator<Item = RankedEntry>,
{
    let mut shown: Vec<RankedEntry> = entries.into_iter().collect();
    // `sort_by` is stable, ties stay in input order.
    shown.sort_by(|a, b| b.value.total_cmp(&a.value));

    let hidden_count = shown.len().saturating_sub(limit);
    shown.truncate(limit);
    RankedView {
        shown,
        hidden_count,
    }
}
