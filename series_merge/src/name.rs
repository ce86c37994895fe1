//! Series naming
//!
//! A series is identified only by its label set. The display name renders the
//! label set, minus the metric-name label, as `key="value"` pairs sorted by key
//! and joined by `, `. A series with no remaining labels is named after its
//! position, `Result <position + 1>`.
//!
//! Two series may render to the same name. Every input series must still own
//! exactly one column, so [`disambiguate`] suffixes later duplicates with
//! their position.

use std::{borrow::Borrow, fmt};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

/// The label Prometheus uses to carry the metric name.
pub const METRIC_NAME_LABEL: &str = "__name__";

/// The display name of a series.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SeriesName(String);

impl SeriesName {
    /// The name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeriesName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SeriesName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SeriesName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Derive the display name of the series at `position` (0-based).
///
/// Pure in `(labels, position)`: identical inputs give identical names
/// regardless of the map's iteration order.
#[must_use]
pub fn series_name(
    labels: &FxHashMap<String, String>,
    position: usize,
    metric_name_label: &str,
) -> SeriesName {
    let mut pairs: Vec<(&String, &String)> = labels
        .iter()
        .filter(|(k, _)| k.as_str() != metric_name_label)
        .collect();
    if pairs.is_empty() {
        return SeriesName(format!("Result {}", position + 1));
    }
    pairs.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let rendered = pairs
        .iter()
        .map(|(k, v)| format!("{k}=\"{v}\""))
        .collect::<Vec<String>>()
        .join(", ");
    SeriesName(rendered)
}

/// Make the names unique, in place, preserving the first occurrence of every
/// name. Each entry pairs a name with its 0-based position in the result set;
/// a later duplicate at position `i` becomes `<name> #<i + 1>`.
pub fn disambiguate(names: &mut [(usize, SeriesName)]) {
    let mut taken: FxHashSet<String> = FxHashSet::default();
    for (position, name) in names.iter_mut() {
        if taken.insert(name.0.clone()) {
            continue;
        }
        let mut candidate = format!("{name} #{}", *position + 1);
        let mut attempt = 1;
        while taken.contains(&candidate) {
            attempt += 1;
            candidate = format!("{name} #{}.{attempt}", *position + 1);
        }
        taken.insert(candidate.clone());
        name.0 = candidate;
    }
}
