//! The merge pipeline
//!
//! [`Engine::merge_series`] runs the per-series stages (decode, name,
//! summarize) on the rayon pool, joins, resolves name collisions in input
//! order and finally merges the time axis. Output depends only on the input
//! and the configuration, never on scheduling.
//!
//! Fallback names, duplicate suffixes and colors follow a series' position in
//! the backend's result set. [`Engine::merge_response`] keeps those positions
//! when the response decoder dropped a malformed series, so the series after
//! it are named and colored as if nothing had been dropped.
//!
//! [`Engine::execute`] wraps one full query execution: fetch through the
//! transport, decode the response, merge off the async runtime and publish
//! into a [`LiveResult`] unless a newer execution has started meanwhile.

use std::{num::NonZeroUsize, sync::Arc};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, trace};

use crate::{
    color::color_index_for,
    config::{self, Config},
    decode::{self, DecodedSeries},
    live::{LiveResult, Publish},
    merge::{self, TimeBucket},
    name::{self, SeriesName},
    query::{self, RangeQuery, RangeQueryTransport, RawSeries, Response},
    rank::{self, RankedEntry, RankedView},
    stats::{self, SeriesStats, Summary},
};

/// Errors produced by [`Engine`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The configuration is unusable.
    #[error(transparent)]
    Config(#[from] config::Error),
    /// The query could not be issued, fetched or decoded.
    #[error(transparent)]
    Query(#[from] query::Error),
    /// The merge task did not run to completion.
    #[error("Merge task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Per-series decode diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeriesDiagnostics {
    /// Samples received for the series.
    pub samples: usize,
    /// Samples excluded because their value was not a finite number.
    pub invalid: usize,
}

/// Diagnostics of one merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    /// One entry per column, in column order.
    pub series: Vec<SeriesDiagnostics>,
    /// Series the response decoder could not read and left out.
    pub dropped_series: usize,
}

/// The output of one merge: the table, its columns and their statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergedResult {
    /// One name per input series, in input order.
    pub columns: Vec<SeriesName>,
    /// Buckets ascending by time label.
    pub rows: Vec<TimeBucket>,
    /// One statistics row per column, in column order.
    pub stats: Vec<SeriesStats>,
    /// Decode diagnostics.
    pub diagnostics: Diagnostics,
}

impl MergedResult {
    /// Whether there is nothing to render.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Palette index of `column`.
    #[must_use]
    pub fn color_index(&self, column: usize) -> Option<usize> {
        self.stats.get(column).map(|s| s.color_index)
    }

    /// Entries of `bucket` in column order, ready for ranking.
    pub fn entries<'a>(&'a self, bucket: &'a TimeBucket) -> impl Iterator<Item = RankedEntry> + 'a {
        bucket.values.iter().filter_map(move |(column, value)| {
            let stats = self.stats.get(*column)?;
            Some(RankedEntry {
                name: stats.name.clone(),
                value: *value,
                color_index: stats.color_index,
            })
        })
    }
}

/// The stages of one series, before name collisions are resolved.
#[derive(Debug)]
struct Prepared {
    position: usize,
    name: SeriesName,
    decoded: DecodedSeries,
    summary: Summary,
}

fn prepare(position: usize, series: &RawSeries, metric_name_label: &str) -> Prepared {
    let decoded = decode::decode(series);
    let name = name::series_name(&series.labels, position, metric_name_label);
    let summary = stats::summarize(&decoded);
    trace!(
        "series {position} ({name}): {samples} samples, {invalid} invalid",
        samples = decoded.samples.len(),
        invalid = decoded.invalid
    );
    Prepared {
        position,
        name,
        decoded,
        summary,
    }
}

/// The merge-and-statistics engine.
#[derive(Debug, Clone)]
pub struct Engine {
    config: Arc<Config>,
    palette_len: NonZeroUsize,
}

impl Engine {
    /// Create an engine over a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails [`Config::validate`].
    pub fn new(config: Config) -> Result<Self, Error> {
        config.validate()?;
        let palette_len = config.palette_len()?;
        Ok(Self {
            config: Arc::new(config),
            palette_len,
        })
    }

    /// The engine's configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Palette index of the series at `series_index`.
    #[must_use]
    pub fn color_index_for(&self, series_index: usize) -> usize {
        color_index_for(series_index, self.palette_len)
    }

    /// Merge `raw` into one table with per-series statistics.
    ///
    /// Every input series owns exactly one column, in input order, even when
    /// its label set duplicates another's or it has no valid samples.
    #[must_use]
    pub fn merge_series(&self, raw: &[RawSeries]) -> MergedResult {
        let positioned: Vec<(usize, &RawSeries)> = raw.iter().enumerate().collect();
        self.merge_positioned(&positioned)
    }

    /// Merge the series of a decoded `response`.
    ///
    /// Like [`Engine::merge_series`], except that each series is named and
    /// colored by its position in the backend's result set, and the number
    /// of series the decoder dropped is carried into the diagnostics.
    #[must_use]
    pub fn merge_response(&self, response: &Response) -> MergedResult {
        let positioned: Vec<(usize, &RawSeries)> = response
            .series
            .iter()
            .map(|(position, series)| (*position, series))
            .collect();
        let mut result = self.merge_positioned(&positioned);
        result.diagnostics.dropped_series = response.dropped_series;
        result
    }

    fn merge_positioned(&self, raw: &[(usize, &RawSeries)]) -> MergedResult {
        let metric_name_label = self.config.metric_name_label.as_str();
        let prepared: Vec<Prepared> = raw
            .par_iter()
            .map(|&(position, series)| prepare(position, series, metric_name_label))
            .collect();

        let mut named: Vec<(usize, SeriesName)> = prepared
            .iter()
            .map(|p| (p.position, p.name.clone()))
            .collect();
        name::disambiguate(&mut named);

        let decoded: Vec<&DecodedSeries> = prepared.iter().map(|p| &p.decoded).collect();
        let rows = merge::merge(&decoded, self.config.time_granularity);

        let stats = prepared
            .iter()
            .zip(&named)
            .map(|(p, (position, name))| {
                SeriesStats::new(name.clone(), self.color_index_for(*position), p.summary)
            })
            .collect();
        let columns: Vec<SeriesName> = named.into_iter().map(|(_, name)| name).collect();

        let diagnostics = Diagnostics {
            series: prepared
                .iter()
                .map(|p| SeriesDiagnostics {
                    samples: p.decoded.samples.len(),
                    invalid: p.decoded.invalid,
                })
                .collect(),
            dropped_series: 0,
        };

        debug!(
            "merged {series} series into {rows} rows",
            series = columns.len(),
            rows = rows.len()
        );
        MergedResult {
            columns,
            rows,
            stats,
            diagnostics,
        }
    }

    /// Rank the series of `bucket`, a row of `result`. `limit` defaults to
    /// the configured rank limit.
    #[must_use]
    pub fn rank_bucket(
        &self,
        result: &MergedResult,
        bucket: &TimeBucket,
        limit: Option<usize>,
    ) -> RankedView {
        rank::rank_bucket(
            result.entries(bucket),
            limit.unwrap_or(self.config.rank_limit),
        )
    }

    /// Run one query execution end to end and publish its result into
    /// `live`.
    ///
    /// Returns [`Publish::Superseded`] when a newer execution began while
    /// this one was in flight; its result is discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if the query is invalid, the transport or backend
    /// fails, or the response cannot be decoded. `live` is left untouched.
    pub async fn execute<T>(
        &self,
        transport: &T,
        live: &LiveResult,
        query: RangeQuery,
    ) -> Result<Publish, Error>
    where
        T: RangeQueryTransport + Sync + ?Sized,
    {
        query.validate()?;
        let ticket = live.begin();

        let body = transport.fetch(&query).await?;
        let response = query::decode_response(&body)?;
        if !live.is_current(ticket) {
            debug!("execution superseded before merge, skipping");
            return Ok(Publish::Superseded);
        }

        let engine = self.clone();
        let result = tokio::task::spawn_blocking(move || engine.merge_response(&response)).await?;

        Ok(live.publish(ticket, result))
    }
}
