//! Range query model
//!
//! This module describes the interface presented by the external query
//! transport: the request shape, the Prometheus `query_range` response
//! envelope and the [`RangeQueryTransport`] trait the engine fetches through.
//! Performing HTTP requests is the transport's business, not this crate's.
//! <https://prometheus.io/docs/prometheus/latest/querying/api/#range-queries>

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::Config;

/// Errors produced while building, fetching or decoding a range query.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The query expression was empty or whitespace.
    #[error("Query expression is empty")]
    EmptyQuery,
    /// The window start lies after its end.
    #[error("Query window start {start} is after end {end}")]
    InvalidWindow {
        /// Window start, seconds since epoch
        start: i64,
        /// Window end, seconds since epoch
        end: i64,
    },
    /// The step is not a Prometheus duration.
    #[error("Invalid step duration: {0}")]
    InvalidStep(String),
    /// The transport could not reach the backend.
    #[error("Transport failure: {0}")]
    Transport(String),
    /// The backend answered with an error status.
    #[error("Backend error ({error_type}): {message}")]
    Backend {
        /// Prometheus `errorType`
        error_type: String,
        /// Prometheus `error`
        message: String,
    },
    /// The response carried something other than a range matrix.
    #[error("Unexpected result type: {0}")]
    UnexpectedResultType(String),
    /// The response body was not a Prometheus envelope.
    #[error("Failed to deserialize response: {0}")]
    Deserialize(#[from] serde_json::Error),
}

/// A range-query request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeQuery {
    /// The query expression, opaque to this crate.
    pub query: String,
    /// Window start, seconds since epoch.
    pub start: i64,
    /// Window end, seconds since epoch.
    pub end: i64,
    /// Sampling step as a Prometheus duration, e.g. `15s`.
    pub step: String,
}

impl RangeQuery {
    /// Build a query whose window ends at `end` and reaches back the
    /// configured `window_seconds`, sampled at the configured step.
    #[must_use]
    pub fn ending_at(query: impl Into<String>, end: i64, config: &Config) -> Self {
        Self {
            query: query.into(),
            start: end.saturating_sub(config.window_seconds),
            end,
            step: config.step.clone(),
        }
    }

    /// Check the request before it is handed to a transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the query is empty, the window is inverted or the
    /// step is not a duration.
    pub fn validate(&self) -> Result<(), Error> {
        if self.query.trim().is_empty() {
            return Err(Error::EmptyQuery);
        }
        if self.start > self.end {
            return Err(Error::InvalidWindow {
                start: self.start,
                end: self.end,
            });
        }
        step_seconds(&self.step)?;
        Ok(())
    }
}

/// Parse a Prometheus step, either a bare number of seconds (`15`, `0.5`) or
/// a number with a single unit suffix out of `ms`, `s`, `m`, `h`, `d`, `w`
/// and `y` (`15s`, `1m`, `250ms`).
///
/// # Errors
///
/// Returns [`Error::InvalidStep`] when the step cannot be parsed or is not
/// positive.
pub fn step_seconds(step: &str) -> Result<f64, Error> {
    let invalid = || Error::InvalidStep(step.to_string());
    let split = step
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(step.len());
    let (number, unit) = step.split_at(split);
    let number: f64 = number.parse().map_err(|_| invalid())?;
    let scale = match unit {
        "" | "s" => 1.0,
        "ms" => 0.001,
        "m" => 60.0,
        "h" => 3_600.0,
        "d" => 86_400.0,
        "w" => 604_800.0,
        "y" => 31_536_000.0,
        _ => return Err(invalid()),
    };
    let seconds = number * scale;
    if seconds.is_finite() && seconds > 0.0 {
        Ok(seconds)
    } else {
        Err(invalid())
    }
}

/// One series as returned by the backend. Immutable once received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSeries {
    /// The label set, including the metric-name label if the backend sent it.
    #[serde(rename = "metric", default)]
    pub labels: FxHashMap<String, String>,
    /// `(unix timestamp, raw value)` pairs, ordered by timestamp.
    #[serde(rename = "values", default)]
    pub samples: Vec<(f64, String)>,
}

impl RawSeries {
    /// Construct a series from labels and samples.
    #[must_use]
    pub fn new<L, K, V>(labels: L, samples: Vec<(f64, String)>) -> Self
    where
        L: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            labels: labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            samples,
        }
    }
}

/// The decoded body of a range-query response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    /// Well-formed series in backend order, each with its 0-based position
    /// among all series of the result, dropped ones included.
    pub series: Vec<(usize, RawSeries)>,
    /// Number of series that could not be decoded and were left out.
    pub dropped_series: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    status: String,
    #[serde(default)]
    data: Option<Data>,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Data {
    result_type: String,
    #[serde(default)]
    result: Vec<serde_json::Value>,
}

/// Decode a Prometheus `query_range` response body.
///
/// A missing `data` or `result` is an empty response. Each series is decoded
/// on its own: a malformed series is logged, counted in
/// [`Response::dropped_series`] and skipped while its siblings are kept.
///
/// # Errors
///
/// Returns an error if the body is not an envelope, if the backend reported
/// an error status or if the result is not a matrix.
pub fn decode_response(body: &str) -> Result<Response, Error> {
    let envelope: Envelope = serde_json::from_str(body)?;
    if envelope.status != "success" {
        return Err(Error::Backend {
            error_type: envelope.error_type.unwrap_or_else(|| "unknown".to_string()),
            message: envelope
                .error
                .unwrap_or_else(|| format!("status {}", envelope.status)),
        });
    }

    let Some(data) = envelope.data else {
        trace!("range query response carried no data");
        return Ok(Response::default());
    };
    if data.result_type != "matrix" {
        return Err(Error::UnexpectedResultType(data.result_type));
    }

    let mut response = Response::default();
    for (position, value) in data.result.into_iter().enumerate() {
        match serde_json::from_value::<RawSeries>(value) {
            Ok(series) => response.series.push((position, series)),
            Err(e) => {
                warn!("Dropping malformed series at position {position}: {e}");
                response.dropped_series += 1;
            }
        }
    }
    Ok(response)
}

#[async_trait]
/// The external query transport.
///
/// Implementations own connection handling and authentication and return the
/// raw response body.
pub trait RangeQueryTransport {
    /// Execute `query` against the backend.
    async fn fetch(&self, query: &RangeQuery) -> Result<String, Error>;
}
