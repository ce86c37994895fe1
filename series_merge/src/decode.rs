//! Sample decoding
//!
//! Backends deliver sample values as strings. Decoding turns them into floats
//! without ever failing: a value that does not parse to a finite number is
//! kept as an invalid sample so later stages can skip it and diagnostics can
//! count it.

use serde::Serialize;

use crate::query::RawSeries;

/// One decoded sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DecodedSample {
    /// Seconds since unix epoch, as sent by the backend.
    pub timestamp: f64,
    /// The parsed value. Zero when `valid` is false.
    pub value: f64,
    /// Whether the raw value parsed to a finite number.
    pub valid: bool,
}

/// The decoded samples of one series, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecodedSeries {
    /// Every sample, valid or not.
    pub samples: Vec<DecodedSample>,
    /// Number of samples with `valid == false`.
    pub invalid: usize,
}

impl DecodedSeries {
    /// Iterate over the valid samples only.
    pub fn valid(&self) -> impl Iterator<Item = &DecodedSample> {
        self.samples.iter().filter(|s| s.valid)
    }
}

/// Parse a raw sample value.
///
/// Returns `None` for anything that is not a finite number, including the
/// `NaN`, `+Inf` and `-Inf` spellings Prometheus uses.
#[must_use]
pub fn parse_value(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Decode every sample of `series`, preserving input order. Samples are not
/// re-sorted.
#[must_use]
pub fn decode(series: &RawSeries) -> DecodedSeries {
    let mut invalid = 0;
    let samples = series
        .samples
        .iter()
        .map(|(timestamp, raw)| match parse_value(raw) {
            Some(value) => DecodedSample {
                timestamp: *timestamp,
                value,
                valid: true,
            },
            None => {
                invalid += 1;
                DecodedSample {
                    timestamp: *timestamp,
                    value: 0.0,
                    valid: false,
                }
            }
        })
        .collect();

    DecodedSeries { samples, invalid }
}
