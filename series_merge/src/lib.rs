//! Time-series merge and statistics engine
//!
//! This library sits between a Prometheus-style range-query backend and a
//! rendering layer. Given the series of one `query_range` response it aligns
//! every series onto a single ordered time axis, summarizes each series and
//! offers a cheap, bounded ranking of the series present at one point in time.
//!
//! The pipeline runs leaf-first: [`decode`] turns raw string samples into
//! floats, [`name`] derives a display name from each label set, [`stats`]
//! summarizes each series and [`merge`] builds the shared time axis. [`engine`]
//! ties these together and [`live`] guarantees only the newest execution is
//! ever authoritative.

#![deny(clippy::all)]
#![deny(clippy::cargo)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(clippy::unwrap_used)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::multiple_crate_versions)]

pub mod color;
pub mod config;
pub mod decode;
pub mod engine;
pub mod format;
pub mod live;
pub mod merge;
pub mod name;
pub mod query;
pub mod rank;
pub mod stats;

pub use config::Config;
pub use engine::{Engine, MergedResult};
pub use query::{RangeQuery, RawSeries};
