//! Engine configuration
//!
//! Configuration is read from YAML. Every field has a default, so an empty
//! document is a valid configuration.
use std::{
    fs, io,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{color::DEFAULT_PALETTE, merge::Granularity, name::METRIC_NAME_LABEL, rank};

/// Errors produced by [`Config`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error for a serde [`serde_yaml`].
    #[error("Failed to deserialize yaml: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    /// Error reading config file
    #[error("Failed to read config file {path:?}: {source}")]
    ReadFile {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<io::Error>,
    },
    /// The palette holds no colors.
    #[error("Palette must hold at least one color")]
    EmptyPalette,
    /// The ranked view would never show anything.
    #[error("rank_limit must be greater than zero")]
    ZeroRankLimit,
}

fn default_rank_limit() -> usize {
    rank::DEFAULT_LIMIT
}

fn default_palette() -> Vec<String> {
    DEFAULT_PALETTE.iter().map(ToString::to_string).collect()
}

fn default_window_seconds() -> i64 {
    3_600
}

fn default_step() -> String {
    "15s".to_string()
}

fn default_metric_name_label() -> String {
    METRIC_NAME_LABEL.to_string()
}

/// Main configuration struct for the engine
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Resolution of bucket time labels.
    #[serde(default)]
    pub time_granularity: Granularity,
    /// Number of series a ranked view shows.
    #[serde(default = "default_rank_limit")]
    pub rank_limit: usize,
    /// Colors assigned to series, cyclically, in order of appearance.
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,
    /// Look-back of a range query built by `RangeQuery::ending_at`.
    #[serde(default = "default_window_seconds")]
    pub window_seconds: i64,
    /// Step of a range query built by `RangeQuery::ending_at`.
    #[serde(default = "default_step")]
    pub step: String,
    /// Label carrying the metric name, excluded from series names.
    #[serde(default = "default_metric_name_label")]
    pub metric_name_label: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_granularity: Granularity::default(),
            rank_limit: default_rank_limit(),
            palette: default_palette(),
            window_seconds: default_window_seconds(),
            step: default_step(),
            metric_name_label: default_metric_name_label(),
        }
    }
}

impl Config {
    /// Parse and validate a YAML configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or the result fails
    /// [`Config::validate`].
    pub fn from_yaml(contents: &str) -> Result<Self, Error> {
        let config: Self = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, see also
    /// [`Config::from_yaml`].
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path).map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;
        Self::from_yaml(&contents)
    }

    /// Check invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty palette or a zero rank limit.
    pub fn validate(&self) -> Result<(), Error> {
        if self.palette.is_empty() {
            return Err(Error::EmptyPalette);
        }
        if self.rank_limit == 0 {
            return Err(Error::ZeroRankLimit);
        }
        Ok(())
    }

    /// The palette size, or [`Error::EmptyPalette`].
    ///
    /// # Errors
    ///
    /// Returns an error when the palette is empty.
    pub fn palette_len(&self) -> Result<NonZeroUsize, Error> {
        NonZeroUsize::new(self.palette.len()).ok_or(Error::EmptyPalette)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_document_is_default() {
        let config = Config::from_yaml("{}").expect("parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.rank_limit, 15);
        assert_eq!(config.palette.len(), 15);
        assert_eq!(config.time_granularity, Granularity::DateMinute);
        assert_eq!(config.metric_name_label, "__name__");
    }

    #[test]
    fn overrides() {
        let contents = r#"
time_granularity: minute
rank_limit: 5
palette: ["red", "blue"]
window_seconds: 600
step: 1m
"#;
        let config = Config::from_yaml(contents).expect("parse");
        assert_eq!(config.time_granularity, Granularity::Minute);
        assert_eq!(config.rank_limit, 5);
        assert_eq!(config.palette, vec!["red".to_string(), "blue".to_string()]);
        assert_eq!(config.window_seconds, 600);
        assert_eq!(config.step, "1m");
        assert_eq!(config.palette_len().expect("len").get(), 2);
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(matches!(
            Config::from_yaml("theme: dark"),
            Err(Error::SerdeYaml(_))
        ));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            Config::from_yaml("palette: []"),
            Err(Error::EmptyPalette)
        ));
        assert!(matches!(
            Config::from_yaml("rank_limit: 0"),
            Err(Error::ZeroRankLimit)
        ));
    }

    #[test]
    fn reads_from_path() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        file.write_all(b"rank_limit: 3\n").expect("write");
        let config = Config::from_path(file.path()).expect("read");
        assert_eq!(config.rank_limit, 3);

        let missing = Config::from_path(Path::new("/nonexistent/series-merge.yaml"));
        assert!(matches!(missing, Err(Error::ReadFile { .. })));
    }
}
