//! Normalization of `count` fields in `meta/stats.json`.
//!
//! Some `LeRobot` exports store a single count for multi-dimensional
//! action/state statistics (e.g. `[37224]` for a 6-joint arm). Consumers that
//! slice statistics per joint expect `count` to have one entry per dimension
//! of `mean`, so the single value is repeated to that length.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, ser::PrettyFormatter};

use crate::DatasetLayout;

/// Features whose `count` is expanded. Other entries are never inspected.
pub const NORMALIZED_FEATURES: [&str; 2] = ["action", "observation.state"];

const MEAN_KEY: &str = "mean";
const COUNT_KEY: &str = "count";
const INDENT: &[u8] = b"    ";

/// The two shapes a `count` field takes in the wild.
#[derive(Debug, Clone, Copy, PartialEq, derive_more::IsVariant)]
pub enum CountField<'a> {
    Scalar(&'a Value),
    Sequence(&'a [Value]),
}

impl<'a> CountField<'a> {
    /// Classifies a `count` value; `null` counts as absent.
    #[must_use]
    pub fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Array(items) => Some(CountField::Sequence(items)),
            other => Some(CountField::Scalar(other)),
        }
    }
}

/// A `count` field that was replaced by a per-dimension list.
#[derive(Debug, Clone, PartialEq)]
pub struct CountExpansion {
    pub feature: String,
    pub dims: usize,
    pub value: Value,
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum FixStatsError {
    #[display("stats.json not found at {}", path.display())]
    MissingInput { path: PathBuf },
    #[display("Failed to read {}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[display("Failed to parse stats JSON file: {}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("'{feature}.count' is an empty list and cannot be expanded to {dims} dimensions")]
    EmptyCount { feature: String, dims: usize },
    #[display("Failed to encode stats JSON")]
    Encode { source: serde_json::Error },
    #[display("Failed to write {}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Per-feature statistics, keyed by feature name. Key order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatsDocument(Map<String, Value>);

impl From<Map<String, Value>> for StatsDocument {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl StatsDocument {
    /// Parses a document; anything but a JSON object is rejected, including
    /// the non-standard `NaN`/`Infinity` literals.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    #[must_use]
    pub fn get(&self, feature: &str) -> Option<&Value> {
        self.0.get(feature)
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Expands `count` to the length of `mean` for [`NORMALIZED_FEATURES`].
    ///
    /// Returns the expansions made, in feature order; an empty list means the
    /// document is unchanged.
    pub fn normalize_counts(&mut self) -> Result<Vec<CountExpansion>, FixStatsError> {
        let mut expansions = vec![];
        for feature in NORMALIZED_FEATURES {
            let Some(Value::Object(stats)) = self.0.get_mut(feature) else {
                continue;
            };
            if let Some(expansion) = expand_count(feature, stats)? {
                tracing::debug!(
                    feature,
                    dims = expansion.dims,
                    value = %expansion.value,
                    "expanded count"
                );
                expansions.push(expansion);
            }
        }
        Ok(expansions)
    }

    /// Serializes with 4-space indentation.
    pub fn to_pretty_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
        self.serialize(&mut serializer)?;
        Ok(buf)
    }
}

fn expand_count(
    feature: &str,
    stats: &mut Map<String, Value>,
) -> Result<Option<CountExpansion>, FixStatsError> {
    let Some(Value::Array(mean)) = stats.get(MEAN_KEY) else {
        return Ok(None);
    };
    let dims = mean.len();
    let Some(count) = stats.get(COUNT_KEY).and_then(CountField::from_value) else {
        return Ok(None);
    };

    let value = match count {
        CountField::Sequence(items) if items.len() == dims => return Ok(None),
        CountField::Sequence([single]) => single.clone(),
        CountField::Scalar(value) => value.clone(),
        CountField::Sequence([first, ..]) => {
            // FIXME: a length other than 1 or `dims` likely means the stats were
            // computed for a different feature shape; callers still get the first value.
            tracing::warn!(
                feature,
                len = count_len(count),
                dims,
                "count length matches neither 1 nor mean; repeating its first value"
            );
            first.clone()
        }
        CountField::Sequence([]) => {
            return Err(FixStatsError::EmptyCount {
                feature: feature.to_owned(),
                dims,
            });
        }
    };

    stats.insert(COUNT_KEY.to_owned(), Value::Array(vec![value.clone(); dims]));
    Ok(Some(CountExpansion {
        feature: feature.to_owned(),
        dims,
        value,
    }))
}

fn count_len(count: CountField<'_>) -> usize {
    match count {
        CountField::Scalar(_) => 1,
        CountField::Sequence(items) => items.len(),
    }
}

/// Whether [`fix_stats_counts`] may rewrite the file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum WriteMode {
    #[default]
    Write,
    DryRun,
}

/// Result of [`fix_stats_counts`].
#[derive(Debug, Clone, PartialEq)]
pub struct FixStatsOutcome {
    pub path: PathBuf,
    pub expansions: Vec<CountExpansion>,
    pub written: bool,
}

impl FixStatsOutcome {
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.expansions.is_empty()
    }
}

fn read_stats(path: &Path) -> Result<StatsDocument, FixStatsError> {
    let bytes = fs::read(path).map_err(|source| FixStatsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    StatsDocument::from_slice(&bytes).map_err(|source| FixStatsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Normalizes `meta/stats.json` in place.
///
/// The file is rewritten only when a count was expanded and `mode` allows
/// it; the new contents are fully encoded before the file is opened.
pub fn fix_stats_counts(
    layout: &DatasetLayout,
    mode: WriteMode,
) -> Result<FixStatsOutcome, FixStatsError> {
    let path = layout.stats_json();
    if !path.exists() {
        return Err(FixStatsError::MissingInput { path });
    }

    let mut document = read_stats(&path)?;
    let expansions = document.normalize_counts()?;

    let written = !expansions.is_empty() && mode.is_write();
    if written {
        let encoded = document
            .to_pretty_json()
            .map_err(|source| FixStatsError::Encode { source })?;
        fs::write(&path, encoded).map_err(|source| FixStatsError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), features = expansions.len(), "updated counts");
    }

    Ok(FixStatsOutcome {
        path,
        expansions,
        written,
    })
}
