//! Decoding of the `pandas` schema metadata written by pandas/pyarrow.
//!
//! The metadata records which Parquet fields hold the frame's index:
//!
//! ```json
//! {
//!   "index_columns": ["__index_level_0__"],
//!   "columns": [
//!     {"name": "task_index", "field_name": "task_index", "pandas_type": "int64"},
//!     {"name": null, "field_name": "__index_level_0__", "pandas_type": "unicode"}
//!   ]
//! }
//! ```
//!
//! A `RangeIndex` is not stored as a field; it appears in `index_columns` as
//! `{"kind": "range", "name": null, "start": 0, "stop": 3, "step": 1}`.

use std::collections::HashMap;

use serde::Deserialize;

pub(crate) const PANDAS_METADATA_KEY: &str = "pandas";

#[derive(Debug, Deserialize)]
struct PandasMetadata {
    #[serde(default)]
    index_columns: Vec<IndexColumn>,
    #[serde(default)]
    columns: Vec<PandasColumn>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IndexColumn {
    Stored(String),
    Range(RangeDescriptor),
}

#[derive(Debug, Deserialize)]
struct RangeDescriptor {
    #[serde(default)]
    name: Option<serde_json::Value>,
    start: i64,
    step: i64,
}

#[derive(Debug, Deserialize)]
struct PandasColumn {
    #[serde(default)]
    name: Option<serde_json::Value>,
    #[serde(default)]
    field_name: Option<String>,
}

/// Where the row labels of a pandas frame live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum IndexLayout {
    Range {
        name: Option<String>,
        start: i64,
        step: i64,
    },
    /// Stored index levels, as `(field name, level name)` pairs in level order.
    Stored(Vec<(String, Option<String>)>),
}

impl Default for IndexLayout {
    fn default() -> Self {
        IndexLayout::Range {
            name: None,
            start: 0,
            step: 1,
        }
    }
}

/// Label names are arbitrary hashables in pandas; anything but a string is rendered as JSON.
fn label_name(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn is_generated_level_name(field_name: &str) -> bool {
    field_name
        .strip_prefix("__index_level_")
        .and_then(|rest| rest.strip_suffix("__"))
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Reads the index layout from schema metadata.
///
/// Tables without a `pandas` entry get the positional labels pandas would
/// assign when reading them.
pub(crate) fn index_layout(
    metadata: &HashMap<String, String>,
) -> Result<IndexLayout, serde_json::Error> {
    let Some(raw) = metadata.get(PANDAS_METADATA_KEY) else {
        return Ok(IndexLayout::default());
    };
    let pandas: PandasMetadata = serde_json::from_str(raw)?;

    if let [IndexColumn::Range(range)] = pandas.index_columns.as_slice() {
        return Ok(IndexLayout::Range {
            name: label_name(range.name.as_ref()),
            start: range.start,
            step: range.step,
        });
    }

    let levels: Vec<_> = pandas
        .index_columns
        .iter()
        .filter_map(|column| match column {
            IndexColumn::Stored(field_name) => Some(field_name),
            IndexColumn::Range(_) => None,
        })
        .map(|field_name| {
            let described = pandas
                .columns
                .iter()
                .find(|c| c.field_name.as_deref() == Some(field_name.as_str()));
            let name = match described {
                Some(column) => label_name(column.name.as_ref()),
                None if is_generated_level_name(field_name) => None,
                None => Some(field_name.clone()),
            };
            (field_name.clone(), name)
        })
        .collect();

    if levels.is_empty() {
        return Ok(IndexLayout::default());
    }
    Ok(IndexLayout::Stored(levels))
}
