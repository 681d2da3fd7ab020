//! In-memory tables read from `LeRobot` dataset metadata files.
//!
//! `LeRobot` exports write small metadata tables (such as `meta/tasks.parquet`)
//! with pandas. A pandas frame carries row labels (its index) next to its
//! regular columns, and the index survives the round-trip through Parquet only
//! as schema metadata. This crate recovers both halves so callers can reason
//! about a table the way the exporting code saw it.
//!
//! # Modules
//!
//! - [`table`]: [`Table`], [`Column`], [`RowLabels`] and the [`Scalar`] cell type
//! - [`reader`]: the [`TableReader`] seam and its Parquet implementation
//!
//! # Examples
//!
//! ```
//! use lerobot_table::{Column, Scalar, Table, ValueKind};
//!
//! let table = Table::from_columns(vec![
//!     Column::new("task_index", ValueKind::Integer, vec![Scalar::Int(0), Scalar::Int(1)]),
//!     Column::new("task", ValueKind::Text, vec![Scalar::from("pick"), Scalar::from("place")]),
//! ])
//! .unwrap();
//! assert_eq!(table.num_rows(), 2);
//! assert_eq!(table.column_names().collect::<Vec<_>>(), ["task_index", "task"]);
//! ```

use std::{io, path::PathBuf};

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

pub use self::{reader::*, table::*};

mod pandas;
pub mod reader;
pub mod table;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum TableError {
    #[display("column '{column}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[display("failed to open table file: {}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[display("failed to decode parquet file: {}", path.display())]
    Parquet { path: PathBuf, source: ParquetError },
    #[display("failed to read record batch from {}", path.display())]
    ReadBatch { path: PathBuf, source: ArrowError },
    #[display("failed to convert column '{column}'")]
    ConvertColumn { column: String, source: ArrowError },
    #[display("invalid pandas metadata in {}", path.display())]
    PandasMetadata {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("pandas index column '{column}' is missing from {}", path.display())]
    MissingIndexColumn { path: PathBuf, column: String },
}
