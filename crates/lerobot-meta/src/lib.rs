//! Repairs for `LeRobot` dataset metadata.
//!
//! Datasets recorded with SO-100/101 arms are sometimes exported with metadata
//! that training pipelines cannot consume directly. This crate provides the
//! one-shot fixes:
//!
//! - [`tasks`]: derive `meta/tasks.jsonl` from `meta/tasks.parquet`
//! - [`stats`]: expand scalar `count` statistics to one entry per dimension
//! - [`data_config`]: modality key declarations (including the top+front
//!   dual-camera selector) and a check against `meta/modality.json`
//!
//! Every operation takes a [`DatasetLayout`] resolved by the caller; nothing
//! here reads the environment.
//!
//! # Examples
//!
//! ```no_run
//! use lerobot_meta::{
//!     DatasetLayout,
//!     stats::{WriteMode, fix_stats_counts},
//!     tasks::build_tasks_jsonl,
//! };
//! use lerobot_table::ParquetTableReader;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let layout = DatasetLayout::new("/data/so100_pick_place");
//! let count = build_tasks_jsonl(&layout, &ParquetTableReader)?;
//! println!("Wrote {count} tasks");
//!
//! let outcome = fix_stats_counts(&layout, WriteMode::Write)?;
//! println!("changed: {}", outcome.changed());
//! # Ok(())
//! # }
//! ```

pub use self::layout::DatasetLayout;

pub mod data_config;
mod layout;
pub mod stats;
pub mod tasks;
