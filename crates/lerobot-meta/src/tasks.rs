//! Conversion of `meta/tasks.parquet` into `meta/tasks.jsonl`.
//!
//! Some `LeRobot` exports only ship the Parquet task table, while training
//! pipelines expect one `{"task_index": <int>, "task": "<description>"}`
//! object per line. The table layout varies between exporters, so the column
//! holding the task text is inferred:
//!
//! 1. a column literally named `task`;
//! 2. otherwise the only column besides `task_index`;
//! 3. otherwise, when `task_index` is the only column, an unnamed text index;
//! 4. otherwise the schema is ambiguous and nothing is written.

use std::{fs, io, path::PathBuf};

use lerobot_table::{Column, IntegerCoercionError, Table, TableError, TableReader};
use serde::{Deserialize, Serialize};

use crate::DatasetLayout;

pub const TASK_COLUMN: &str = "task";
pub const TASK_INDEX_COLUMN: &str = "task_index";

/// Where the task text of each row comes from.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::IsVariant)]
pub enum ColumnSource {
    /// A regular column.
    Named(String),
    /// The row labels of the table.
    RowLabel,
}

/// One line of `tasks.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_index: i64,
    pub task: String,
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum BuildTasksError {
    #[display("Missing {}", path.display())]
    MissingInput { path: PathBuf },
    #[display("Unable to infer task text column from columns={columns:?}")]
    AmbiguousSchema { columns: Vec<String> },
    #[display("Invalid task index in row {row} of column '{column}'")]
    InvalidRow {
        row: usize,
        column: String,
        source: IntegerCoercionError,
    },
    #[display("Failed to read task table")]
    ReadTable { source: TableError },
    #[display("Failed to encode task records")]
    Encode { source: serde_json::Error },
    #[display("Failed to write {}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

fn ambiguous(table: &Table) -> BuildTasksError {
    BuildTasksError::AmbiguousSchema {
        columns: table.column_names().map(str::to_owned).collect(),
    }
}

/// Picks the source of the task text.
pub fn infer_task_column(table: &Table) -> Result<ColumnSource, BuildTasksError> {
    if table.column(TASK_COLUMN).is_some() {
        return Ok(ColumnSource::Named(TASK_COLUMN.to_owned()));
    }

    let mut others = table
        .column_names()
        .filter(|name| *name != TASK_INDEX_COLUMN);
    if let (Some(only), None) = (others.next(), others.next()) {
        return Ok(ColumnSource::Named(only.to_owned()));
    }

    // Only `task_index` is left; the tasks may live in the index.
    let unnamed_text_index = table
        .labels()
        .single_level()
        .is_some_and(|level| level.name.is_none() && level.kind.is_text());
    if table.columns().len() == 1 && unnamed_text_index {
        return Ok(ColumnSource::RowLabel);
    }

    Err(ambiguous(table))
}

/// Builds one record per row, in row order.
///
/// The text comes from the inferred [`ColumnSource`]. The task index comes
/// from the `task_index` column when there is one, otherwise from the row
/// labels. Every index must convert to an integer; the first row that does
/// not fails the whole conversion.
pub fn build_task_records(table: &Table) -> Result<Vec<TaskRecord>, BuildTasksError> {
    let source = infer_task_column(table)?;
    tracing::debug!(?source, num_rows = table.num_rows(), "inferred task text source");

    let reset = table.reset_labels();
    let text_column = match &source {
        ColumnSource::Named(name) => table.column(name),
        ColumnSource::RowLabel => reset.first(),
    }
    .ok_or_else(|| ambiguous(table))?;
    let index_column = reset
        .iter()
        .find(|column| column.name() == TASK_INDEX_COLUMN)
        .or_else(|| reset.first())
        .ok_or_else(|| ambiguous(table))?;

    records_from_columns(text_column, index_column)
}

fn records_from_columns(
    text_column: &Column,
    index_column: &Column,
) -> Result<Vec<TaskRecord>, BuildTasksError> {
    text_column
        .values()
        .iter()
        .zip(index_column.values())
        .enumerate()
        .map(|(row, (text, index))| {
            let task_index = index
                .to_integer()
                .map_err(|source| BuildTasksError::InvalidRow {
                    row,
                    column: index_column.name().to_owned(),
                    source,
                })?;
            Ok(TaskRecord {
                task_index,
                task: text.to_string(),
            })
        })
        .collect()
}

/// Encodes records as compact, newline-terminated JSON objects. Non-ASCII
/// text is written as UTF-8 rather than `\u` escapes.
pub fn encode_jsonl(records: &[TaskRecord]) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    for record in records {
        serde_json::to_writer(&mut buf, record)?;
        buf.push(b'\n');
    }
    Ok(buf)
}

/// Writes `meta/tasks.jsonl` from `meta/tasks.parquet` and returns the number of tasks.
///
/// The output file is only touched once every row converted successfully.
pub fn build_tasks_jsonl<R>(layout: &DatasetLayout, reader: &R) -> Result<usize, BuildTasksError>
where
    R: TableReader + ?Sized,
{
    let input = layout.tasks_parquet();
    if !input.exists() {
        return Err(BuildTasksError::MissingInput { path: input });
    }

    let table = reader
        .read_table(&input)
        .map_err(|source| BuildTasksError::ReadTable { source })?;
    let records = build_task_records(&table)?;
    let encoded = encode_jsonl(&records).map_err(|source| BuildTasksError::Encode { source })?;

    let output = layout.tasks_jsonl();
    fs::write(&output, encoded).map_err(|source| BuildTasksError::Write {
        path: output.clone(),
        source,
    })?;
    tracing::info!(count = records.len(), path = %output.display(), "wrote tasks");

    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, fs::File, path::Path, sync::Arc};

    use arrow::{
        array::{ArrayRef, Int64Array, RecordBatch, StringArray},
        datatypes::{DataType, Field, Schema},
    };
    use lerobot_table::{LabelLevel, ParquetTableReader, RowLabels, Scalar, ValueKind};
    use parquet::arrow::ArrowWriter;

    use super::*;

    fn int_column(name: &str, values: &[i64]) -> Column {
        Column::new(
            name,
            ValueKind::Integer,
            values.iter().copied().map(Scalar::Int).collect(),
        )
    }

    fn text_column(name: &str, values: &[&str]) -> Column {
        Column::new(
            name,
            ValueKind::Text,
            values.iter().map(|v| Scalar::from(*v)).collect(),
        )
    }

    fn table(columns: Vec<Column>) -> Table {
        Table::from_columns(columns).unwrap()
    }

    fn indexed_by_text(values: &[&str], name: Option<&str>) -> Table {
        let indices: Vec<i64> = (0..).take(values.len()).collect();
        table(vec![int_column(TASK_INDEX_COLUMN, &indices)])
            .with_labels(RowLabels::Stored(vec![LabelLevel {
                name: name.map(str::to_owned),
                kind: ValueKind::Text,
                values: values.iter().map(|v| Scalar::from(*v)).collect(),
            }]))
            .unwrap()
    }

    #[test]
    fn test_task_column_wins() {
        let t = table(vec![
            int_column("task_index", &[0]),
            text_column("description", &["x"]),
            text_column("task", &["pick"]),
        ]);
        assert_eq!(
            infer_task_column(&t).unwrap(),
            ColumnSource::Named("task".to_owned())
        );
    }

    #[test]
    fn test_single_other_column() {
        let t = table(vec![
            int_column("task_index", &[0]),
            text_column("instruction", &["pick"]),
        ]);
        assert_eq!(
            infer_task_column(&t).unwrap(),
            ColumnSource::Named("instruction".to_owned())
        );
    }

    #[test]
    fn test_two_other_columns_are_ambiguous() {
        let t = table(vec![
            int_column("task_index", &[0]),
            text_column("instruction", &["pick"]),
            text_column("note", &["n"]),
        ]);
        let err = infer_task_column(&t).unwrap_err();
        match &err {
            BuildTasksError::AmbiguousSchema { columns } => {
                assert_eq!(columns, &["task_index", "instruction", "note"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("instruction"));
    }

    #[test]
    fn test_unnamed_text_index() {
        let t = indexed_by_text(&["pick", "place"], None);
        assert_eq!(infer_task_column(&t).unwrap(), ColumnSource::RowLabel);
    }

    #[test]
    fn test_named_or_numeric_index_is_ambiguous() {
        let t = indexed_by_text(&["pick"], Some("task_name"));
        assert!(matches!(
            infer_task_column(&t),
            Err(BuildTasksError::AmbiguousSchema { .. })
        ));

        let t = table(vec![int_column("task_index", &[0, 1])]);
        assert!(matches!(
            infer_task_column(&t),
            Err(BuildTasksError::AmbiguousSchema { .. })
        ));
    }

    #[test]
    fn test_records_preserve_order_and_duplicates() {
        let t = table(vec![
            int_column("task_index", &[3, 1, 3]),
            text_column("task", &["c", "a", "c again"]),
        ]);
        let records = build_task_records(&t).unwrap();
        assert_eq!(
            records,
            [
                TaskRecord {
                    task_index: 3,
                    task: "c".to_owned()
                },
                TaskRecord {
                    task_index: 1,
                    task: "a".to_owned()
                },
                TaskRecord {
                    task_index: 3,
                    task: "c again".to_owned()
                },
            ]
        );
    }

    #[test]
    fn test_records_from_index_labels() {
        let t = indexed_by_text(&["pick", "place"], None);
        let records = build_task_records(&t).unwrap();
        assert_eq!(records[0].task, "pick");
        assert_eq!(records[1].task_index, 1);
        assert_eq!(records[1].task, "place");
    }

    #[test]
    fn test_missing_task_index_uses_row_labels() {
        let t = table(vec![text_column("instruction", &["pick", "place"])]);
        let records = build_task_records(&t).unwrap();
        assert_eq!(records[0].task_index, 0);
        assert_eq!(records[1].task_index, 1);
        assert_eq!(records[1].task, "place");
    }

    #[test]
    fn test_non_text_values_are_stringified() {
        let t = table(vec![
            int_column("task_index", &[0]),
            Column::new("task", ValueKind::Float, vec![Scalar::Float(1.0)]),
        ]);
        assert_eq!(build_task_records(&t).unwrap()[0].task, "1.0");
    }

    #[test]
    fn test_invalid_task_index() {
        let t = table(vec![
            text_column("task_index", &["0", "one"]),
            text_column("task", &["a", "b"]),
        ]);
        let err = build_task_records(&t).unwrap_err();
        assert!(matches!(
            err,
            BuildTasksError::InvalidRow { row: 1, ref column, .. } if column == "task_index"
        ));
    }

    #[test]
    fn test_empty_table() {
        let t = table(vec![
            int_column("task_index", &[]),
            text_column("task", &[]),
        ]);
        assert!(build_task_records(&t).unwrap().is_empty());
        assert!(encode_jsonl(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_encode_jsonl_lines() {
        let records = [
            TaskRecord {
                task_index: 0,
                task: "pick \"red\" cube".to_owned(),
            },
            TaskRecord {
                task_index: 1,
                task: "place".to_owned(),
            },
        ];
        let encoded = String::from_utf8(encode_jsonl(&records).unwrap()).unwrap();
        assert!(encoded.ends_with('\n'));
        let decoded: Vec<TaskRecord> = encoded
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(decoded, records);
    }

    #[test]
    fn test_encode_jsonl_is_compact_utf8() {
        let records = [TaskRecord {
            task_index: 3,
            task: "déposer le cube".to_owned(),
        }];
        let encoded = String::from_utf8(encode_jsonl(&records).unwrap()).unwrap();
        assert_eq!(encoded, "{\"task_index\":3,\"task\":\"déposer le cube\"}\n");
    }

    fn write_tasks_parquet(path: &Path) {
        let pandas = r#"{"index_columns": ["__index_level_0__"],
            "columns": [
              {"name": "task_index", "field_name": "task_index"},
              {"name": null, "field_name": "__index_level_0__"}
            ]}"#;
        let schema = Arc::new(Schema::new_with_metadata(
            vec![
                Field::new("task_index", DataType::Int64, false),
                Field::new("__index_level_0__", DataType::Utf8, false),
            ],
            HashMap::from([("pandas".to_owned(), pandas.to_owned())]),
        ));
        let arrays: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from(vec![0, 1, 2])),
            Arc::new(StringArray::from(vec![
                "Grab the pen",
                "Put it in the cup",
                "Close the drawer",
            ])),
        ];
        let batch = RecordBatch::try_new(Arc::clone(&schema), arrays).unwrap();
        let mut writer = ArrowWriter::try_new(File::create(path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn test_build_tasks_jsonl_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DatasetLayout::new(dir.path());
        fs::create_dir_all(layout.meta_dir()).unwrap();
        write_tasks_parquet(&layout.tasks_parquet());
        fs::write(layout.tasks_jsonl(), "stale\n").unwrap();

        let count = build_tasks_jsonl(&layout, &ParquetTableReader).unwrap();
        assert_eq!(count, 3);

        let written = fs::read_to_string(layout.tasks_jsonl()).unwrap();
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(lines.len(), 3);
        let last: TaskRecord = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(
            last,
            TaskRecord {
                task_index: 2,
                task: "Close the drawer".to_owned()
            }
        );
    }

    #[test]
    fn test_missing_parquet() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DatasetLayout::new(dir.path());

        let err = build_tasks_jsonl(&layout, &ParquetTableReader).unwrap_err();
        assert!(matches!(err, BuildTasksError::MissingInput { .. }));
        assert!(err.to_string().contains("tasks.parquet"));
        assert!(!layout.tasks_jsonl().exists());
    }

    #[test]
    fn test_failed_conversion_leaves_output_untouched() {
        struct FixedReader(Table);
        impl TableReader for FixedReader {
            fn read_table(&self, _path: &Path) -> Result<Table, TableError> {
                Ok(self.0.clone())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let layout = DatasetLayout::new(dir.path());
        fs::create_dir_all(layout.meta_dir()).unwrap();
        fs::write(layout.tasks_parquet(), b"").unwrap();
        fs::write(layout.tasks_jsonl(), "previous\n").unwrap();

        let reader = FixedReader(table(vec![
            int_column("task_index", &[0]),
            text_column("a", &["x"]),
            text_column("b", &["y"]),
        ]));
        let err = build_tasks_jsonl(&layout, &reader).unwrap_err();
        assert!(matches!(err, BuildTasksError::AmbiguousSchema { .. }));
        assert_eq!(
            fs::read_to_string(layout.tasks_jsonl()).unwrap(),
            "previous\n"
        );
    }
}
