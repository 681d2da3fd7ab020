use std::{fs::File, path::Path, sync::Arc};

use arrow::{
    array::{Array, AsArray as _},
    compute::cast,
    datatypes::{DataType, Float64Type, Int64Type},
    error::ArrowError,
};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::{
    Column, LabelLevel, RowLabels, Scalar, Table, TableError, ValueKind,
    pandas::{self, IndexLayout},
};

/// Source of in-memory tables.
pub trait TableReader {
    fn read_table(&self, path: &Path) -> Result<Table, TableError>;
}

/// Reads Parquet files, restoring the pandas index from schema metadata.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParquetTableReader;

impl TableReader for ParquetTableReader {
    fn read_table(&self, path: &Path) -> Result<Table, TableError> {
        let file = File::open(path).map_err(|source| TableError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let builder =
            ParquetRecordBatchReaderBuilder::try_new(file).map_err(|source| TableError::Parquet {
                path: path.to_path_buf(),
                source,
            })?;
        let schema = Arc::clone(builder.schema());
        let layout =
            pandas::index_layout(schema.metadata()).map_err(|source| TableError::PandasMetadata {
                path: path.to_path_buf(),
                source,
            })?;
        let reader = builder.build().map_err(|source| TableError::Parquet {
            path: path.to_path_buf(),
            source,
        })?;

        let mut fields: Vec<(String, ValueKind, Vec<Scalar>)> = schema
            .fields()
            .iter()
            .map(|field| (field.name().clone(), value_kind(field.data_type()), vec![]))
            .collect();
        let mut num_rows = 0;
        for batch in reader {
            let batch = batch.map_err(|source| TableError::ReadBatch {
                path: path.to_path_buf(),
                source,
            })?;
            num_rows += batch.num_rows();
            for ((name, kind, values), array) in fields.iter_mut().zip(batch.columns()) {
                append_values(array.as_ref(), *kind, values).map_err(|source| {
                    TableError::ConvertColumn {
                        column: name.clone(),
                        source,
                    }
                })?;
            }
        }
        tracing::debug!(
            path = %path.display(),
            num_rows,
            num_fields = fields.len(),
            "read parquet table"
        );

        let labels = match layout {
            IndexLayout::Range { name, start, step } => RowLabels::Range { name, start, step },
            IndexLayout::Stored(levels) => {
                let mut stored = Vec::with_capacity(levels.len());
                for (field_name, name) in levels {
                    let position = fields
                        .iter()
                        .position(|(field, _, _)| *field == field_name)
                        .ok_or_else(|| TableError::MissingIndexColumn {
                            path: path.to_path_buf(),
                            column: field_name.clone(),
                        })?;
                    let (_, kind, values) = fields.remove(position);
                    stored.push(LabelLevel { name, kind, values });
                }
                RowLabels::Stored(stored)
            }
        };
        let columns = fields
            .into_iter()
            .map(|(name, kind, values)| Column::new(name, kind, values))
            .collect();

        Table::new(columns, labels, num_rows)
    }
}

fn value_kind(data_type: &DataType) -> ValueKind {
    match data_type {
        DataType::Null => ValueKind::Null,
        DataType::Boolean => ValueKind::Boolean,
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => ValueKind::Integer,
        DataType::Float16
        | DataType::Float32
        | DataType::Float64
        | DataType::Decimal128(_, _)
        | DataType::Decimal256(_, _) => ValueKind::Float,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => ValueKind::Text,
        DataType::Dictionary(_, value_type) => value_kind(value_type),
        _ => ValueKind::Other,
    }
}

fn append_values(
    array: &dyn Array,
    kind: ValueKind,
    values: &mut Vec<Scalar>,
) -> Result<(), ArrowError> {
    match kind {
        ValueKind::Null => values.extend((0..array.len()).map(|_| Scalar::Null)),
        ValueKind::Boolean => {
            let array = cast(array, &DataType::Boolean)?;
            values.extend(
                array
                    .as_boolean()
                    .iter()
                    .map(|v| v.map_or(Scalar::Null, Scalar::Bool)),
            );
        }
        ValueKind::Integer => {
            let array = cast(array, &DataType::Int64)?;
            values.extend(
                array
                    .as_primitive::<Int64Type>()
                    .iter()
                    .map(|v| v.map_or(Scalar::Null, Scalar::Int)),
            );
        }
        ValueKind::Float => {
            let array = cast(array, &DataType::Float64)?;
            values.extend(
                array
                    .as_primitive::<Float64Type>()
                    .iter()
                    .map(|v| v.map_or(Scalar::Null, Scalar::Float)),
            );
        }
        ValueKind::Text | ValueKind::Other => {
            let array = cast(array, &DataType::Utf8)?;
            values.extend(
                array
                    .as_string::<i32>()
                    .iter()
                    .map(|v| v.map_or(Scalar::Null, Scalar::from)),
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use arrow::{
        array::{ArrayRef, Float64Array, Int32Array, Int64Array, RecordBatch, StringArray},
        datatypes::{Field, Schema},
    };
    use parquet::arrow::ArrowWriter;

    use super::*;

    fn write_parquet(path: &Path, schema: Schema, arrays: Vec<ArrayRef>) {
        let schema = Arc::new(schema);
        let batch = RecordBatch::try_new(Arc::clone(&schema), arrays).unwrap();
        let file = File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn test_read_plain_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.parquet");
        write_parquet(
            &path,
            Schema::new(vec![
                Field::new("task_index", DataType::Int32, false),
                Field::new("task", DataType::Utf8, true),
                Field::new("weight", DataType::Float64, true),
            ]),
            vec![
                Arc::new(Int32Array::from(vec![0, 1])),
                Arc::new(StringArray::from(vec![Some("pick"), None])),
                Arc::new(Float64Array::from(vec![0.5, 1.0])),
            ],
        );

        let table = ParquetTableReader.read_table(&path).unwrap();
        assert_eq!(table.num_rows(), 2);
        assert!(table.labels().is_range());
        assert_eq!(
            table.column_names().collect::<Vec<_>>(),
            ["task_index", "task", "weight"]
        );
        let task_index = table.column("task_index").unwrap();
        assert_eq!(task_index.kind(), ValueKind::Integer);
        assert_eq!(task_index.values(), [Scalar::Int(0), Scalar::Int(1)]);
        assert_eq!(
            table.column("task").unwrap().values(),
            [Scalar::from("pick"), Scalar::Null]
        );
        assert_eq!(table.column("weight").unwrap().kind(), ValueKind::Float);
    }

    #[test]
    fn test_read_pandas_string_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.parquet");
        let pandas = r#"{"index_columns": ["__index_level_0__"],
            "columns": [
              {"name": "task_index", "field_name": "task_index", "pandas_type": "int64"},
              {"name": null, "field_name": "__index_level_0__", "pandas_type": "unicode"}
            ]}"#;
        write_parquet(
            &path,
            Schema::new_with_metadata(
                vec![
                    Field::new("task_index", DataType::Int64, false),
                    Field::new("__index_level_0__", DataType::Utf8, false),
                ],
                HashMap::from([("pandas".to_owned(), pandas.to_owned())]),
            ),
            vec![
                Arc::new(Int64Array::from(vec![0, 1, 2])),
                Arc::new(StringArray::from(vec!["pick", "place", "push"])),
            ],
        );

        let table = ParquetTableReader.read_table(&path).unwrap();
        assert_eq!(table.column_names().collect::<Vec<_>>(), ["task_index"]);
        let level = table.labels().single_level().unwrap();
        assert_eq!(level.name, None);
        assert_eq!(level.kind, ValueKind::Text);
        assert_eq!(level.values[2], Scalar::from("push"));
    }

    #[test]
    fn test_index_field_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.parquet");
        write_parquet(
            &path,
            Schema::new_with_metadata(
                vec![Field::new("task_index", DataType::Int64, false)],
                HashMap::from([(
                    "pandas".to_owned(),
                    r#"{"index_columns": ["task"], "columns": []}"#.to_owned(),
                )]),
            ),
            vec![Arc::new(Int64Array::from(vec![0]))],
        );

        let result = ParquetTableReader.read_table(&path);
        assert!(matches!(
            result,
            Err(TableError::MissingIndexColumn { column, .. }) if column == "task"
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ParquetTableReader.read_table(&dir.path().join("absent.parquet"));
        assert!(matches!(result, Err(TableError::Open { .. })));
    }
}
