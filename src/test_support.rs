//! Parquet fixtures shared by the unit and integration tests

use arrow::array::{ArrayRef, Date32Array, StringArray, Time64MicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use crate::db::TableDef;

/// Write `batches` to `dir/filename`, optionally capping the row group size
pub fn write_parquet(
    dir: &TempDir,
    filename: &str,
    batches: &[RecordBatch],
    max_row_group_size: Option<usize>,
) -> PathBuf {
    let path = dir.path().join(filename);
    let file = std::fs::File::create(&path).unwrap();

    let mut props = WriterProperties::builder();
    if let Some(size) = max_row_group_size {
        props = props.set_max_row_group_size(size);
    }

    let schema = batches[0].schema();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props.build())).unwrap();
    for batch in batches {
        writer.write(batch).unwrap();
    }
    writer.close().unwrap();

    path
}

/// Build a batch for `table` with every column as a Utf8 string
///
/// `cell(row, column)` supplies each value; `None` becomes a null.
pub fn text_batch<F>(table: &TableDef, num_rows: usize, mut cell: F) -> RecordBatch
where
    F: FnMut(usize, &str) -> Option<String>,
{
    let fields: Vec<Field> = table
        .columns
        .iter()
        .map(|c| Field::new(*c, DataType::Utf8, true))
        .collect();

    let arrays: Vec<ArrayRef> = table
        .columns
        .iter()
        .map(|c| {
            let values: StringArray = (0..num_rows).map(|row| cell(row, c)).collect();
            Arc::new(values) as ArrayRef
        })
        .collect();

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
}

/// Build a sales document batch with native Date32/Time64 creation columns
pub fn sales_document_batch(table: &TableDef, documents: &[(&str, i32, i64)]) -> RecordBatch {
    let mut fields = Vec::new();
    let mut arrays: Vec<ArrayRef> = Vec::new();

    for column in table.columns {
        match *column {
            "CREATIONDATE" => {
                fields.push(Field::new(*column, DataType::Date32, true));
                arrays.push(Arc::new(Date32Array::from_iter_values(
                    documents.iter().map(|d| d.1),
                )));
            }
            "CREATIONTIME" => {
                fields.push(Field::new(
                    *column,
                    DataType::Time64(TimeUnit::Microsecond),
                    true,
                ));
                arrays.push(Arc::new(Time64MicrosecondArray::from_iter_values(
                    documents.iter().map(|d| d.2),
                )));
            }
            "SALESDOCUMENT" => {
                fields.push(Field::new(*column, DataType::Utf8, false));
                arrays.push(Arc::new(StringArray::from_iter_values(
                    documents.iter().map(|d| d.0),
                )));
            }
            other => {
                fields.push(Field::new(other, DataType::Utf8, true));
                arrays.push(Arc::new(StringArray::from_iter_values(
                    documents.iter().map(|d| format!("{}_{}", other, d.0)),
                )));
            }
        }
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
}
