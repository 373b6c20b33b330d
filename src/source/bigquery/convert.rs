//! Conversion from BigQuery REST rows to Arrow record batches.
//!
//! The REST API encodes every scalar as a JSON string, so each column is
//! first collected as text and then cast to its Arrow type in one pass.

use super::client::{TableFieldSchema, TableRow};
use crate::error::{RunnerError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use datafusion::arrow::array::{ArrayRef, BinaryArray, StringArray};
use datafusion::arrow::compute::{cast_with_options, CastOptions};
use datafusion::arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use datafusion::arrow::record_batch::{RecordBatch, RecordBatchOptions};
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

/// Scale used for NUMERIC columns, fixed by BigQuery.
const NUMERIC_SCALE: i8 = 9;

/// How a BigQuery column is materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Bytes,
    Int64,
    Float64,
    Boolean,
    Numeric,
    Date,
    DateTime,
    Time,
    Timestamp,
    /// RECORD and REPEATED values, rendered as JSON text.
    Json,
}

impl ColumnKind {
    /// Picks the column kind for a top-level field.
    pub fn for_field(field: &TableFieldSchema) -> Result<Self> {
        if field.is_repeated() {
            return Ok(Self::Json);
        }

        let kind = match field.field_type.to_uppercase().as_str() {
            "STRING" | "JSON" | "GEOGRAPHY" | "BIGNUMERIC" | "BIGDECIMAL" | "INTERVAL"
            | "RANGE" => Self::Text,
            "BYTES" => Self::Bytes,
            "INTEGER" | "INT64" => Self::Int64,
            "FLOAT" | "FLOAT64" => Self::Float64,
            "BOOLEAN" | "BOOL" => Self::Boolean,
            "NUMERIC" | "DECIMAL" => Self::Numeric,
            "DATE" => Self::Date,
            "DATETIME" => Self::DateTime,
            "TIME" => Self::Time,
            "TIMESTAMP" => Self::Timestamp,
            "RECORD" | "STRUCT" => Self::Json,
            other => {
                return Err(RunnerError::data_source(format!(
                    "Unsupported BigQuery type '{other}' for column '{}'",
                    field.name
                )))
            }
        };
        Ok(kind)
    }

    /// Returns the Arrow type of the column.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Text | Self::Json => DataType::Utf8,
            Self::Bytes => DataType::Binary,
            Self::Int64 => DataType::Int64,
            Self::Float64 => DataType::Float64,
            Self::Boolean => DataType::Boolean,
            Self::Numeric => DataType::Decimal128(38, NUMERIC_SCALE),
            Self::Date => DataType::Date32,
            Self::DateTime => DataType::Timestamp(TimeUnit::Microsecond, None),
            Self::Time => DataType::Time64(TimeUnit::Microsecond),
            Self::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
        }
    }
}

/// Converts pages of REST rows for one table into record batches.
#[derive(Debug, Clone)]
pub struct RowConverter {
    fields: Vec<TableFieldSchema>,
    kinds: Vec<ColumnKind>,
    schema: SchemaRef,
}

impl RowConverter {
    /// Builds a converter for the given table schema.
    pub fn try_new(fields: &[TableFieldSchema]) -> Result<Self> {
        let kinds = fields
            .iter()
            .map(ColumnKind::for_field)
            .collect::<Result<Vec<_>>>()?;

        let arrow_fields: Vec<Field> = fields
            .iter()
            .zip(&kinds)
            .map(|(field, kind)| {
                Field::new(&field.name, kind.data_type(), !field.is_required())
            })
            .collect();

        Ok(Self {
            fields: fields.to_vec(),
            kinds,
            schema: Arc::new(Schema::new(arrow_fields)),
        })
    }

    /// Returns the Arrow schema of the converted batches.
    pub fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    /// Converts one page of rows into a record batch.
    pub fn convert(&self, rows: &[TableRow]) -> Result<RecordBatch> {
        let mut columns: Vec<Vec<Option<String>>> =
            vec![Vec::with_capacity(rows.len()); self.fields.len()];

        for (row_idx, row) in rows.iter().enumerate() {
            if row.f.len() != self.fields.len() {
                return Err(RunnerError::data_source(format!(
                    "Row {row_idx} has {} cells, expected {}",
                    row.f.len(),
                    self.fields.len()
                )));
            }

            for ((cell, field), (kind, column)) in row
                .f
                .iter()
                .zip(&self.fields)
                .zip(self.kinds.iter().zip(columns.iter_mut()))
            {
                let text = match kind {
                    _ if cell.v.is_null() => None,
                    ColumnKind::Json => Some(to_plain_json(&cell.v, field).to_string()),
                    _ => scalar_text(&cell.v),
                };
                column.push(text);
            }
        }

        let arrays = columns
            .into_iter()
            .zip(self.fields.iter().zip(&self.kinds))
            .map(|(values, (field, kind))| build_array(values, field, *kind))
            .collect::<Result<Vec<_>>>()?;

        let options = RecordBatchOptions::new().with_row_count(Some(rows.len()));
        RecordBatch::try_new_with_options(self.schema(), arrays, &options).map_err(|e| {
            RunnerError::data_source(format!("Failed to assemble record batch: {e}"))
        })
    }
}

/// Returns the text of a scalar cell, or `None` for NULL.
fn scalar_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Unwraps the REST `{"f": [{"v": ..}]}` / `[{"v": ..}]` encoding into plain JSON.
fn to_plain_json(value: &JsonValue, field: &TableFieldSchema) -> JsonValue {
    if field.is_repeated() {
        let items = match value {
            JsonValue::Array(items) => items
                .iter()
                .map(|item| to_plain_scalar_or_record(cell_value(item), field))
                .collect(),
            _ => Vec::new(),
        };
        return JsonValue::Array(items);
    }
    to_plain_scalar_or_record(value, field)
}

fn to_plain_scalar_or_record(value: &JsonValue, field: &TableFieldSchema) -> JsonValue {
    if field.fields.is_empty() {
        return value.clone();
    }

    let cells = match value.get("f") {
        Some(JsonValue::Array(cells)) => cells,
        _ => return value.clone(),
    };

    let object: Map<String, JsonValue> = field
        .fields
        .iter()
        .zip(cells)
        .map(|(child, cell)| (child.name.clone(), to_plain_json(cell_value(cell), child)))
        .collect();
    JsonValue::Object(object)
}

/// Returns the `v` member of a `{"v": ..}` wrapper.
fn cell_value(cell: &JsonValue) -> &JsonValue {
    static NULL: JsonValue = JsonValue::Null;
    cell.get("v").unwrap_or(&NULL)
}

fn build_array(
    values: Vec<Option<String>>,
    field: &TableFieldSchema,
    kind: ColumnKind,
) -> Result<ArrayRef> {
    let column_error = |e: String| {
        RunnerError::data_source(format!("Invalid value in column '{}': {e}", field.name))
    };

    match kind {
        ColumnKind::Text | ColumnKind::Json => Ok(Arc::new(StringArray::from(values))),
        ColumnKind::Bytes => {
            let decoded = values
                .iter()
                .map(|v| v.as_deref().map(|s| STANDARD.decode(s)).transpose())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| column_error(e.to_string()))?;
            let refs: Vec<Option<&[u8]>> = decoded.iter().map(|v| v.as_deref()).collect();
            Ok(Arc::new(BinaryArray::from(refs)))
        }
        ColumnKind::Timestamp => {
            // Timestamps arrive as integer microseconds since the epoch.
            let micros = cast_strict(&StringArray::from(values), &DataType::Int64)
                .map_err(column_error)?;
            cast_strict(&micros, &kind.data_type()).map_err(column_error)
        }
        _ => cast_strict(&StringArray::from(values), &kind.data_type()).map_err(column_error),
    }
}

/// Casts, failing on values that do not parse instead of nulling them.
fn cast_strict(
    array: &dyn datafusion::arrow::array::Array,
    data_type: &DataType,
) -> std::result::Result<ArrayRef, String> {
    let options = CastOptions {
        safe: false,
        ..Default::default()
    };
    cast_with_options(array, data_type, &options).map_err(|e| e.to_string())
}
