//! Arrow interoperability: ingest a [`RecordBatch`] into a [`DataTable`] through the same
//! bulk fillers used for raw producer buffers.

#![forbid(unsafe_code)]

use crate::data_table::DataTable;
use crate::error::{IngestError, IngestResult};
use crate::fill::{
    fill_column_date_with, fill_column_slice, fill_column_str, fill_column_time, ColumnSlice,
};
use crate::options::IngestOptions;
use crate::schema::Schema;
use crate::types::DType;
use arrow_array::cast::AsArray;
use arrow_array::types::{
    Date32Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow_array::{Array, RecordBatch};
use arrow_schema::{DataType, TimeUnit};

/// Column dtype used to store an Arrow field of `data_type`.
pub fn dtype_for_arrow(data_type: &DataType) -> IngestResult<DType> {
    Ok(match data_type {
        DataType::Int64 => DType::Int64,
        DataType::Int32 => DType::Int32,
        DataType::Int16 => DType::Int16,
        DataType::Int8 => DType::Int8,
        DataType::UInt64 => DType::UInt64,
        DataType::UInt32 => DType::UInt32,
        DataType::UInt16 => DType::UInt16,
        DataType::UInt8 => DType::UInt8,
        DataType::Float64 => DType::Float64,
        DataType::Float32 => DType::Float32,
        DataType::Boolean => DType::Bool,
        DataType::Date32 => DType::Date,
        DataType::Timestamp(_, _) => DType::Time,
        DataType::Utf8 | DataType::LargeUtf8 => DType::Str,
        DataType::Dictionary(key, value)
            if **key == DataType::Int32 && **value == DataType::Utf8 =>
        {
            DType::Str
        }
        other => return Err(IngestError::UnsupportedArrowType(other.to_string())),
    })
}

pub fn data_table_from_record_batch(batch: &RecordBatch) -> IngestResult<DataTable> {
    data_table_from_record_batch_with(batch, &IngestOptions::default())
}

/// Convert `batch` into a fully sized [`DataTable`]; Arrow nulls become invalid cells.
///
/// Timestamps are normalized to milliseconds since the epoch.
pub fn data_table_from_record_batch_with(
    batch: &RecordBatch,
    options: &IngestOptions,
) -> IngestResult<DataTable> {
    let arrow_schema = batch.schema();
    let mut names = Vec::with_capacity(arrow_schema.fields().len());
    let mut dtypes = Vec::with_capacity(arrow_schema.fields().len());
    for field in arrow_schema.fields() {
        names.push(field.name().clone());
        dtypes.push(dtype_for_arrow(field.data_type())?);
    }

    let rows = batch.num_rows();
    let mut data_table = DataTable::new(Schema::new(names, dtypes)?, rows)?;
    data_table.extend(rows);

    for (field, array) in arrow_schema.fields().iter().zip(batch.columns()) {
        let column = data_table.column_mut(field.name())?;
        let nulls = array
            .nulls()
            .filter(|nulls| nulls.null_count() > 0)
            .map(|nulls| nulls.inner().sliced());
        let mask = nulls.as_ref().map(|buffer| buffer.as_slice());

        match array.data_type() {
            DataType::Int64 => fill_column_slice(
                column,
                ColumnSlice::Int64(array.as_primitive::<Int64Type>().values()),
                mask,
                0,
            )?,
            DataType::Int32 => fill_column_slice(
                column,
                ColumnSlice::Int32(array.as_primitive::<Int32Type>().values()),
                mask,
                0,
            )?,
            DataType::Int16 => fill_column_slice(
                column,
                ColumnSlice::Int16(array.as_primitive::<Int16Type>().values()),
                mask,
                0,
            )?,
            DataType::Int8 => fill_column_slice(
                column,
                ColumnSlice::Int8(array.as_primitive::<Int8Type>().values()),
                mask,
                0,
            )?,
            DataType::UInt64 => fill_column_slice(
                column,
                ColumnSlice::UInt64(array.as_primitive::<UInt64Type>().values()),
                mask,
                0,
            )?,
            DataType::UInt32 => fill_column_slice(
                column,
                ColumnSlice::UInt32(array.as_primitive::<UInt32Type>().values()),
                mask,
                0,
            )?,
            DataType::UInt16 => fill_column_slice(
                column,
                ColumnSlice::UInt16(array.as_primitive::<UInt16Type>().values()),
                mask,
                0,
            )?,
            DataType::UInt8 => fill_column_slice(
                column,
                ColumnSlice::UInt8(array.as_primitive::<UInt8Type>().values()),
                mask,
                0,
            )?,
            DataType::Float64 => fill_column_slice(
                column,
                ColumnSlice::Float64(array.as_primitive::<Float64Type>().values()),
                mask,
                0,
            )?,
            DataType::Float32 => fill_column_slice(
                column,
                ColumnSlice::Float32(array.as_primitive::<Float32Type>().values()),
                mask,
                0,
            )?,
            DataType::Boolean => {
                let values: Vec<bool> = array.as_boolean().values().iter().collect();
                fill_column_slice(column, ColumnSlice::Bool(&values), mask, 0)?
            }
            DataType::Date32 => fill_column_date_with(
                column,
                array.as_primitive::<Date32Type>().values(),
                mask,
                0,
                rows,
                options,
            )?,
            DataType::Timestamp(unit, _) => {
                let millis = timestamp_millis(array.as_ref(), unit);
                fill_column_time(column, &millis, mask, 0, rows)?
            }
            DataType::Utf8 => {
                let values: Vec<Option<&str>> = array.as_string::<i32>().iter().collect();
                fill_column_str(column, &values, 0)?
            }
            DataType::LargeUtf8 => {
                let values: Vec<Option<&str>> = array.as_string::<i64>().iter().collect();
                fill_column_str(column, &values, 0)?
            }
            DataType::Dictionary(_, _) => {
                // Dictionary values may repeat; keys resolve to strings and are re-interned.
                let dict = array.as_dictionary::<Int32Type>();
                let strings = dict.values().as_string::<i32>();
                let values: Vec<Option<&str>> = dict
                    .keys()
                    .iter()
                    .map(|key| {
                        key.and_then(|key| usize::try_from(key).ok())
                            .filter(|key| *key < strings.len() && strings.is_valid(*key))
                            .map(|key| strings.value(key))
                    })
                    .collect();
                fill_column_str(column, &values, 0)?
            }
            other => return Err(IngestError::UnsupportedArrowType(other.to_string())),
        }
    }

    log::debug!(
        "ingested record batch: {rows} rows, {} columns",
        data_table.num_columns()
    );
    Ok(data_table)
}

fn timestamp_millis(array: &dyn Array, unit: &TimeUnit) -> Vec<i64> {
    match unit {
        TimeUnit::Second => array
            .as_primitive::<TimestampSecondType>()
            .values()
            .iter()
            .map(|v| v.saturating_mul(1_000))
            .collect(),
        TimeUnit::Millisecond => array
            .as_primitive::<TimestampMillisecondType>()
            .values()
            .to_vec(),
        TimeUnit::Microsecond => array
            .as_primitive::<TimestampMicrosecondType>()
            .values()
            .iter()
            .map(|v| v.div_euclid(1_000))
            .collect(),
        TimeUnit::Nanosecond => array
            .as_primitive::<TimestampNanosecondType>()
            .values()
            .iter()
            .map(|v| v.div_euclid(1_000_000))
            .collect(),
    }
}
