#![cfg(feature = "arrow")]

use arrow_array::builder::StringDictionaryBuilder;
use arrow_array::types::Int32Type;
use arrow_array::{
    ArrayRef, BooleanArray, Date32Array, DictionaryArray, Float64Array, Int32Array, Int64Array,
    RecordBatch, StringArray, TimestampMicrosecondArray,
};
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use psp_ingest::arrow::{data_table_from_record_batch, dtype_for_arrow};
use psp_ingest::{build_table_from_data_table, DType, IngestError, Scalar, PSP_PKEY};
use std::sync::Arc;

fn text(s: &str) -> Option<Scalar> {
    Some(Scalar::Str(Arc::from(s)))
}

#[test]
fn record_batch_columns_keep_values_and_nulls() -> Result<(), Box<dyn std::error::Error>> {
    let mut dict = StringDictionaryBuilder::<Int32Type>::new();
    dict.append("cat")?;
    dict.append_null();
    dict.append("dog")?;

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(vec![Some(1), None, Some(3)])),
        Arc::new(Float64Array::from(vec![Some(0.5), Some(1.5), None])),
        Arc::new(BooleanArray::from(vec![None, Some(true), Some(false)])),
        Arc::new(Date32Array::from(vec![Some(0), Some(365), None])),
        Arc::new(TimestampMicrosecondArray::from(vec![Some(1_500), None, Some(-1)])),
        Arc::new(StringArray::from(vec![Some("x"), None, Some("y")])),
        Arc::new(dict.finish()),
    ];
    let schema = Schema::new(vec![
        Field::new("i", DataType::Int64, true),
        Field::new("f", DataType::Float64, true),
        Field::new("b", DataType::Boolean, true),
        Field::new("d", DataType::Date32, true),
        Field::new("t", DataType::Timestamp(TimeUnit::Microsecond, None), true),
        Field::new("s", DataType::Utf8, true),
        Field::new(
            "k",
            DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8)),
            true,
        ),
    ]);
    let batch = RecordBatch::try_new(Arc::new(schema), columns)?;

    let data = data_table_from_record_batch(&batch)?;
    assert_eq!(data.num_rows(), 3);
    assert_eq!(
        data.schema().types(),
        [
            DType::Int64,
            DType::Float64,
            DType::Bool,
            DType::Date,
            DType::Time,
            DType::Str,
            DType::Str,
        ]
    );

    let cells = |name: &str| -> Vec<Option<Scalar>> {
        let column = data.column(name).expect("column");
        (0..3).map(|row| column.get(row)).collect()
    };
    assert_eq!(cells("i"), vec![Some(Scalar::Int64(1)), None, Some(Scalar::Int64(3))]);
    assert_eq!(
        cells("f"),
        vec![Some(Scalar::Float64(0.5)), Some(Scalar::Float64(1.5)), None]
    );
    assert_eq!(
        cells("b"),
        vec![None, Some(Scalar::Bool(true)), Some(Scalar::Bool(false))]
    );
    assert_eq!(
        cells("d"),
        vec![
            Some(Scalar::Date(NaiveDate::from_ymd_opt(1970, 1, 1).expect("date"))),
            Some(Scalar::Date(NaiveDate::from_ymd_opt(1971, 1, 1).expect("date"))),
            None,
        ]
    );
    // Microseconds are normalized to milliseconds, rounding toward negative infinity.
    assert_eq!(cells("t"), vec![Some(Scalar::Time(1)), None, Some(Scalar::Time(-1))]);
    assert_eq!(cells("s"), vec![text("x"), None, text("y")]);
    assert_eq!(cells("k"), vec![text("cat"), None, text("dog")]);
    Ok(())
}

#[test]
fn dictionary_keys_resolve_through_repeated_and_null_values(
) -> Result<(), Box<dyn std::error::Error>> {
    let values = StringArray::from(vec![Some("a"), Some("a"), Some("b"), None]);
    let keys = Int32Array::from(vec![Some(1), Some(0), Some(2), Some(3), None]);
    let dict = DictionaryArray::<Int32Type>::try_new(keys, Arc::new(values))?;
    let schema = Schema::new(vec![Field::new(
        "k",
        DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8)),
        true,
    )]);
    let batch = RecordBatch::try_new(Arc::new(schema), vec![Arc::new(dict) as ArrayRef])?;

    let data = data_table_from_record_batch(&batch)?;
    let column = data.column("k")?;
    let cells: Vec<Option<Scalar>> = (0..5).map(|row| column.get(row)).collect();
    assert_eq!(cells, vec![text("a"), text("a"), text("b"), None, None]);
    assert_eq!(column.vocab().map(|v| v.len()), Some(2));
    Ok(())
}

#[test]
fn sliced_batches_use_their_own_null_offsets() -> Result<(), Box<dyn std::error::Error>> {
    let values = Arc::new(Int64Array::from(vec![None, Some(1), None, Some(3)])) as ArrayRef;
    let schema = Schema::new(vec![Field::new("i", DataType::Int64, true)]);
    let batch = RecordBatch::try_new(Arc::new(schema), vec![values])?.slice(1, 3);

    let data = data_table_from_record_batch(&batch)?;
    let column = data.column("i")?;
    assert_eq!(column.get(0), Some(Scalar::Int64(1)));
    assert_eq!(column.get(1), None);
    assert_eq!(column.get(2), Some(Scalar::Int64(3)));
    Ok(())
}

#[test]
fn ingested_batch_builds_a_table() -> Result<(), Box<dyn std::error::Error>> {
    let ids = Arc::new(Int64Array::from(vec![10, 20])) as ArrayRef;
    let schema = Schema::new(vec![Field::new("id", DataType::Int64, false)]);
    let batch = RecordBatch::try_new(Arc::new(schema), vec![ids])?;

    let table = build_table_from_data_table(data_table_from_record_batch(&batch)?, "id")?;
    assert_eq!(table.size(), 2);
    assert_eq!(table.get_value(1, PSP_PKEY), Some(Scalar::Int64(20)));
    Ok(())
}

#[test]
fn unsupported_arrow_types_are_rejected() {
    assert!(matches!(
        dtype_for_arrow(&DataType::Float16),
        Err(IngestError::UnsupportedArrowType(_))
    ));
    assert!(matches!(
        dtype_for_arrow(&DataType::Dictionary(
            Box::new(DataType::UInt8),
            Box::new(DataType::Utf8)
        )),
        Err(IngestError::UnsupportedArrowType(_))
    ));
}
