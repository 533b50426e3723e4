use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use psp_ingest::{
    build_data_table, build_schema, date_from_days, days_from_date, fill_column_date,
    fill_column_raw, fill_column_time, Column, DType, DateZone, IngestError, Scalar,
};

fn column(dtype: DType, rows: usize) -> Column {
    let schema = build_schema(vec!["t".to_owned()], vec![dtype]).unwrap();
    let mut data = build_data_table(&schema, rows).unwrap();
    data.column_mut("t").unwrap().clone()
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn dates_store_calendar_year() {
    let mut col = column(DType::Date, 3);
    // 2000-03-01 is day 11_017; 2024-02-29 is day 19_782.
    fill_column_date(&mut col, &[0, 11_017, 19_782], None, 0, 3).unwrap();

    assert_eq!(col.get(0), Some(Scalar::Date(ymd(1970, 1, 1))));
    assert_eq!(col.get(1), Some(Scalar::Date(ymd(2000, 3, 1))));
    assert_eq!(col.get(2), Some(Scalar::Date(ymd(2024, 2, 29))));
}

#[test]
fn masked_dates_are_invalid_and_not_decoded() {
    let mut col = column(DType::Date, 2);
    // The masked day count is out of range; it must not be decoded.
    fill_column_date(&mut col, &[1, i32::MAX], Some(&[0b01]), 0, 2).unwrap();

    assert_eq!(col.get(0), Some(Scalar::Date(ymd(1970, 1, 2))));
    assert_eq!(col.get(1), None);
}

#[test]
fn short_day_buffer_is_rejected() {
    let mut col = column(DType::Date, 3);
    assert!(matches!(
        fill_column_date(&mut col, &[0, 1], None, 0, 3),
        Err(IngestError::SizeMismatch { expected: 3, actual: 2, .. })
    ));
}

#[test]
fn times_are_stored_verbatim() {
    let mut col = column(DType::Time, 3);
    fill_column_time(&mut col, &[-1, 0, 1_700_000_000_123], Some(&[0b110]), 0, 3).unwrap();

    assert_eq!(col.get(0), None);
    assert_eq!(col.get(1), Some(Scalar::Time(0)));
    assert_eq!(col.get(2), Some(Scalar::Time(1_700_000_000_123)));
}

#[test]
fn raw_date_bytes_route_through_date_decoding() {
    let mut col = column(DType::Date, 1);
    fill_column_raw(&mut col, &365i32.to_le_bytes(), None, 0, 1, 4).unwrap();
    assert_eq!(col.get(0), Some(Scalar::Date(ymd(1971, 1, 1))));
}

#[test]
fn time_filler_rejects_date_columns() {
    let mut col = column(DType::Date, 1);
    assert!(matches!(
        fill_column_time(&mut col, &[0], None, 0, 1),
        Err(IngestError::DTypeMismatch { .. })
    ));
}

proptest! {
    #[test]
    fn utc_days_round_trip(days in -700_000i32..2_000_000) {
        let date = date_from_days(days, DateZone::Utc).unwrap();
        prop_assert_eq!(days_from_date(date), days);
    }
}
