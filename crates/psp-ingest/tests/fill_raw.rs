use pretty_assertions::assert_eq;
use proptest::prelude::*;
use psp_ingest::{encode_null_mask, fill_column_raw, Column, DType, IngestError, Scalar};

fn column(dtype: DType, rows: usize) -> Column {
    let mut data = psp_ingest::build_data_table(
        &psp_ingest::build_schema(vec!["c".to_owned()], vec![dtype]).unwrap(),
        rows,
    )
    .unwrap();
    data.column_mut("c").unwrap().clone()
}

fn le_bytes(values: &[i64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

#[test]
fn no_mask_marks_every_row_valid() {
    let mut col = column(DType::Int64, 3);
    fill_column_raw(&mut col, &le_bytes(&[10, -20, 30]), None, 0, 3, 8).unwrap();

    assert_eq!(col.null_count(), 0);
    assert_eq!(
        (0..3).map(|row| col.get(row)).collect::<Vec<_>>(),
        vec![
            Some(Scalar::Int64(10)),
            Some(Scalar::Int64(-20)),
            Some(Scalar::Int64(30)),
        ]
    );
}

#[test]
fn mask_bits_are_read_lsb_first() {
    let mut col = column(DType::Float64, 10);
    let values: Vec<u8> = (0..10).flat_map(|i| f64::from(i).to_le_bytes()).collect();
    // Row 0, row 2 and row 9 are valid.
    let mask = [0b0000_0101u8, 0b0000_0010];

    fill_column_raw(&mut col, &values, Some(&mask), 0, 10, 8).unwrap();

    let valid: Vec<usize> = (0..10).filter(|row| col.is_valid(*row)).collect();
    assert_eq!(valid, vec![0, 2, 9]);
    assert_eq!(col.get(9), Some(Scalar::Float64(9.0)));
    assert_eq!(col.get(1), None);
}

#[test]
fn masked_fill_clears_previously_valid_rows() {
    let mut col = column(DType::Int64, 2);
    fill_column_raw(&mut col, &le_bytes(&[1, 2]), None, 0, 2, 8).unwrap();
    fill_column_raw(&mut col, &le_bytes(&[3, 4]), Some(&[0b01]), 0, 2, 8).unwrap();

    assert_eq!(col.get(0), Some(Scalar::Int64(3)));
    assert_eq!(col.get(1), None);
}

#[test]
fn fill_at_offset_leaves_other_rows_alone() {
    let mut col = column(DType::Int16, 4);
    let bytes: Vec<u8> = [7i16, 8].iter().flat_map(|v| v.to_le_bytes()).collect();
    fill_column_raw(&mut col, &bytes, None, 1, 2, 2).unwrap();

    assert_eq!(col.get(0), None);
    assert_eq!(col.get(1), Some(Scalar::Int16(7)));
    assert_eq!(col.get(2), Some(Scalar::Int16(8)));
    assert_eq!(col.get(3), None);
}

#[test]
fn short_mask_is_rejected_before_writing() {
    let mut col = column(DType::UInt8, 9);
    let err = fill_column_raw(&mut col, &[1; 9], Some(&[0xff]), 0, 9, 1).unwrap_err();
    assert!(matches!(
        err,
        IngestError::SizeMismatch {
            what: "null mask bytes",
            expected: 2,
            actual: 1
        }
    ));
    assert_eq!(col.null_count(), 9);
}

#[test]
fn bool_bytes_are_nonzero_true() {
    let mut col = column(DType::Bool, 3);
    fill_column_raw(&mut col, &[0, 1, 2], None, 0, 3, 1).unwrap();
    assert_eq!(col.get(0), Some(Scalar::Bool(false)));
    assert_eq!(col.get(1), Some(Scalar::Bool(true)));
    assert_eq!(col.get(2), Some(Scalar::Bool(true)));
}

proptest! {
    #[test]
    fn validity_matches_mask_bits(
        entries in proptest::collection::vec((any::<i32>(), any::<bool>()), 1..100)
    ) {
        let len = entries.len();
        let bytes: Vec<u8> = entries.iter().flat_map(|(v, _)| v.to_le_bytes()).collect();
        let mask = encode_null_mask(entries.iter().map(|(_, valid)| *valid));

        let mut col = column(DType::Int32, len);
        fill_column_raw(&mut col, &bytes, Some(&mask), 0, len, 4).unwrap();

        for (row, (value, valid)) in entries.iter().enumerate() {
            let expected = valid.then_some(Scalar::Int32(*value));
            prop_assert_eq!(col.get(row), expected);
        }
    }
}
