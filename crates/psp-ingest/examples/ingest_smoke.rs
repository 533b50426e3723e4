//! Ingest a few hand-built producer buffers and print the resulting table.

use psp_ingest::{
    build_data_table, build_schema, build_table_from_data_table, encode_null_mask,
    fill_column_date, fill_column_dict, fill_column_raw, DType, IngestResult,
};

fn main() -> IngestResult<()> {
    let schema = build_schema(
        vec!["qty".to_owned(), "day".to_owned(), "animal".to_owned()],
        vec![DType::Int32, DType::Date, DType::Str],
    )?;
    let mut data = build_data_table(&schema, 3)?;

    let qty: Vec<u8> = [5i32, 7, 9].iter().flat_map(|v| v.to_le_bytes()).collect();
    let mask = encode_null_mask([true, false, true]);
    fill_column_raw(data.column_mut("qty")?, &qty, Some(&mask), 0, 3, 4)?;
    fill_column_date(data.column_mut("day")?, &[19_000, 19_001, 19_002], None, 0, 3)?;
    fill_column_dict(
        data.column_mut("animal")?,
        b"catdog",
        &[0, 3, 6],
        &[1, 0, 1],
        None,
        0,
        3,
    )?;

    let table = build_table_from_data_table(data, "")?;
    print!("{}", table.pretty_print(10));
    Ok(())
}
