//! Bulk fillers that write producer buffers into column storage.
//!
//! Every filler validates its inputs (element width, buffer lengths, row range, null mask
//! coverage, dictionary codes) before touching the column, so a rejected call leaves the
//! column unchanged. Rows masked out by the null bitmap are explicitly marked invalid.

#![forbid(unsafe_code)]

use crate::bitmap::NullMask;
use crate::column::{Column, ColumnData};
use crate::error::{IngestError, IngestResult};
use crate::options::{DateZone, IngestOptions};
use crate::types::{size_of, DType};
use chrono::{Datelike, Local, NaiveDate, TimeZone};
use std::collections::HashSet;

/// `NaiveDate::num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;
const SECONDS_PER_DAY: i64 = 86_400;

/// A typed source buffer for [`fill_column_slice`].
#[derive(Clone, Copy, Debug)]
pub enum ColumnSlice<'a> {
    Int64(&'a [i64]),
    Int32(&'a [i32]),
    Int16(&'a [i16]),
    Int8(&'a [i8]),
    UInt64(&'a [u64]),
    UInt32(&'a [u32]),
    UInt16(&'a [u16]),
    UInt8(&'a [u8]),
    Float64(&'a [f64]),
    Float32(&'a [f32]),
    Bool(&'a [bool]),
    Time(&'a [i64]),
}

impl ColumnSlice<'_> {
    pub fn dtype(&self) -> DType {
        match self {
            ColumnSlice::Int64(_) => DType::Int64,
            ColumnSlice::Int32(_) => DType::Int32,
            ColumnSlice::Int16(_) => DType::Int16,
            ColumnSlice::Int8(_) => DType::Int8,
            ColumnSlice::UInt64(_) => DType::UInt64,
            ColumnSlice::UInt32(_) => DType::UInt32,
            ColumnSlice::UInt16(_) => DType::UInt16,
            ColumnSlice::UInt8(_) => DType::UInt8,
            ColumnSlice::Float64(_) => DType::Float64,
            ColumnSlice::Float32(_) => DType::Float32,
            ColumnSlice::Bool(_) => DType::Bool,
            ColumnSlice::Time(_) => DType::Time,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnSlice::Int64(v) | ColumnSlice::Time(v) => v.len(),
            ColumnSlice::Int32(v) => v.len(),
            ColumnSlice::Int16(v) => v.len(),
            ColumnSlice::Int8(v) => v.len(),
            ColumnSlice::UInt64(v) => v.len(),
            ColumnSlice::UInt32(v) => v.len(),
            ColumnSlice::UInt16(v) => v.len(),
            ColumnSlice::UInt8(v) => v.len(),
            ColumnSlice::Float64(v) => v.len(),
            ColumnSlice::Float32(v) => v.len(),
            ColumnSlice::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

macro_rules! copy_slice {
    ($data:expr, $values:expr, $start:expr, $($variant:ident),+ $(,)?) => {
        match ($data, $values) {
            $(
                (ColumnData::$variant(dst), ColumnSlice::$variant(src)) => {
                    dst[$start..$start + src.len()].copy_from_slice(src);
                    true
                }
            )+
            _ => false,
        }
    };
}

fn mask_for(mask: Option<&[u8]>, len: usize) -> IngestResult<Option<NullMask<'_>>> {
    mask.map(|bytes| NullMask::new(bytes, len)).transpose()
}

fn is_masked(mask: Option<&NullMask<'_>>, row: usize) -> bool {
    mask.is_some_and(|mask| !mask.is_valid(row))
}

fn apply_mask(column: &mut Column, mask: Option<&NullMask<'_>>, start: usize, len: usize) {
    match mask {
        None => column.set_valid_range(start, len, true),
        Some(mask) => {
            for row in 0..len {
                column.set_valid(start + row, mask.is_valid(row));
            }
        }
    }
}

fn check_input_len(what: &'static str, actual: usize, len: usize) -> IngestResult<()> {
    if actual < len {
        return Err(IngestError::SizeMismatch {
            what,
            expected: len,
            actual,
        });
    }
    Ok(())
}

fn decode<const N: usize, T>(bytes: &[u8], from_le: fn([u8; N]) -> T) -> Vec<T> {
    bytes
        .chunks_exact(N)
        .map(|chunk| {
            let mut buf = [0u8; N];
            buf.copy_from_slice(chunk);
            from_le(buf)
        })
        .collect()
}

/// Copy a typed slice into `column` starting at row `start`.
///
/// The slice variant must match the column dtype. Without a mask every written row is
/// marked valid; with one, each row takes the validity of its bit.
pub fn fill_column_slice(
    column: &mut Column,
    values: ColumnSlice<'_>,
    mask: Option<&[u8]>,
    start: usize,
) -> IngestResult<()> {
    let len = values.len();
    column.check_range(start, len)?;
    let mask = mask_for(mask, len)?;

    let copied = copy_slice!(
        column.data_mut(),
        values,
        start,
        Int64,
        Int32,
        Int16,
        Int8,
        UInt64,
        UInt32,
        UInt16,
        UInt8,
        Float64,
        Float32,
        Bool,
        Time,
    );
    if !copied {
        return Err(IngestError::DTypeMismatch {
            column: column.name().to_owned(),
            expected: column.dtype(),
            actual: values.dtype(),
        });
    }

    apply_mask(column, mask.as_ref(), start, len);
    log::trace!("filled {len} rows of `{}` at row {start}", column.name());
    Ok(())
}

/// Fill `len` rows from a little-endian byte buffer of `size`-byte elements.
///
/// `size` must equal [`size_of`] the column dtype and `bytes` must hold exactly
/// `len * size` bytes. Date columns read `i32` day counts and time columns read `i64`
/// values, each routed through the matching temporal filler.
pub fn fill_column_raw(
    column: &mut Column,
    bytes: &[u8],
    mask: Option<&[u8]>,
    start: usize,
    len: usize,
    size: usize,
) -> IngestResult<()> {
    let dtype = column.dtype();
    let width = size_of(dtype).ok_or(IngestError::NotFixedWidth(dtype))?;
    if size != width {
        return Err(IngestError::SizeMismatch {
            what: "element size",
            expected: width,
            actual: size,
        });
    }
    let expected = len.saturating_mul(width);
    if bytes.len() != expected {
        return Err(IngestError::SizeMismatch {
            what: "buffer bytes",
            expected,
            actual: bytes.len(),
        });
    }
    column.check_range(start, len)?;

    match dtype {
        DType::Int64 => fill_column_slice(
            column,
            ColumnSlice::Int64(&decode(bytes, i64::from_le_bytes)),
            mask,
            start,
        ),
        DType::Int32 => fill_column_slice(
            column,
            ColumnSlice::Int32(&decode(bytes, i32::from_le_bytes)),
            mask,
            start,
        ),
        DType::Int16 => fill_column_slice(
            column,
            ColumnSlice::Int16(&decode(bytes, i16::from_le_bytes)),
            mask,
            start,
        ),
        DType::Int8 => fill_column_slice(
            column,
            ColumnSlice::Int8(&decode(bytes, i8::from_le_bytes)),
            mask,
            start,
        ),
        DType::UInt64 => fill_column_slice(
            column,
            ColumnSlice::UInt64(&decode(bytes, u64::from_le_bytes)),
            mask,
            start,
        ),
        DType::UInt32 => fill_column_slice(
            column,
            ColumnSlice::UInt32(&decode(bytes, u32::from_le_bytes)),
            mask,
            start,
        ),
        DType::UInt16 => fill_column_slice(
            column,
            ColumnSlice::UInt16(&decode(bytes, u16::from_le_bytes)),
            mask,
            start,
        ),
        DType::UInt8 => fill_column_slice(column, ColumnSlice::UInt8(bytes), mask, start),
        DType::Float64 => fill_column_slice(
            column,
            ColumnSlice::Float64(&decode(bytes, f64::from_le_bytes)),
            mask,
            start,
        ),
        DType::Float32 => fill_column_slice(
            column,
            ColumnSlice::Float32(&decode(bytes, f32::from_le_bytes)),
            mask,
            start,
        ),
        DType::Bool => fill_column_slice(
            column,
            ColumnSlice::Bool(&decode(bytes, |b: [u8; 1]| b[0] != 0)),
            mask,
            start,
        ),
        DType::Time => fill_column_time(
            column,
            &decode(bytes, i64::from_le_bytes),
            mask,
            start,
            len,
        ),
        DType::Date => fill_column_date(
            column,
            &decode(bytes, i32::from_le_bytes),
            mask,
            start,
            len,
        ),
        other => Err(IngestError::NotFixedWidth(other)),
    }
}

/// Convert a count of days since 1970-01-01 into a calendar date.
pub fn date_from_days(days: i32, zone: DateZone) -> IngestResult<NaiveDate> {
    let date = match zone {
        DateZone::Utc => days
            .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
            .and_then(NaiveDate::from_num_days_from_ce_opt),
        DateZone::Local => Local
            .timestamp_opt(i64::from(days) * SECONDS_PER_DAY, 0)
            .single()
            .map(|dt| dt.date_naive()),
    };
    date.ok_or(IngestError::DateOutOfRange(days))
}

/// Inverse of [`date_from_days`] for the UTC calendar.
pub fn days_from_date(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Fill a date column from epoch day counts, decoding in UTC.
pub fn fill_column_date(
    column: &mut Column,
    days: &[i32],
    mask: Option<&[u8]>,
    start: usize,
    len: usize,
) -> IngestResult<()> {
    fill_column_date_with(column, days, mask, start, len, &IngestOptions::default())
}

pub fn fill_column_date_with(
    column: &mut Column,
    days: &[i32],
    mask: Option<&[u8]>,
    start: usize,
    len: usize,
    options: &IngestOptions,
) -> IngestResult<()> {
    column.expect_dtype(DType::Date)?;
    check_input_len("day counts", days.len(), len)?;
    column.check_range(start, len)?;
    let mask = mask_for(mask, len)?;
    if options.date_zone == DateZone::Local {
        log::warn!(
            "decoding `{}` in the process-local time zone; results depend on the host",
            column.name()
        );
    }

    let mut decoded = Vec::with_capacity(len);
    for (row, day) in days[..len].iter().enumerate() {
        if is_masked(mask.as_ref(), row) {
            decoded.push(None);
        } else {
            decoded.push(Some(date_from_days(*day, options.date_zone)?));
        }
    }

    if let ColumnData::Date(dst) = column.data_mut() {
        for (row, date) in decoded.iter().enumerate() {
            if let Some(date) = date {
                dst[start + row] = *date;
            }
        }
    }
    for (row, date) in decoded.iter().enumerate() {
        column.set_valid(start + row, date.is_some());
    }
    log::trace!("filled {len} dates of `{}` at row {start}", column.name());
    Ok(())
}

/// Fill a time column; values are stored verbatim.
pub fn fill_column_time(
    column: &mut Column,
    times: &[i64],
    mask: Option<&[u8]>,
    start: usize,
    len: usize,
) -> IngestResult<()> {
    column.expect_dtype(DType::Time)?;
    check_input_len("time values", times.len(), len)?;
    column.check_range(start, len)?;
    let mask = mask_for(mask, len)?;

    if let ColumnData::Time(dst) = column.data_mut() {
        for (row, time) in times[..len].iter().enumerate() {
            if !is_masked(mask.as_ref(), row) {
                dst[start + row] = *time;
            }
        }
    }
    apply_mask(column, mask.as_ref(), start, len);
    log::trace!("filled {len} times of `{}` at row {start}", column.name());
    Ok(())
}

fn split_blob<'a>(blob: &'a [u8], offsets: &[i32]) -> IngestResult<Vec<&'a str>> {
    if offsets.is_empty() {
        return Err(IngestError::InvalidOffsets(
            "offsets must hold at least the leading 0".to_owned(),
        ));
    }
    let mut out = Vec::with_capacity(offsets.len().saturating_sub(1));
    for (index, pair) in offsets.windows(2).enumerate() {
        let (begin, end) = (pair[0], pair[1]);
        if begin < 0 || end < begin || end as usize > blob.len() {
            return Err(IngestError::InvalidOffsets(format!(
                "string {index} spans {begin}..{end} in a blob of {} bytes",
                blob.len()
            )));
        }
        let s = std::str::from_utf8(&blob[begin as usize..end as usize])
            .map_err(|_| IngestError::InvalidUtf8 { index })?;
        out.push(s);
    }
    Ok(out)
}

/// Intern the strings delimited by `offsets` within `blob`, then write the caller's
/// per-row `codes`.
pub fn fill_column_dict(
    column: &mut Column,
    blob: &[u8],
    offsets: &[i32],
    codes: &[i32],
    mask: Option<&[u8]>,
    start: usize,
    len: usize,
) -> IngestResult<()> {
    fill_column_dict_with(
        column,
        blob,
        offsets,
        codes,
        mask,
        start,
        len,
        &IngestOptions::default(),
    )
}

/// See [`fill_column_dict`].
///
/// Strings are interned in offset order, so a fresh column assigns code `i` to the
/// `i`-th distinct string. Codes of unmasked rows are checked against the vocabulary
/// size the call would produce; the vocabulary only grows once every code passes.
#[allow(clippy::too_many_arguments)]
pub fn fill_column_dict_with(
    column: &mut Column,
    blob: &[u8],
    offsets: &[i32],
    codes: &[i32],
    mask: Option<&[u8]>,
    start: usize,
    len: usize,
    options: &IngestOptions,
) -> IngestResult<()> {
    column.expect_dtype(DType::Str)?;
    check_input_len("dictionary codes", codes.len(), len)?;
    column.check_range(start, len)?;
    let mask = mask_for(mask, len)?;
    let strings = split_blob(blob, offsets)?;

    let (dst, vocab) = column.dict_parts_mut()?;
    let mut unseen = HashSet::new();
    for s in &strings {
        if vocab.lookup(s).is_none() {
            unseen.insert(*s);
        }
    }
    let interned = vocab.len() + unseen.len();

    for (row, code) in codes[..len].iter().enumerate() {
        if is_masked(mask.as_ref(), row) {
            continue;
        }
        let in_range = *code >= 0 && (!options.verify_codes || (*code as usize) < interned);
        if !in_range {
            return Err(IngestError::InternConsistencyViolation {
                row,
                code: *code,
                interned,
            });
        }
    }

    for s in &strings {
        vocab.intern(s);
    }
    for (row, code) in codes[..len].iter().enumerate() {
        if !is_masked(mask.as_ref(), row) {
            dst[start + row] = *code as u32;
        }
    }
    apply_mask(column, mask.as_ref(), start, len);
    log::trace!(
        "filled {len} dictionary rows of `{}` at row {start} ({interned} strings interned)",
        column.name()
    );
    Ok(())
}

/// Fill a string column from optional values, looking codes up in the column's own
/// vocabulary instead of trusting caller-supplied codes.
pub fn fill_column_str(
    column: &mut Column,
    values: &[Option<&str>],
    start: usize,
) -> IngestResult<()> {
    column.expect_dtype(DType::Str)?;
    column.check_range(start, values.len())?;

    let (dst, vocab) = column.dict_parts_mut()?;
    for (row, value) in values.iter().enumerate() {
        if let Some(s) = value {
            dst[start + row] = vocab.intern(s);
        }
    }
    for (row, value) in values.iter().enumerate() {
        column.set_valid(start + row, value.is_some());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Scalar;

    fn column(dtype: DType, rows: usize) -> Column {
        let mut col = Column::new("c", dtype, rows).unwrap();
        col.extend(rows);
        col
    }

    #[test]
    fn epoch_day_zero_is_1970_01_01() {
        let date = date_from_days(0, DateZone::Utc).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
        assert_eq!(
            date_from_days(-1, DateZone::Utc).unwrap(),
            NaiveDate::from_ymd_opt(1969, 12, 31).unwrap()
        );
        assert!(matches!(
            date_from_days(i32::MAX, DateZone::Utc),
            Err(IngestError::DateOutOfRange(_))
        ));
    }

    #[test]
    fn raw_fill_rejects_bad_sizes_without_writing() {
        let mut col = column(DType::Int32, 4);
        let bytes = [1u8, 0, 0, 0, 2, 0, 0, 0];

        assert!(matches!(
            fill_column_raw(&mut col, &bytes, None, 0, 2, 8),
            Err(IngestError::SizeMismatch {
                what: "element size",
                ..
            })
        ));
        assert!(matches!(
            fill_column_raw(&mut col, &bytes, None, 0, 3, 4),
            Err(IngestError::SizeMismatch {
                what: "buffer bytes",
                ..
            })
        ));
        assert!(matches!(
            fill_column_raw(&mut col, &bytes, None, 3, 2, 4),
            Err(IngestError::IndexOutOfRange { start: 3, len: 2, size: 4 })
        ));
        assert_eq!(col.null_count(), 4);

        fill_column_raw(&mut col, &bytes, None, 2, 2, 4).unwrap();
        assert_eq!(col.get(2), Some(Scalar::Int32(1)));
        assert_eq!(col.get(3), Some(Scalar::Int32(2)));
    }

    #[test]
    fn raw_fill_of_string_column_is_rejected() {
        let mut col = column(DType::Str, 1);
        assert!(matches!(
            fill_column_raw(&mut col, &[0], None, 0, 1, 1),
            Err(IngestError::NotFixedWidth(DType::Str))
        ));
    }

    #[test]
    fn slice_fill_checks_dtype() {
        let mut col = column(DType::Float64, 2);
        let err = fill_column_slice(&mut col, ColumnSlice::Float32(&[1.0, 2.0]), None, 0)
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::DTypeMismatch {
                expected: DType::Float64,
                actual: DType::Float32,
                ..
            }
        ));
    }

    #[test]
    fn offsets_are_validated() {
        let mut col = column(DType::Str, 1);
        assert!(matches!(
            fill_column_dict(&mut col, b"ab", &[0, 3], &[0], None, 0, 1),
            Err(IngestError::InvalidOffsets(_))
        ));
        assert!(matches!(
            fill_column_dict(&mut col, b"ab", &[2, 1], &[0], None, 0, 1),
            Err(IngestError::InvalidOffsets(_))
        ));
        assert!(matches!(
            fill_column_dict(&mut col, &[0xff], &[0, 1], &[0], None, 0, 1),
            Err(IngestError::InvalidUtf8 { index: 0 })
        ));
        assert!(matches!(
            fill_column_dict(&mut col, b"", &[], &[0], None, 0, 1),
            Err(IngestError::InvalidOffsets(_))
        ));
        assert_eq!(col.vocab().map(|v| v.len()), Some(0));
    }
}
