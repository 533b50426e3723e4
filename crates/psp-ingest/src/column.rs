#![forbid(unsafe_code)]

use crate::bitmap::BitVec;
use crate::error::{IngestError, IngestResult};
use crate::types::{DType, Scalar};
use crate::vocab::Vocabulary;
use chrono::NaiveDate;

#[derive(Clone, Debug)]
pub(crate) enum ColumnData {
    Int64(Vec<i64>),
    Int32(Vec<i32>),
    Int16(Vec<i16>),
    Int8(Vec<i8>),
    UInt64(Vec<u64>),
    UInt32(Vec<u32>),
    UInt16(Vec<u16>),
    UInt8(Vec<u8>),
    Float64(Vec<f64>),
    Float32(Vec<f32>),
    Bool(Vec<bool>),
    Date(Vec<NaiveDate>),
    Time(Vec<i64>),
    Dict { codes: Vec<u32>, vocab: Vocabulary },
}

/// Run `$body` with `$v` bound to the backing `Vec` of any variant
/// (dictionary columns expose their code vector).
macro_rules! with_values {
    ($data:expr, |$v:ident| $body:expr) => {
        match $data {
            ColumnData::Int64($v) => $body,
            ColumnData::Int32($v) => $body,
            ColumnData::Int16($v) => $body,
            ColumnData::Int8($v) => $body,
            ColumnData::UInt64($v) => $body,
            ColumnData::UInt32($v) => $body,
            ColumnData::UInt16($v) => $body,
            ColumnData::UInt8($v) => $body,
            ColumnData::Float64($v) => $body,
            ColumnData::Float32($v) => $body,
            ColumnData::Bool($v) => $body,
            ColumnData::Date($v) => $body,
            ColumnData::Time($v) => $body,
            ColumnData::Dict { codes: $v, .. } => $body,
        }
    };
}

impl ColumnData {
    fn empty(dtype: DType, capacity: usize) -> IngestResult<Self> {
        Ok(match dtype {
            DType::Int64 => ColumnData::Int64(Vec::with_capacity(capacity)),
            DType::Int32 => ColumnData::Int32(Vec::with_capacity(capacity)),
            DType::Int16 => ColumnData::Int16(Vec::with_capacity(capacity)),
            DType::Int8 => ColumnData::Int8(Vec::with_capacity(capacity)),
            DType::UInt64 => ColumnData::UInt64(Vec::with_capacity(capacity)),
            DType::UInt32 => ColumnData::UInt32(Vec::with_capacity(capacity)),
            DType::UInt16 => ColumnData::UInt16(Vec::with_capacity(capacity)),
            DType::UInt8 => ColumnData::UInt8(Vec::with_capacity(capacity)),
            DType::Float64 => ColumnData::Float64(Vec::with_capacity(capacity)),
            DType::Float32 => ColumnData::Float32(Vec::with_capacity(capacity)),
            DType::Bool => ColumnData::Bool(Vec::with_capacity(capacity)),
            DType::Date => ColumnData::Date(Vec::with_capacity(capacity)),
            DType::Time => ColumnData::Time(Vec::with_capacity(capacity)),
            DType::Str => ColumnData::Dict {
                codes: Vec::with_capacity(capacity),
                vocab: Vocabulary::new(),
            },
            other => return Err(IngestError::UnsupportedDType(other)),
        })
    }

    fn len(&self) -> usize {
        with_values!(self, |v| v.len())
    }
}

/// A typed, fixed-length column with per-cell validity.
///
/// Cells added by [`Column::extend`] start out invalid; a cell only becomes
/// valid when a value is written to it.
#[derive(Clone, Debug)]
pub struct Column {
    name: String,
    dtype: DType,
    data: ColumnData,
    validity: BitVec,
}

impl Column {
    /// Allocate an empty column with room for `capacity` rows.
    pub fn new(name: impl Into<String>, dtype: DType, capacity: usize) -> IngestResult<Self> {
        Ok(Self {
            name: name.into(),
            dtype,
            data: ColumnData::empty(dtype, capacity)?,
            validity: BitVec::with_capacity_bits(capacity),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn len(&self) -> usize {
        self.validity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_valid(&self, row: usize) -> bool {
        row < self.len() && self.validity.get(row)
    }

    pub fn null_count(&self) -> usize {
        self.len() - self.validity.count_ones()
    }

    pub fn validity(&self) -> &BitVec {
        &self.validity
    }

    /// Dictionary backing a `Str` column.
    pub fn vocab(&self) -> Option<&Vocabulary> {
        match &self.data {
            ColumnData::Dict { vocab, .. } => Some(vocab),
            _ => None,
        }
    }

    /// Raw dictionary code stored at `row`, regardless of validity.
    pub fn code(&self, row: usize) -> Option<u32> {
        match &self.data {
            ColumnData::Dict { codes, .. } => codes.get(row).copied(),
            _ => None,
        }
    }

    /// Read a cell. Invalid and out-of-range cells read as `None`.
    pub fn get(&self, row: usize) -> Option<Scalar> {
        if !self.is_valid(row) {
            return None;
        }
        let value = match &self.data {
            ColumnData::Int64(v) => Scalar::Int64(v[row]),
            ColumnData::Int32(v) => Scalar::Int32(v[row]),
            ColumnData::Int16(v) => Scalar::Int16(v[row]),
            ColumnData::Int8(v) => Scalar::Int8(v[row]),
            ColumnData::UInt64(v) => Scalar::UInt64(v[row]),
            ColumnData::UInt32(v) => Scalar::UInt32(v[row]),
            ColumnData::UInt16(v) => Scalar::UInt16(v[row]),
            ColumnData::UInt8(v) => Scalar::UInt8(v[row]),
            ColumnData::Float64(v) => Scalar::Float64(v[row]),
            ColumnData::Float32(v) => Scalar::Float32(v[row]),
            ColumnData::Bool(v) => Scalar::Bool(v[row]),
            ColumnData::Date(v) => Scalar::Date(v[row]),
            ColumnData::Time(v) => Scalar::Time(v[row]),
            ColumnData::Dict { codes, vocab } => Scalar::Str(vocab.unintern(codes[row])?.clone()),
        };
        Some(value)
    }

    /// Write a valid cell. String values are interned into the column vocabulary.
    pub fn set(&mut self, row: usize, value: Scalar) -> IngestResult<()> {
        self.check_range(row, 1)?;
        let actual = value.dtype();
        match (&mut self.data, value) {
            (ColumnData::Int64(v), Scalar::Int64(x)) => v[row] = x,
            (ColumnData::Int32(v), Scalar::Int32(x)) => v[row] = x,
            (ColumnData::Int16(v), Scalar::Int16(x)) => v[row] = x,
            (ColumnData::Int8(v), Scalar::Int8(x)) => v[row] = x,
            (ColumnData::UInt64(v), Scalar::UInt64(x)) => v[row] = x,
            (ColumnData::UInt32(v), Scalar::UInt32(x)) => v[row] = x,
            (ColumnData::UInt16(v), Scalar::UInt16(x)) => v[row] = x,
            (ColumnData::UInt8(v), Scalar::UInt8(x)) => v[row] = x,
            (ColumnData::Float64(v), Scalar::Float64(x)) => v[row] = x,
            (ColumnData::Float32(v), Scalar::Float32(x)) => v[row] = x,
            (ColumnData::Bool(v), Scalar::Bool(x)) => v[row] = x,
            (ColumnData::Date(v), Scalar::Date(x)) => v[row] = x,
            (ColumnData::Time(v), Scalar::Time(x)) => v[row] = x,
            (ColumnData::Dict { codes, vocab }, Scalar::Str(x)) => codes[row] = vocab.intern(&x),
            _ => {
                return Err(IngestError::DTypeMismatch {
                    column: self.name.clone(),
                    expected: self.dtype,
                    actual,
                })
            }
        }
        self.validity.set(row, true);
        Ok(())
    }

    pub fn set_null(&mut self, row: usize) -> IngestResult<()> {
        self.check_range(row, 1)?;
        self.validity.set(row, false);
        Ok(())
    }

    /// Copy one cell (value and validity) from `src`, re-interning strings
    /// into this column's vocabulary.
    pub fn copy_cell_from(&mut self, row: usize, src: &Column, src_row: usize) -> IngestResult<()> {
        match src.get(src_row) {
            Some(value) => self.set(row, value),
            None => self.set_null(row),
        }
    }

    pub(crate) fn check_range(&self, start: usize, len: usize) -> IngestResult<()> {
        match start.checked_add(len) {
            Some(end) if end <= self.len() => Ok(()),
            _ => Err(IngestError::IndexOutOfRange {
                start,
                len,
                size: self.len(),
            }),
        }
    }

    pub(crate) fn expect_dtype(&self, dtype: DType) -> IngestResult<()> {
        if self.dtype == dtype {
            Ok(())
        } else {
            Err(IngestError::DTypeMismatch {
                column: self.name.clone(),
                expected: self.dtype,
                actual: dtype,
            })
        }
    }

    /// Grow to `rows` cells; new cells are invalid. Never shrinks.
    pub(crate) fn extend(&mut self, rows: usize) {
        if rows <= self.len() {
            return;
        }
        with_values!(&mut self.data, |v| v.resize(rows, Default::default()));
        self.validity.grow(rows);
        debug_assert_eq!(self.data.len(), self.validity.len());
    }

    /// Remove `row` by moving the last cell into its place.
    pub(crate) fn swap_remove(&mut self, row: usize) {
        let last = self.len() - 1;
        let last_valid = self.validity.get(last);
        with_values!(&mut self.data, |v| {
            v.swap_remove(row);
        });
        if row != last {
            self.validity.set(row, last_valid);
        }
        self.validity.truncate(last);
    }

    pub(crate) fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    pub(crate) fn data_mut(&mut self) -> &mut ColumnData {
        &mut self.data
    }

    pub(crate) fn set_valid(&mut self, row: usize, valid: bool) {
        self.validity.set(row, valid);
    }

    pub(crate) fn set_valid_range(&mut self, start: usize, len: usize, valid: bool) {
        self.validity.set_range(start, len, valid);
    }

    /// Code vector and vocabulary of a `Str` column.
    pub(crate) fn dict_parts_mut(&mut self) -> IngestResult<(&mut Vec<u32>, &mut Vocabulary)> {
        match &mut self.data {
            ColumnData::Dict { codes, vocab } => Ok((codes, vocab)),
            _ => Err(IngestError::DTypeMismatch {
                column: self.name.clone(),
                expected: self.dtype,
                actual: DType::Str,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn extended_cells_start_invalid() {
        let mut col = Column::new("x", DType::Float64, 4).unwrap();
        col.extend(4);
        assert_eq!(col.len(), 4);
        assert_eq!(col.null_count(), 4);
        assert_eq!(col.get(0), None);

        col.set(2, Scalar::Float64(1.5)).unwrap();
        assert_eq!(col.get(2), Some(Scalar::Float64(1.5)));
        assert_eq!(col.null_count(), 3);
    }

    #[test]
    fn set_rejects_wrong_type_and_range() {
        let mut col = Column::new("x", DType::Int32, 2).unwrap();
        col.extend(2);
        assert!(matches!(
            col.set(0, Scalar::Int64(1)),
            Err(IngestError::DTypeMismatch { .. })
        ));
        assert!(matches!(
            col.set(2, Scalar::Int32(1)),
            Err(IngestError::IndexOutOfRange { start: 2, .. })
        ));
    }

    #[test]
    fn unsupported_dtypes_are_rejected() {
        assert!(matches!(
            Column::new("x", DType::Object, 0),
            Err(IngestError::UnsupportedDType(DType::Object))
        ));
    }

    #[test]
    fn swap_remove_moves_last_cell() {
        let mut col = Column::new("s", DType::Str, 3).unwrap();
        col.extend(3);
        col.set(0, Scalar::Str(Arc::from("a"))).unwrap();
        col.set(2, Scalar::Str(Arc::from("c"))).unwrap();

        col.swap_remove(0);
        assert_eq!(col.len(), 2);
        assert_eq!(col.get(0), Some(Scalar::Str(Arc::from("c"))));
        assert_eq!(col.get(1), None);
    }

    #[test]
    fn copy_cell_reinterns_strings() {
        let mut src = Column::new("s", DType::Str, 2).unwrap();
        src.extend(2);
        src.set(0, Scalar::Str(Arc::from("x"))).unwrap();
        src.set(1, Scalar::Str(Arc::from("y"))).unwrap();

        let mut dst = Column::new("s", DType::Str, 1).unwrap();
        dst.extend(1);
        dst.copy_cell_from(0, &src, 1).unwrap();
        assert_eq!(dst.code(0), Some(0));
        assert_eq!(dst.get(0), Some(Scalar::Str(Arc::from("y"))));
    }
}
