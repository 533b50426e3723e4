#![forbid(unsafe_code)]

use crate::error::{IngestError, IngestResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// External dtype tag, as exchanged with data producers.
///
/// The discriminants are part of the wire format: producers send the `u8`
/// tag and [`DType::try_from`] parses it back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DType {
    None = 0,
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
    Date,
    Enum,
    Oid,
    Object,
    F64Pair,
    UserFixed,
    Str,
    UserVlen,
    LastVlen,
    Last,
}

impl DType {
    /// Every variant, in tag order.
    pub const ALL: [DType; 23] = [
        DType::None,
        DType::Int64,
        DType::Int32,
        DType::Int16,
        DType::Int8,
        DType::UInt64,
        DType::UInt32,
        DType::UInt16,
        DType::UInt8,
        DType::Float64,
        DType::Float32,
        DType::Bool,
        DType::Time,
        DType::Date,
        DType::Enum,
        DType::Oid,
        DType::Object,
        DType::F64Pair,
        DType::UserFixed,
        DType::Str,
        DType::UserVlen,
        DType::LastVlen,
        DType::Last,
    ];

    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn is_fixed_width(self) -> bool {
        size_of(self).is_some()
    }

    pub fn is_vlen(self) -> bool {
        matches!(self, DType::Str | DType::UserVlen)
    }

    /// Whether a column of this dtype can be allocated by [`crate::Column`].
    pub fn is_storable(self) -> bool {
        to_storage_type(self).is_storable()
    }

    pub fn name(self) -> &'static str {
        match self {
            DType::None => "none",
            DType::Int64 => "int64",
            DType::Int32 => "int32",
            DType::Int16 => "int16",
            DType::Int8 => "int8",
            DType::UInt64 => "uint64",
            DType::UInt32 => "uint32",
            DType::UInt16 => "uint16",
            DType::UInt8 => "uint8",
            DType::Float64 => "float64",
            DType::Float32 => "float32",
            DType::Bool => "bool",
            DType::Time => "time",
            DType::Date => "date",
            DType::Enum => "enum",
            DType::Oid => "oid",
            DType::Object => "object",
            DType::F64Pair => "f64pair",
            DType::UserFixed => "user_fixed",
            DType::Str => "str",
            DType::UserVlen => "user_vlen",
            DType::LastVlen => "last_vlen",
            DType::Last => "last",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for DType {
    type Error = IngestError;

    fn try_from(tag: u8) -> IngestResult<Self> {
        DType::ALL
            .get(tag as usize)
            .copied()
            .ok_or(IngestError::UnknownDType(tag))
    }
}

/// Parse a list of wire tags.
pub fn dtypes_from_tags(tags: &[u8]) -> IngestResult<Vec<DType>> {
    tags.iter().map(|tag| DType::try_from(*tag)).collect()
}

/// Physical representation used by column storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StorageType {
    Empty,
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
    Date,
    Enum,
    Oid,
    Object,
    F64Pair,
    UserFixed,
    Dictionary,
    UserVlen,
    VlenMarker,
    EndMarker,
}

impl StorageType {
    pub fn is_storable(self) -> bool {
        matches!(
            self,
            StorageType::Int64
                | StorageType::Int32
                | StorageType::Int16
                | StorageType::Int8
                | StorageType::UInt64
                | StorageType::UInt32
                | StorageType::UInt16
                | StorageType::UInt8
                | StorageType::Float64
                | StorageType::Float32
                | StorageType::Bool
                | StorageType::Time
                | StorageType::Date
                | StorageType::Dictionary
        )
    }
}

/// Map an external dtype onto its storage representation.
///
/// Both directions are exhaustive matches, so adding a variant to either enum
/// without a mapping is a compile error.
pub fn to_storage_type(dtype: DType) -> StorageType {
    match dtype {
        DType::None => StorageType::Empty,
        DType::Int64 => StorageType::Int64,
        DType::Int32 => StorageType::Int32,
        DType::Int16 => StorageType::Int16,
        DType::Int8 => StorageType::Int8,
        DType::UInt64 => StorageType::UInt64,
        DType::UInt32 => StorageType::UInt32,
        DType::UInt16 => StorageType::UInt16,
        DType::UInt8 => StorageType::UInt8,
        DType::Float64 => StorageType::Float64,
        DType::Float32 => StorageType::Float32,
        DType::Bool => StorageType::Bool,
        DType::Time => StorageType::Time,
        DType::Date => StorageType::Date,
        DType::Enum => StorageType::Enum,
        DType::Oid => StorageType::Oid,
        DType::Object => StorageType::Object,
        DType::F64Pair => StorageType::F64Pair,
        DType::UserFixed => StorageType::UserFixed,
        DType::Str => StorageType::Dictionary,
        DType::UserVlen => StorageType::UserVlen,
        DType::LastVlen => StorageType::VlenMarker,
        DType::Last => StorageType::EndMarker,
    }
}

pub fn from_storage_type(storage: StorageType) -> DType {
    match storage {
        StorageType::Empty => DType::None,
        StorageType::Int64 => DType::Int64,
        StorageType::Int32 => DType::Int32,
        StorageType::Int16 => DType::Int16,
        StorageType::Int8 => DType::Int8,
        StorageType::UInt64 => DType::UInt64,
        StorageType::UInt32 => DType::UInt32,
        StorageType::UInt16 => DType::UInt16,
        StorageType::UInt8 => DType::UInt8,
        StorageType::Float64 => DType::Float64,
        StorageType::Float32 => DType::Float32,
        StorageType::Bool => DType::Bool,
        StorageType::Time => DType::Time,
        StorageType::Date => DType::Date,
        StorageType::Enum => DType::Enum,
        StorageType::Oid => DType::Oid,
        StorageType::Object => DType::Object,
        StorageType::F64Pair => DType::F64Pair,
        StorageType::UserFixed => DType::UserFixed,
        StorageType::Dictionary => DType::Str,
        StorageType::UserVlen => DType::UserVlen,
        StorageType::VlenMarker => DType::LastVlen,
        StorageType::EndMarker => DType::Last,
    }
}

/// Element width in bytes on the wire, or `None` for variable-width and
/// non-storable dtypes.
///
/// Dates travel as `i32` day counts and times as `i64`, so their widths are
/// those of the wire encoding.
pub fn size_of(dtype: DType) -> Option<usize> {
    match dtype {
        DType::Int64 | DType::UInt64 | DType::Float64 | DType::Time => Some(8),
        DType::Int32 | DType::UInt32 | DType::Float32 | DType::Date => Some(4),
        DType::Int16 | DType::UInt16 => Some(2),
        DType::Int8 | DType::UInt8 | DType::Bool => Some(1),
        DType::None
        | DType::Enum
        | DType::Oid
        | DType::Object
        | DType::F64Pair
        | DType::UserFixed
        | DType::Str
        | DType::UserVlen
        | DType::LastVlen
        | DType::Last => None,
    }
}

/// A single typed cell value.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Int64(i64),
    Int32(i32),
    Int16(i16),
    Int8(i8),
    UInt64(u64),
    UInt32(u32),
    UInt16(u16),
    UInt8(u8),
    Float64(f64),
    Float32(f32),
    Bool(bool),
    Date(NaiveDate),
    /// Sub-day timestamp, stored verbatim.
    Time(i64),
    Str(Arc<str>),
}

impl Scalar {
    pub fn dtype(&self) -> DType {
        match self {
            Scalar::Int64(_) => DType::Int64,
            Scalar::Int32(_) => DType::Int32,
            Scalar::Int16(_) => DType::Int16,
            Scalar::Int8(_) => DType::Int8,
            Scalar::UInt64(_) => DType::UInt64,
            Scalar::UInt32(_) => DType::UInt32,
            Scalar::UInt16(_) => DType::UInt16,
            Scalar::UInt8(_) => DType::UInt8,
            Scalar::Float64(_) => DType::Float64,
            Scalar::Float32(_) => DType::Float32,
            Scalar::Bool(_) => DType::Bool,
            Scalar::Date(_) => DType::Date,
            Scalar::Time(_) => DType::Time,
            Scalar::Str(_) => DType::Str,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int64(v) | Scalar::Time(v) => write!(f, "{v}"),
            Scalar::Int32(v) => write!(f, "{v}"),
            Scalar::Int16(v) => write!(f, "{v}"),
            Scalar::Int8(v) => write!(f, "{v}"),
            Scalar::UInt64(v) => write!(f, "{v}"),
            Scalar::UInt32(v) => write!(f, "{v}"),
            Scalar::UInt16(v) => write!(f, "{v}"),
            Scalar::UInt8(v) => write!(f, "{v}"),
            Scalar::Float64(v) => write!(f, "{v}"),
            Scalar::Float32(v) => write!(f, "{v}"),
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::Date(v) => write!(f, "{v}"),
            Scalar::Str(v) => f.write_str(v),
        }
    }
}
