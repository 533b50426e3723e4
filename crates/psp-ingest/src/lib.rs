//! Bulk columnar ingestion for keyed analytics tables.
//!
//! This crate focuses on:
//! - Filling typed column storage from producer buffers (raw little-endian bytes, typed slices,
//!   epoch day counts, timestamps, dictionary blobs) with LSB-first null bitmaps.
//! - Assembling filled columns into a [`Table`], deriving the `psp_pkey`/`psp_okey` key columns
//!   when the producer did not supply them.
//! - Triggering the table's [`ProcessingNode`] so committed rows become visible.
//!
//! All mutation is single-writer: fillers take `&mut Column`, and a [`Table`] serializes access
//! to its processing node.

#![forbid(unsafe_code)]

#[cfg(feature = "arrow")]
pub mod arrow;

mod assembly;
mod bitmap;
mod column;
mod data_table;
mod error;
mod fill;
mod gnode;
mod options;
mod schema;
mod table;
mod types;
mod vocab;

pub use crate::assembly::{
    build_data_table, build_schema, build_table, build_table_from_data_table, extend_data_table,
    trigger_processing,
};
pub use crate::bitmap::{encode_null_mask, BitVec, NullMask};
pub use crate::column::Column;
pub use crate::data_table::DataTable;
pub use crate::error::{IngestError, IngestResult};
pub use crate::fill::{
    date_from_days, days_from_date, fill_column_date, fill_column_date_with, fill_column_dict,
    fill_column_dict_with, fill_column_raw, fill_column_slice, fill_column_str, fill_column_time,
    ColumnSlice,
};
pub use crate::gnode::{Batch, GNode, Op, ProcessError, ProcessingNode};
pub use crate::options::{DateZone, IngestOptions};
pub use crate::schema::Schema;
pub use crate::table::{SharedNode, Table, PSP_OKEY, PSP_PKEY};
pub use crate::types::{
    dtypes_from_tags, from_storage_type, size_of, to_storage_type, DType, Scalar, StorageType,
};
pub use crate::vocab::Vocabulary;
