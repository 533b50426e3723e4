#![forbid(unsafe_code)]

use crate::column::Column;
use crate::data_table::DataTable;
use crate::error::{IngestError, IngestResult};
use crate::fill::{fill_column_slice, ColumnSlice};
use crate::gnode::{Batch, GNode, Op, ProcessingNode};
use crate::schema::Schema;
use crate::types::{DType, Scalar};
use std::sync::{Arc, Mutex, MutexGuard};

/// Row identity column.
pub const PSP_PKEY: &str = "psp_pkey";
/// Row ordering column.
pub const PSP_OKEY: &str = "psp_okey";

pub type SharedNode = Arc<Mutex<dyn ProcessingNode>>;

fn is_key_column(name: &str) -> bool {
    name == PSP_PKEY || name == PSP_OKEY
}

/// A keyed table whose visible rows are owned by its processing node.
///
/// Committed batches stay queued until the port they were sent to is processed.
#[derive(Debug)]
pub struct Table {
    schema: Schema,
    limit: u32,
    index: Option<String>,
    /// Rows committed so far; drives key synthesis for non-indexed tables.
    offset: Mutex<usize>,
    gnode: SharedNode,
}

impl Table {
    /// Create a table backed by an in-memory [`GNode`].
    ///
    /// Key columns missing from `schema` are appended: `psp_pkey` takes the index column's
    /// dtype for indexed tables and `Int64` otherwise, and `psp_okey` matches it. An empty
    /// `index` means the table is not indexed. A `limit` of 0 means unlimited.
    pub fn new(schema: Schema, limit: u32, index: &str) -> IngestResult<Self> {
        let schema = Self::keyed_schema(schema, index)?;
        let node = GNode::new(schema.clone())?;
        Ok(Self::assemble(schema, limit, index, Arc::new(Mutex::new(node))))
    }

    /// Create a table driven by a caller-supplied processing node.
    pub fn with_processing_node(
        schema: Schema,
        limit: u32,
        index: &str,
        node: SharedNode,
    ) -> IngestResult<Self> {
        let schema = Self::keyed_schema(schema, index)?;
        Ok(Self::assemble(schema, limit, index, node))
    }

    fn keyed_schema(mut schema: Schema, index: &str) -> IngestResult<Schema> {
        let key_dtype = if index.is_empty() {
            DType::Int64
        } else {
            schema
                .dtype(index)
                .ok_or_else(|| IngestError::UnknownColumn(index.to_owned()))?
        };
        for key in [PSP_PKEY, PSP_OKEY] {
            match schema.dtype(key) {
                None => schema.add_column(key, key_dtype)?,
                // Indexed batches are re-keyed from the index column.
                Some(_) if !index.is_empty() => schema.retype(key, key_dtype)?,
                Some(_) => {}
            }
        }
        Ok(schema)
    }

    fn assemble(schema: Schema, limit: u32, index: &str, gnode: SharedNode) -> Self {
        log::debug!(
            "created table with columns {:?}, limit {limit}, index {index:?}",
            schema.columns()
        );
        Self {
            schema,
            limit,
            index: (!index.is_empty()).then(|| index.to_owned()),
            offset: Mutex::new(0),
            gnode,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn columns(&self) -> Vec<String> {
        self.schema.columns().to_vec()
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn index(&self) -> Option<&str> {
        self.index.as_deref()
    }

    pub fn gnode(&self) -> SharedNode {
        Arc::clone(&self.gnode)
    }

    fn node(&self) -> MutexGuard<'_, dyn ProcessingNode + 'static> {
        match self.gnode.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn make_port(&self) -> usize {
        self.node().make_input_port()
    }

    /// Number of materialized rows.
    pub fn size(&self) -> usize {
        self.node().table().num_rows()
    }

    /// Snapshot of a materialized column.
    pub fn get_column(&self, name: &str) -> Option<Column> {
        self.node().table().get_column(name).cloned()
    }

    pub fn get_value(&self, row: usize, name: &str) -> Option<Scalar> {
        self.node().table().get_column(name)?.get(row)
    }

    pub fn pretty_print(&self, num_rows: usize) -> String {
        self.node().table().pretty_print(num_rows)
    }

    /// Commit the first batch on port 0.
    pub fn init(&self, data_table: DataTable, op: Op) -> IngestResult<()> {
        self.update(data_table, 0, op)
    }

    /// Queue a batch on `port`. Nothing becomes visible until the port is processed.
    pub fn update(&self, mut data: DataTable, port: usize, op: Op) -> IngestResult<()> {
        self.check_batch_schema(&data)?;
        self.derive_keys(&mut data)?;

        let rows = data.num_rows();
        let pkey_dtype = data.schema().dtype(PSP_PKEY);
        if pkey_dtype != self.schema.dtype(PSP_PKEY) {
            return Err(IngestError::SchemaMismatch(format!(
                "batch `{PSP_PKEY}` has dtype {pkey_dtype:?}, table expects {:?}",
                self.schema.dtype(PSP_PKEY)
            )));
        }

        self.node().send(port, Batch { op, data })?;
        let mut offset = match self.offset.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *offset += rows;
        log::debug!("committed {rows} rows ({op:?}) on port {port}");
        Ok(())
    }

    /// Materialize pending batches on `port`.
    pub fn process(&self, port: usize) -> IngestResult<bool> {
        Ok(self.node().process(port)?)
    }

    fn check_batch_schema(&self, data: &DataTable) -> IngestResult<()> {
        for (name, dtype) in data.schema().iter() {
            if is_key_column(name) {
                continue;
            }
            match self.schema.dtype(name) {
                Some(expected) if expected == dtype => {}
                Some(expected) => {
                    return Err(IngestError::SchemaMismatch(format!(
                        "column `{name}` is {dtype} in the batch but {expected} in the table"
                    )))
                }
                None => {
                    return Err(IngestError::SchemaMismatch(format!(
                        "column `{name}` is not part of the table"
                    )))
                }
            }
        }
        Ok(())
    }

    fn derive_keys(&self, data: &mut DataTable) -> IngestResult<()> {
        if let Some(index) = &self.index {
            if !data.schema().has_column(index) {
                return Err(IngestError::SchemaMismatch(format!(
                    "batch for indexed table is missing index column `{index}`"
                )));
            }
            data.replace_with_clone(index, PSP_PKEY)?;
            data.replace_with_clone(index, PSP_OKEY)?;
            return Ok(());
        }

        if !data.schema().has_column(PSP_PKEY) {
            let offset = match self.offset.lock() {
                Ok(guard) => *guard,
                Err(poisoned) => *poisoned.into_inner(),
            };
            let limit = if self.limit == 0 {
                u64::MAX
            } else {
                u64::from(self.limit)
            };
            let keys: Vec<i64> = (0..data.num_rows())
                .map(|row| ((offset + row) as u64 % limit) as i64)
                .collect();
            let pkey = data.add_column(PSP_PKEY, DType::Int64)?;
            fill_column_slice(pkey, ColumnSlice::Int64(&keys), None, 0)?;
            log::debug!("synthesized {} primary keys from offset {offset}", keys.len());
        }
        if !data.schema().has_column(PSP_OKEY) {
            data.clone_column(PSP_PKEY, PSP_OKEY)?;
        }
        Ok(())
    }
}
