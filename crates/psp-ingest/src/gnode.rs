//! Processing node: materializes committed batches into a table's visible state.
//!
//! Batches are queued per input port by [`ProcessingNode::send`] and only become visible
//! when [`ProcessingNode::process`] drains that port. Rows are identified by their
//! `psp_pkey` cell: inserting an existing key updates the row in place, deleting a key
//! removes the row.

#![forbid(unsafe_code)]

use crate::data_table::DataTable;
use crate::error::IngestError;
use crate::schema::Schema;
use crate::table::PSP_PKEY;
use crate::types::Scalar;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("unknown input port {0}")]
    UnknownPort(usize),

    #[error("batch has no `psp_pkey` column")]
    MissingPrimaryKey,

    #[error("null primary key at batch row {row}")]
    NullPrimaryKey { row: usize },

    #[error(transparent)]
    Storage(Box<IngestError>),
}

/// Kind of change carried by a [`Batch`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    /// Upsert rows by primary key.
    #[default]
    Insert,
    /// Remove rows by primary key; other columns are ignored.
    Delete,
}

#[derive(Clone, Debug)]
pub struct Batch {
    pub op: Op,
    pub data: DataTable,
}

pub trait ProcessingNode: fmt::Debug + Send {
    /// Open a new input port and return its index. Port 0 always exists.
    fn make_input_port(&mut self) -> usize;

    /// Queue `batch` on `port` without making it visible.
    fn send(&mut self, port: usize, batch: Batch) -> Result<(), ProcessError>;

    /// Apply every batch queued on `port`; returns whether any row changed.
    fn process(&mut self, port: usize) -> Result<bool, ProcessError>;

    /// Materialized state.
    fn table(&self) -> &DataTable;
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum RowKey {
    Int(i128),
    Float(u64),
    Bool(bool),
    Date(NaiveDate),
    Str(Arc<str>),
}

impl From<Scalar> for RowKey {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Int64(v) | Scalar::Time(v) => RowKey::Int(i128::from(v)),
            Scalar::Int32(v) => RowKey::Int(i128::from(v)),
            Scalar::Int16(v) => RowKey::Int(i128::from(v)),
            Scalar::Int8(v) => RowKey::Int(i128::from(v)),
            Scalar::UInt64(v) => RowKey::Int(i128::from(v)),
            Scalar::UInt32(v) => RowKey::Int(i128::from(v)),
            Scalar::UInt16(v) => RowKey::Int(i128::from(v)),
            Scalar::UInt8(v) => RowKey::Int(i128::from(v)),
            Scalar::Float64(v) => RowKey::Float(v.to_bits()),
            Scalar::Float32(v) => RowKey::Float(f64::from(v).to_bits()),
            Scalar::Bool(v) => RowKey::Bool(v),
            Scalar::Date(v) => RowKey::Date(v),
            Scalar::Str(v) => RowKey::Str(v),
        }
    }
}

fn storage(err: IngestError) -> ProcessError {
    ProcessError::Storage(Box::new(err))
}

/// In-memory keyed processing node.
#[derive(Debug)]
pub struct GNode {
    state: DataTable,
    keys: HashMap<RowKey, usize>,
    ports: Vec<VecDeque<Batch>>,
}

impl GNode {
    /// `schema` must contain the primary key column.
    pub fn new(schema: Schema) -> Result<Self, IngestError> {
        if !schema.has_column(PSP_PKEY) {
            return Err(IngestError::SchemaMismatch(format!(
                "processing node schema has no `{PSP_PKEY}` column"
            )));
        }
        Ok(Self {
            state: DataTable::new(schema, 0)?,
            keys: HashMap::new(),
            ports: vec![VecDeque::new()],
        })
    }

    pub fn num_ports(&self) -> usize {
        self.ports.len()
    }

    /// Number of batches waiting on `port`.
    pub fn pending(&self, port: usize) -> usize {
        self.ports.get(port).map(VecDeque::len).unwrap_or(0)
    }

    /// Apply one batch. Keys and column dtypes are checked before the state is touched.
    fn apply(&mut self, batch: &Batch) -> Result<bool, ProcessError> {
        let data = &batch.data;
        let pkey = data
            .get_column(PSP_PKEY)
            .ok_or(ProcessError::MissingPrimaryKey)?;
        let keys = (0..data.num_rows())
            .map(|row| {
                pkey.get(row)
                    .map(RowKey::from)
                    .ok_or(ProcessError::NullPrimaryKey { row })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if batch.op == Op::Insert {
            for column in self.state.columns() {
                if let Some(src) = data.get_column(column.name()) {
                    if src.dtype() != column.dtype() {
                        return Err(storage(IngestError::DTypeMismatch {
                            column: column.name().to_owned(),
                            expected: column.dtype(),
                            actual: src.dtype(),
                        }));
                    }
                }
            }
        }

        let mut changed = false;
        for (row, key) in keys.into_iter().enumerate() {
            match batch.op {
                Op::Insert => {
                    let target = match self.keys.get(&key) {
                        Some(target) => *target,
                        None => {
                            let target = self.state.num_rows();
                            self.state.extend(target + 1);
                            self.keys.insert(key, target);
                            target
                        }
                    };
                    for column in self.state.columns_mut() {
                        if let Some(src) = data.get_column(column.name()) {
                            column.copy_cell_from(target, src, row).map_err(storage)?;
                        }
                    }
                    changed = true;
                }
                Op::Delete => {
                    if let Some(target) = self.keys.remove(&key) {
                        self.remove_row(target);
                        changed = true;
                    }
                }
            }
        }
        Ok(changed)
    }

    fn remove_row(&mut self, row: usize) {
        self.state.swap_remove_row(row);
        if row < self.state.num_rows() {
            let moved = self
                .state
                .get_column(PSP_PKEY)
                .and_then(|pkey| pkey.get(row));
            if let Some(moved) = moved {
                self.keys.insert(RowKey::from(moved), row);
            }
        }
    }
}

impl ProcessingNode for GNode {
    fn make_input_port(&mut self) -> usize {
        self.ports.push(VecDeque::new());
        self.ports.len() - 1
    }

    fn send(&mut self, port: usize, batch: Batch) -> Result<(), ProcessError> {
        let queue = self
            .ports
            .get_mut(port)
            .ok_or(ProcessError::UnknownPort(port))?;
        queue.push_back(batch);
        Ok(())
    }

    /// A failing batch is discarded; batches queued behind it stay pending.
    fn process(&mut self, port: usize) -> Result<bool, ProcessError> {
        if port >= self.ports.len() {
            return Err(ProcessError::UnknownPort(port));
        }

        let mut changed = false;
        let mut applied = 0usize;
        while let Some(batch) = self.ports[port].pop_front() {
            match self.apply(&batch) {
                Ok(batch_changed) => changed |= batch_changed,
                Err(err) => {
                    log::warn!(
                        "dropped batch on port {port} after {applied} applied: {err}; {} still queued",
                        self.ports[port].len()
                    );
                    return Err(err);
                }
            }
            applied += 1;
        }
        log::debug!(
            "processed {applied} batches on port {port}: changed={changed}, rows={}",
            self.state.num_rows()
        );
        Ok(changed)
    }

    fn table(&self) -> &DataTable {
        &self.state
    }
}
