//! Schema and table assembly: the entry points producers use to turn filled column sets
//! into processed tables.

#![forbid(unsafe_code)]

use crate::data_table::DataTable;
use crate::error::{IngestError, IngestResult};
use crate::fill::{fill_column_slice, ColumnSlice};
use crate::gnode::Op;
use crate::schema::Schema;
use crate::table::{Table, PSP_OKEY, PSP_PKEY};
use crate::types::DType;
use std::sync::Arc;

/// Rows seeded by [`build_table`].
const BOOTSTRAP_ROWS: usize = 3;

pub fn build_schema(names: Vec<String>, dtypes: Vec<DType>) -> IngestResult<Schema> {
    Schema::new(names, dtypes)
}

/// Allocate a column set for `schema` with `capacity` rows; every cell starts invalid.
pub fn build_data_table(schema: &Schema, capacity: usize) -> IngestResult<DataTable> {
    let mut data_table = DataTable::new(schema.clone(), capacity)?;
    data_table.extend(capacity);
    Ok(data_table)
}

pub fn extend_data_table(mut data_table: DataTable, num_rows: usize) -> DataTable {
    data_table.extend(num_rows);
    data_table
}

/// Bootstrap constructor: seeds the first `Int64` column with `[0, 1, 2]`, keys the rows
/// by that column and processes the initial commit.
pub fn build_table(
    names: Vec<String>,
    dtypes: Vec<DType>,
    limit: u32,
    index: &str,
) -> IngestResult<Arc<Table>> {
    let schema = build_schema(names, dtypes)?;
    let seed = schema
        .iter()
        .find(|(name, dtype)| *dtype == DType::Int64 && *name != PSP_PKEY && *name != PSP_OKEY)
        .map(|(name, _)| name.to_owned())
        .ok_or_else(|| {
            IngestError::SchemaMismatch("bootstrap table needs an int64 column".to_owned())
        })?;

    let table = Table::new(schema.clone(), limit, index)?;

    let mut data_table = build_data_table(&schema, BOOTSTRAP_ROWS)?;
    let values: Vec<i64> = (0..BOOTSTRAP_ROWS as i64).collect();
    fill_column_slice(
        data_table.column_mut(&seed)?,
        ColumnSlice::Int64(&values),
        None,
        0,
    )?;
    if !schema.has_column(PSP_PKEY) {
        data_table.clone_column(&seed, PSP_PKEY)?;
    }
    if !schema.has_column(PSP_OKEY) {
        data_table.clone_column(PSP_PKEY, PSP_OKEY)?;
    }

    commit_initial(&table, data_table)?;
    Ok(Arc::new(table))
}

/// General construction path: derive missing key columns, commit every row as an insert
/// on port 0 and process it.
///
/// A missing `psp_pkey` becomes the row numbers `0..n`; a missing `psp_okey` copies
/// `psp_pkey`. The table limit is the incoming row count.
pub fn build_table_from_data_table(
    mut data_table: DataTable,
    index: &str,
) -> IngestResult<Arc<Table>> {
    let rows = data_table.num_rows();
    if !data_table.schema().has_column(PSP_PKEY) {
        let keys: Vec<i64> = (0..rows as i64).collect();
        let pkey = data_table.add_column(PSP_PKEY, DType::Int64)?;
        fill_column_slice(pkey, ColumnSlice::Int64(&keys), None, 0)?;
        log::debug!("synthesized `{PSP_PKEY}` for {rows} rows");
    }
    if !data_table.schema().has_column(PSP_OKEY) {
        data_table.clone_column(PSP_PKEY, PSP_OKEY)?;
    }

    let limit = u32::try_from(rows).unwrap_or(u32::MAX);
    let table = Table::new(data_table.schema().clone(), limit, index)?;
    commit_initial(&table, data_table)?;
    Ok(Arc::new(table))
}

/// Insert the first batch on port 0 and process it once.
fn commit_initial(table: &Table, data_table: DataTable) -> IngestResult<bool> {
    let rows = data_table.num_rows();
    table.init(data_table, Op::Insert)?;
    let changed = trigger_processing(table, 0)?;
    log::debug!("initial commit of {rows} rows processed: changed={changed}");
    Ok(changed)
}

/// Materialize the batches pending on `port`. Returns whether any row changed.
///
/// Must run after every committed batch; until then the batch's rows are invisible.
pub fn trigger_processing(table: &Table, port: usize) -> IngestResult<bool> {
    table.process(port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gnode::{Batch, GNode, ProcessError, ProcessingNode};
    use crate::table::SharedNode;
    use std::sync::Mutex;

    /// Delegates to a [`GNode`] and records every `process` call.
    #[derive(Debug)]
    struct RecordingNode {
        inner: GNode,
        calls: Vec<(usize, bool)>,
    }

    impl ProcessingNode for RecordingNode {
        fn make_input_port(&mut self) -> usize {
            self.inner.make_input_port()
        }

        fn send(&mut self, port: usize, batch: Batch) -> Result<(), ProcessError> {
            self.inner.send(port, batch)
        }

        fn process(&mut self, port: usize) -> Result<bool, ProcessError> {
            let changed = self.inner.process(port)?;
            self.calls.push((port, changed));
            Ok(changed)
        }

        fn table(&self) -> &DataTable {
            self.inner.table()
        }
    }

    #[test]
    fn initial_commit_processes_port_zero_once() {
        let schema = build_schema(vec!["a".to_owned()], vec![DType::Int64]).unwrap();
        let keyed = build_schema(
            vec!["a".to_owned(), PSP_PKEY.to_owned(), PSP_OKEY.to_owned()],
            vec![DType::Int64; 3],
        )
        .unwrap();
        let node = Arc::new(Mutex::new(RecordingNode {
            inner: GNode::new(keyed).unwrap(),
            calls: Vec::new(),
        }));
        let shared: SharedNode = node.clone();
        let table = Table::with_processing_node(schema.clone(), 3, "", shared).unwrap();

        let mut data_table = build_data_table(&schema, 3).unwrap();
        fill_column_slice(
            data_table.column_mut("a").unwrap(),
            ColumnSlice::Int64(&[0, 1, 2]),
            None,
            0,
        )
        .unwrap();

        assert!(commit_initial(&table, data_table).unwrap());
        assert_eq!(node.lock().unwrap().calls, vec![(0, true)]);
        assert_eq!(table.size(), 3);
    }
}
