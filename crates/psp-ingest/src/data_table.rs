#![forbid(unsafe_code)]

use crate::column::Column;
use crate::error::{IngestError, IngestResult};
use crate::schema::Schema;
use crate::types::DType;
use std::fmt::Write as _;

/// An owned set of equally sized columns conforming to a [`Schema`].
#[derive(Clone, Debug)]
pub struct DataTable {
    schema: Schema,
    columns: Vec<Column>,
    size: usize,
}

impl DataTable {
    /// Allocate one empty column per schema entry with room for `capacity` rows.
    ///
    /// The table has zero rows until [`DataTable::extend`] is called.
    pub fn new(schema: Schema, capacity: usize) -> IngestResult<Self> {
        let columns = schema
            .iter()
            .map(|(name, dtype)| Column::new(name, dtype, capacity))
            .collect::<IngestResult<Vec<_>>>()?;
        Ok(Self {
            schema,
            columns,
            size: 0,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn num_rows(&self) -> usize {
        self.size
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Grow every column to `num_rows`. New rows exist but are invalid.
    pub fn extend(&mut self, num_rows: usize) {
        if num_rows <= self.size {
            return;
        }
        for column in &mut self.columns {
            column.extend(num_rows);
        }
        self.size = num_rows;
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        let idx = self.schema.column_index(name)?;
        self.columns.get(idx)
    }

    pub fn column(&self, name: &str) -> IngestResult<&Column> {
        self.get_column(name)
            .ok_or_else(|| IngestError::UnknownColumn(name.to_owned()))
    }

    pub fn column_mut(&mut self, name: &str) -> IngestResult<&mut Column> {
        let idx = self
            .schema
            .column_index(name)
            .ok_or_else(|| IngestError::UnknownColumn(name.to_owned()))?;
        Ok(&mut self.columns[idx])
    }

    /// Append a column sized to the current row count, all cells invalid.
    pub fn add_column(&mut self, name: &str, dtype: DType) -> IngestResult<&mut Column> {
        let mut column = Column::new(name, dtype, self.size)?;
        column.extend(self.size);
        self.schema.add_column(name, dtype)?;
        self.columns.push(column);
        let idx = self.columns.len() - 1;
        Ok(&mut self.columns[idx])
    }

    /// Add `new_name` as a copy of `existing` (values, validity and vocabulary).
    pub fn clone_column(&mut self, existing: &str, new_name: &str) -> IngestResult<()> {
        if self.schema.has_column(new_name) {
            return Err(IngestError::DuplicateColumn(new_name.to_owned()));
        }
        let column = self.column(existing)?.renamed(new_name);
        self.schema.add_column(new_name, column.dtype())?;
        self.columns.push(column);
        Ok(())
    }

    /// Like [`DataTable::clone_column`], but overwrites `new_name` when it exists.
    pub(crate) fn replace_with_clone(&mut self, existing: &str, new_name: &str) -> IngestResult<()> {
        let column = self.column(existing)?.renamed(new_name);
        match self.schema.column_index(new_name) {
            Some(idx) => {
                self.schema.retype(new_name, column.dtype())?;
                self.columns[idx] = column;
                Ok(())
            }
            None => {
                self.schema.add_column(new_name, column.dtype())?;
                self.columns.push(column);
                Ok(())
            }
        }
    }

    pub(crate) fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub(crate) fn swap_remove_row(&mut self, row: usize) {
        for column in &mut self.columns {
            column.swap_remove(row);
        }
        self.size -= 1;
    }

    /// Render the first `num_rows` rows as a tab separated grid; nulls print as `-`.
    pub fn pretty_print(&self, num_rows: usize) -> String {
        let mut out = self.schema.columns().join("\t");
        out.push('\n');
        for row in 0..num_rows.min(self.size) {
            for (idx, column) in self.columns.iter().enumerate() {
                if idx > 0 {
                    out.push('\t');
                }
                match column.get(row) {
                    Some(value) => {
                        let _ = write!(out, "{value}");
                    }
                    None => out.push('-'),
                }
            }
            out.push('\n');
        }
        out
    }
}
