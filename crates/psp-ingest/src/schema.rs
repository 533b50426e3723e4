#![forbid(unsafe_code)]

use crate::error::{IngestError, IngestResult};
use crate::types::DType;
use std::collections::HashMap;

/// Ordered, name-unique list of `(column, dtype)` pairs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<String>,
    types: Vec<DType>,
    index: HashMap<String, usize>,
}

impl Schema {
    pub fn new(columns: Vec<String>, types: Vec<DType>) -> IngestResult<Self> {
        if columns.len() != types.len() {
            return Err(IngestError::SchemaMismatch(format!(
                "{} column names but {} dtypes",
                columns.len(),
                types.len()
            )));
        }

        let mut schema = Schema::default();
        for (name, dtype) in columns.into_iter().zip(types) {
            schema.add_column(name, dtype)?;
        }
        Ok(schema)
    }

    pub fn add_column(&mut self, name: impl Into<String>, dtype: DType) -> IngestResult<()> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(IngestError::DuplicateColumn(name));
        }
        self.index.insert(name.clone(), self.columns.len());
        self.columns.push(name);
        self.types.push(dtype);
        Ok(())
    }

    /// Change the dtype of an existing column.
    pub(crate) fn retype(&mut self, name: &str, dtype: DType) -> IngestResult<()> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| IngestError::UnknownColumn(name.to_owned()))?;
        self.types[idx] = dtype;
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn types(&self) -> &[DType] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn dtype(&self, name: &str) -> Option<DType> {
        self.column_index(name).map(|idx| self.types[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, DType)> + '_ {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.types.iter().copied())
    }
}
