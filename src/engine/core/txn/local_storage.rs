use std::ops::Range;
use std::sync::Arc;

use roaring::RoaringTreemap;

use crate::engine::core::vector::{DataChunk, Vector};
use crate::engine::errors::{StorageError, VectorError};
use crate::engine::storage::{DataTable, RowId};
use crate::engine::types::ScalarValue;

/// Row ids handed out for uncommitted inserts start here.
pub const LOCAL_ROW_START: RowId = 1 << 62;

#[inline]
pub fn is_local_row(row: RowId) -> bool {
    row >= LOCAL_ROW_START
}

/// Rows one transaction inserted into one table, not yet committed.
#[derive(Debug)]
pub struct LocalTableStorage {
    table: Arc<DataTable>,
    columns: Vec<Vector>,
    count: usize,
    deleted: RoaringTreemap,
}

impl LocalTableStorage {
    pub fn new(table: Arc<DataTable>) -> Self {
        let columns = table.types().iter().map(|t| Vector::new(t.clone(), 0)).collect();
        Self {
            table,
            columns,
            count: 0,
            deleted: RoaringTreemap::new(),
        }
    }

    pub fn table(&self) -> &Arc<DataTable> {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn columns(&self) -> &[Vector] {
        &self.columns
    }

    /// Number of inserted rows that were not deleted again.
    pub fn live_count(&self) -> usize {
        self.count - self.deleted.len() as usize
    }

    /// Appends the selected rows of `chunk` and returns their local offsets.
    pub fn append(&mut self, chunk: &DataChunk) -> Result<Range<usize>, StorageError> {
        if chunk.column_count() != self.columns.len() {
            return Err(VectorError::ColumnCount {
                expected: self.columns.len(),
                actual: chunk.column_count(),
            }
            .into());
        }
        for (column, source) in self.columns.iter().zip(chunk.columns()) {
            if column.logical_type() != source.logical_type() {
                return Err(VectorError::TypeMismatch {
                    expected: column.logical_type().clone(),
                    found: source.logical_type().to_string(),
                }
                .into());
            }
        }
        let start = self.count;
        let end = start + chunk.cardinality();
        if end > self.columns.first().map_or(0, Vector::capacity) {
            let grown = end.max(self.count * 2).max(16);
            for column in &mut self.columns {
                column.resize(grown);
            }
        }
        for (column, source) in self.columns.iter_mut().zip(chunk.columns()) {
            for i in 0..chunk.cardinality() {
                column.copy_slot(start + i, source, chunk.row_index(i))?;
            }
        }
        self.count = end;
        Ok(start..end)
    }

    /// Forgets every row from `offset` on.
    pub fn truncate(&mut self, offset: usize) {
        if offset >= self.count {
            return;
        }
        self.deleted.remove_range(offset as u64..);
        for column in &mut self.columns {
            for slot in offset..self.count {
                column.set_null(slot);
            }
        }
        self.count = offset;
    }

    pub fn contains(&self, offset: usize) -> bool {
        offset < self.count
    }

    pub fn is_deleted(&self, offset: usize) -> bool {
        self.deleted.contains(offset as u64)
    }

    /// Marks a row deleted. Returns false if it already was.
    pub fn delete(&mut self, offset: usize) -> bool {
        self.deleted.insert(offset as u64)
    }

    pub fn undelete(&mut self, offset: usize) {
        self.deleted.remove(offset as u64);
    }

    pub fn get(&self, column: usize, offset: usize) -> ScalarValue {
        self.columns[column].get_value(offset)
    }

    pub fn set(&mut self, column: usize, offset: usize, value: &ScalarValue) -> Result<(), VectorError> {
        self.columns[column].set_value(offset, value)
    }

    /// Offsets of the rows that survive to commit, in insertion order.
    pub fn live_rows(&self) -> Vec<usize> {
        (0..self.count).filter(|&i| !self.is_deleted(i)).collect()
    }

    pub fn row(&self, offset: usize) -> Vec<ScalarValue> {
        self.columns.iter().map(|c| c.get_value(offset)).collect()
    }
}

/// Per-table uncommitted inserts of one transaction.
#[derive(Debug, Default)]
pub struct LocalStorage {
    tables: Vec<LocalTableStorage>,
}

impl LocalStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.iter().all(LocalTableStorage::is_empty)
    }

    pub fn get(&self, table: &Arc<DataTable>) -> Option<&LocalTableStorage> {
        self.tables.iter().find(|t| Arc::ptr_eq(&t.table, table))
    }

    pub fn get_mut(&mut self, table: &Arc<DataTable>) -> Option<&mut LocalTableStorage> {
        self.tables.iter_mut().find(|t| Arc::ptr_eq(&t.table, table))
    }

    pub fn get_or_create(&mut self, table: &Arc<DataTable>) -> &mut LocalTableStorage {
        let pos = match self.tables.iter().position(|t| Arc::ptr_eq(&t.table, table)) {
            Some(pos) => pos,
            None => {
                self.tables.push(LocalTableStorage::new(Arc::clone(table)));
                self.tables.len() - 1
            }
        };
        &mut self.tables[pos]
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocalTableStorage> {
        self.tables.iter()
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }
}
