use std::sync::Arc;

use crate::engine::storage::{DataTable, RowId};
use crate::engine::types::ScalarValue;

/// One reversible mutation. Row ids at or above `LOCAL_ROW_START` address
/// the transaction's own uncommitted inserts.
#[derive(Debug)]
pub enum UndoRecord {
    Insert {
        table: Arc<DataTable>,
        local_start: usize,
        count: usize,
    },
    Delete {
        table: Arc<DataTable>,
        rows: Vec<RowId>,
    },
    Update {
        table: Arc<DataTable>,
        column: usize,
        rows: Vec<RowId>,
        before_images: Vec<ScalarValue>,
    },
}

impl UndoRecord {
    pub fn table(&self) -> &Arc<DataTable> {
        match self {
            UndoRecord::Insert { table, .. }
            | UndoRecord::Delete { table, .. }
            | UndoRecord::Update { table, .. } => table,
        }
    }
}

/// Append-only log of a transaction's mutations, unwound newest first.
#[derive(Debug, Default)]
pub struct UndoBuffer {
    records: Vec<UndoRecord>,
}

impl UndoBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: UndoRecord) {
        self.records.push(record);
    }

    pub fn pop(&mut self) -> Option<UndoRecord> {
        self.records.pop()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in the order they were written.
    pub fn iter(&self) -> impl Iterator<Item = &UndoRecord> {
        self.records.iter()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
