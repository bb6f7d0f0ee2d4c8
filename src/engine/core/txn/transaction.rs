use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::engine::core::txn::local_storage::{LOCAL_ROW_START, is_local_row};
use crate::engine::core::txn::{
    CancelHandle, LocalStorage, LocalTableStorage, Snapshot, TransactionManager, UndoBuffer, UndoRecord,
};
use crate::engine::core::vector::{DataChunk, Vector};
use crate::engine::core::wal::WalEntry;
use crate::engine::errors::{StorageError, TransactionError, VectorError, WalError};
use crate::engine::storage::{DataTable, RowId};
use crate::engine::types::ScalarValue;

/// `Active -> (Committing -> Committed) | (RollingBack -> Aborted)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committing,
    Committed,
    RollingBack,
    Aborted,
}

/// A unit of work under snapshot isolation.
///
/// Inserts stay in transaction-local storage until commit. Deletes and
/// updates of committed rows are applied in place, tagged with the
/// transaction id, and recorded in the undo buffer. Dropping an active
/// transaction rolls it back.
pub struct Transaction {
    manager: Arc<TransactionManager>,
    id: u64,
    start_ts: u64,
    state: TransactionState,
    commit_ts: Option<u64>,
    undo: UndoBuffer,
    local: LocalStorage,
    cancel: CancelHandle,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("start_ts", &self.start_ts)
            .field("state", &self.state)
            .field("undo", &self.undo.len())
            .finish()
    }
}

impl Transaction {
    pub(crate) fn new(manager: Arc<TransactionManager>, id: u64, start_ts: u64) -> Self {
        Self {
            manager,
            id,
            start_ts,
            state: TransactionState::Active,
            commit_ts: None,
            undo: UndoBuffer::new(),
            local: LocalStorage::new(),
            cancel: CancelHandle::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn start_ts(&self) -> u64 {
        self.start_ts
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn commit_ts(&self) -> Option<u64> {
        self.commit_ts
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.start_ts, self.id)
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn local_table(&self, table: &Arc<DataTable>) -> Option<&LocalTableStorage> {
        self.local.get(table)
    }

    fn expect_active(&self) -> Result<(), TransactionError> {
        if self.state != TransactionState::Active {
            return Err(TransactionError::InvalidState {
                txn_id: self.id,
                expected: TransactionState::Active,
                actual: self.state,
            });
        }
        Ok(())
    }

    /// Readers cannot roll back through a shared borrow; a cancelled
    /// transaction is rolled back by its next write, commit or drop.
    pub fn ensure_readable(&self) -> Result<(), TransactionError> {
        self.expect_active()?;
        if self.cancel.is_cancelled() {
            return Err(TransactionError::Cancelled);
        }
        Ok(())
    }

    fn begin_write(&mut self) -> Result<(), TransactionError> {
        self.expect_active()?;
        if self.cancel.is_cancelled() {
            self.rollback()?;
            return Err(TransactionError::Cancelled);
        }
        Ok(())
    }

    /// Buffers the selected rows of `chunk` for insertion at commit.
    pub fn insert(&mut self, table: &Arc<DataTable>, chunk: &DataChunk) -> Result<usize, TransactionError> {
        self.begin_write()?;
        if chunk.is_empty() {
            return Ok(0);
        }
        let range = self.local.get_or_create(table).append(chunk)?;
        let count = range.len();
        self.undo.push(UndoRecord::Insert {
            table: Arc::clone(table),
            local_start: range.start,
            count,
        });
        debug!(
            target: "transaction::insert",
            txn_id = self.id, table = %table.name(), rows = count,
            "Rows buffered"
        );
        Ok(count)
    }

    /// Deletes the given rows and returns how many were newly deleted.
    /// Rows this transaction can already see as deleted are skipped.
    pub fn delete(&mut self, table: &Arc<DataTable>, rows: &[RowId]) -> Result<usize, TransactionError> {
        self.begin_write()?;
        let (local_rows, table_rows): (Vec<RowId>, Vec<RowId>) = rows.iter().copied().partition(|r| is_local_row(*r));
        self.check_local_rows(table, &local_rows)?;

        let mut deleted = table.delete(&table_rows, &self.snapshot())?;
        if let Some(local) = self.local.get_mut(table) {
            for &row in &local_rows {
                if local.delete((row - LOCAL_ROW_START) as usize) {
                    deleted.push(row);
                }
            }
        }

        let count = deleted.len();
        if count > 0 {
            self.undo.push(UndoRecord::Delete {
                table: Arc::clone(table),
                rows: deleted,
            });
        }
        debug!(
            target: "transaction::delete",
            txn_id = self.id, table = %table.name(), requested = rows.len(), deleted = count,
            "Rows deleted"
        );
        Ok(count)
    }

    /// Sets `column` of `rows[i]` to `values[i]` and returns how many rows
    /// were updated. Rows this transaction sees as deleted are skipped.
    pub fn update(
        &mut self,
        table: &Arc<DataTable>,
        column: usize,
        rows: &[RowId],
        values: &Vector,
    ) -> Result<usize, TransactionError> {
        self.begin_write()?;
        let Some(column_type) = table.types().get(column) else {
            return Err(StorageError::ColumnOutOfRange {
                table: table.name().to_string(),
                column,
            }
            .into());
        };
        if values.logical_type() != column_type {
            return Err(VectorError::TypeMismatch {
                expected: column_type.clone(),
                found: values.logical_type().to_string(),
            }
            .into());
        }
        if values.capacity() < rows.len() {
            return Err(VectorError::IndexOutOfBounds {
                index: rows.len() - 1,
                capacity: values.capacity(),
            }
            .into());
        }

        let mut local_rows = Vec::new();
        let mut local_values = Vec::new();
        let mut table_rows = Vec::new();
        let mut table_values = Vec::new();
        for (i, &row) in rows.iter().enumerate() {
            if is_local_row(row) {
                local_rows.push(row);
                local_values.push(values.get_value(i));
            } else {
                table_rows.push(row);
                table_values.push(values.get_value(i));
            }
        }
        self.check_local_rows(table, &local_rows)?;

        let (mut updated, mut before_images) = table.update(column, &table_rows, &table_values, &self.snapshot())?;
        if let Some(local) = self.local.get_mut(table) {
            for (&row, value) in local_rows.iter().zip(&local_values) {
                let offset = (row - LOCAL_ROW_START) as usize;
                if local.is_deleted(offset) {
                    continue;
                }
                before_images.push(local.get(column, offset));
                local.set(column, offset, value)?;
                updated.push(row);
            }
        }

        let count = updated.len();
        if count > 0 {
            self.undo.push(UndoRecord::Update {
                table: Arc::clone(table),
                column,
                rows: updated,
                before_images,
            });
        }
        debug!(
            target: "transaction::update",
            txn_id = self.id, table = %table.name(), column, updated = count,
            "Rows updated"
        );
        Ok(count)
    }

    fn check_local_rows(&self, table: &Arc<DataTable>, rows: &[RowId]) -> Result<(), TransactionError> {
        let local = self.local.get(table);
        for &row in rows {
            let offset = (row - LOCAL_ROW_START) as usize;
            if !local.is_some_and(|l| l.contains(offset)) {
                return Err(StorageError::RowOutOfRange {
                    table: table.name().to_string(),
                    row,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Makes the transaction's writes durable, then visible to snapshots
    /// taken after the returned commit timestamp.
    ///
    /// A failed WAL flush leaves the transaction `Active`: the caller may
    /// retry the commit or roll back.
    pub fn commit(&mut self) -> Result<u64, TransactionError> {
        self.expect_active()?;
        if self.cancel.is_cancelled() {
            self.rollback()?;
            return Err(TransactionError::Cancelled);
        }

        let manager = Arc::clone(&self.manager);
        let guard = manager.lock_commits();

        let dropped = self
            .undo
            .iter()
            .find(|r| r.table().is_dropped())
            .map(|r| r.table().name().to_string());
        if let Some(name) = dropped {
            drop(guard);
            warn!(target: "transaction::commit", txn_id = self.id, table = %name, "Table dropped before commit");
            self.rollback()?;
            return Err(StorageError::TableNotFound(name).into());
        }

        if self.undo.is_empty() {
            let commit_ts = manager.last_commit_ts();
            manager.unregister(self.id);
            self.state = TransactionState::Committed;
            self.commit_ts = Some(commit_ts);
            debug!(target: "transaction::commit", txn_id = self.id, "Read-only transaction committed");
            return Ok(commit_ts);
        }

        self.state = TransactionState::Committing;
        let commit_ts = manager.next_commit_ts();
        let entries = match self.wal_entries(commit_ts) {
            Ok(entries) => entries,
            Err(e) => {
                self.state = TransactionState::Active;
                return Err(e);
            }
        };
        if let Err(e) = manager.wal().lock().append(&entries) {
            self.state = TransactionState::Active;
            let err = match e {
                WalError::Io(io) => TransactionError::WalFlush(io),
                other => TransactionError::Wal(other),
            };
            err.log_error();
            return Err(err);
        }

        let applied = self.apply_commit(commit_ts);
        manager.publish(commit_ts);
        manager.unregister(self.id);
        drop(guard);

        self.state = TransactionState::Committed;
        self.commit_ts = Some(commit_ts);
        let undo_len = self.undo.len();
        self.undo.clear();
        self.local.clear();

        if let Err(e) = applied {
            e.log_error();
            return Err(e);
        }
        info!(
            target: "transaction::commit",
            txn_id = self.id, commit_ts, records = undo_len, wal_entries = entries.len(),
            "Transaction committed"
        );
        Ok(commit_ts)
    }

    /// Delete and update records in undo order, then the surviving local
    /// inserts, then the commit record.
    fn wal_entries(&self, commit_ts: u64) -> Result<Vec<WalEntry>, TransactionError> {
        let snapshot = self.snapshot();
        let mut entries = Vec::new();
        for record in self.undo.iter() {
            match record {
                UndoRecord::Insert { .. } => {}
                UndoRecord::Delete { table, rows } => {
                    let rows = committed_rows(rows);
                    if !rows.is_empty() {
                        entries.push(WalEntry::Delete {
                            table: table.name().to_string(),
                            rows,
                        });
                    }
                }
                UndoRecord::Update { table, column, rows, .. } => {
                    let rows = committed_rows(rows);
                    if rows.is_empty() {
                        continue;
                    }
                    let values = rows
                        .iter()
                        .map(|&row| table.fetch(*column, row, &snapshot))
                        .collect::<Result<Vec<_>, _>>()?;
                    entries.push(WalEntry::Update {
                        table: table.name().to_string(),
                        column: *column,
                        rows,
                        values,
                    });
                }
            }
        }
        for local in self.local.iter() {
            let rows: Vec<Vec<ScalarValue>> = local.live_rows().into_iter().map(|o| local.row(o)).collect();
            if !rows.is_empty() {
                entries.push(WalEntry::Insert {
                    table: local.table().name().to_string(),
                    rows,
                });
            }
        }
        entries.push(WalEntry::Commit { commit_ts });
        Ok(entries)
    }

    /// Stamps every version this transaction wrote with `commit_ts`. Runs
    /// to the end even after a failure so no row keeps the transaction id.
    fn apply_commit(&self, commit_ts: u64) -> Result<(), TransactionError> {
        let mut first_error: Option<TransactionError> = None;
        let mut keep = |result: Result<(), StorageError>| {
            if let Err(e) = result {
                first_error.get_or_insert(e.into());
            }
        };
        for local in self.local.iter() {
            let rows = local.live_rows();
            if !rows.is_empty() {
                keep(local.table().append(local.columns(), &rows, commit_ts).map(|_| ()));
            }
        }
        for record in self.undo.iter() {
            match record {
                UndoRecord::Insert { .. } => {}
                UndoRecord::Delete { table, rows } => {
                    keep(table.commit_delete(&committed_rows(rows), self.id, commit_ts));
                }
                UndoRecord::Update { table, column, rows, .. } => {
                    keep(table.commit_update(*column, &committed_rows(rows), self.id, commit_ts));
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Unwinds the undo buffer newest first. Rolling back an aborted
    /// transaction again is a no-op.
    pub fn rollback(&mut self) -> Result<(), TransactionError> {
        match self.state {
            TransactionState::Aborted => return Ok(()),
            TransactionState::Active => {}
            actual => {
                return Err(TransactionError::InvalidState {
                    txn_id: self.id,
                    expected: TransactionState::Active,
                    actual,
                });
            }
        }
        self.state = TransactionState::RollingBack;
        let records = self.undo.len();
        let result = self.unwind();
        self.undo.clear();
        self.local.clear();
        self.state = TransactionState::Aborted;
        self.manager.unregister(self.id);

        match result {
            Ok(()) => {
                debug!(target: "transaction::rollback", txn_id = self.id, records, "Transaction rolled back");
                Ok(())
            }
            Err(e) => {
                e.log_error();
                Err(e)
            }
        }
    }

    fn unwind(&mut self) -> Result<(), TransactionError> {
        let snapshot = self.snapshot();
        let mut first_error: Option<TransactionError> = None;
        while let Some(record) = self.undo.pop() {
            let result = match record {
                UndoRecord::Insert { table, local_start, count } => match self.local.get_mut(&table) {
                    Some(local) if local.len() >= local_start + count => {
                        local.truncate(local_start);
                        Ok(())
                    }
                    _ => Err(TransactionError::UndoInconsistency(format!(
                        "insert of {} rows at local offset {} into {} has no local storage",
                        count,
                        local_start,
                        table.name()
                    ))),
                },
                UndoRecord::Delete { table, rows } => {
                    if let Some(local) = self.local.get_mut(&table) {
                        for &row in rows.iter().rev().filter(|r| is_local_row(**r)) {
                            local.undelete((row - LOCAL_ROW_START) as usize);
                        }
                    }
                    let mut rows = committed_rows(&rows);
                    rows.reverse();
                    table.revert_delete(&rows, self.id)
                }
                UndoRecord::Update {
                    table,
                    column,
                    rows,
                    before_images,
                } => self.revert_update(&table, column, &rows, &before_images, &snapshot),
            };
            if let Err(e) = result {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn revert_update(
        &mut self,
        table: &Arc<DataTable>,
        column: usize,
        rows: &[RowId],
        before_images: &[ScalarValue],
        snapshot: &Snapshot,
    ) -> Result<(), TransactionError> {
        if rows.len() != before_images.len() {
            return Err(TransactionError::UndoInconsistency(format!(
                "update of {} rows carries {} before-images",
                rows.len(),
                before_images.len()
            )));
        }
        for (&row, before) in rows.iter().zip(before_images).rev() {
            if is_local_row(row) {
                let offset = (row - LOCAL_ROW_START) as usize;
                match self.local.get_mut(table) {
                    Some(local) if local.contains(offset) => local.set(column, offset, before)?,
                    _ => {
                        return Err(TransactionError::UndoInconsistency(format!(
                            "update of local row {} in {} has no local storage",
                            offset,
                            table.name()
                        )));
                    }
                }
            } else {
                table.revert_update(column, row, snapshot, before)?;
            }
        }
        Ok(())
    }
}

fn committed_rows(rows: &[RowId]) -> Vec<RowId> {
    rows.iter().copied().filter(|r| !is_local_row(*r)).collect()
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.state != TransactionState::Active {
            return;
        }
        if self.undo.is_empty() {
            debug!(target: "transaction::drop", txn_id = self.id, "Releasing unfinished read-only transaction");
        } else {
            warn!(
                target: "transaction::drop",
                txn_id = self.id, records = self.undo.len(),
                "Active transaction dropped, rolling back"
            );
        }
        if let Err(e) = self.rollback() {
            e.log_error();
        }
    }
}
