use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{RwLock, RwLockReadGuard};
use rustc_hash::FxHashSet;
use tracing::{debug, info};

use crate::engine::core::column::{ColumnData, SegmentConfig};
use crate::engine::core::txn::{Snapshot, VersionInfo, WriteCheck};
use crate::engine::core::vector::{DataChunk, Vector};
use crate::engine::errors::{StorageError, TransactionError, VectorError};
use crate::engine::storage::ColumnDefinition;
use crate::engine::types::{LogicalType, ScalarValue};

/// Position of a committed row in its table. Row ids follow commit order.
pub type RowId = u64;

/// Column storage plus row versions of one table. Every column holds the
/// same number of rows and shares segment boundaries with its siblings.
#[derive(Debug)]
pub struct TableData {
    columns: Vec<ColumnData>,
    versions: VersionInfo,
}

impl TableData {
    pub fn columns(&self) -> &[ColumnData] {
        &self.columns
    }

    pub fn column(&self, idx: usize) -> &ColumnData {
        &self.columns[idx]
    }

    pub fn versions(&self) -> &VersionInfo {
        &self.versions
    }

    pub fn row_count(&self) -> u64 {
        self.versions.len()
    }

    /// Row ranges covered by each segment, in row order.
    pub fn segment_ranges(&self) -> Vec<Range<u64>> {
        self.columns
            .first()
            .map(|c| c.segments().iter().map(|s| s.start()..s.end()).collect())
            .unwrap_or_default()
    }
}

pub struct DataTable {
    name: String,
    columns: Vec<ColumnDefinition>,
    types: Vec<LogicalType>,
    config: SegmentConfig,
    dropped: AtomicBool,
    data: RwLock<TableData>,
}

impl std::fmt::Debug for DataTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataTable")
            .field("name", &self.name)
            .field("columns", &self.columns)
            .field("dropped", &self.is_dropped())
            .finish()
    }
}

impl DataTable {
    pub fn new(
        name: impl Into<String>,
        columns: Vec<ColumnDefinition>,
        config: SegmentConfig,
    ) -> Result<Self, StorageError> {
        let data = columns
            .iter()
            .map(|c| ColumnData::new(c.logical_type.clone(), config))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_columns(name, columns, config, data)
    }

    /// Wraps checkpointed column data. All rows become visible to every
    /// snapshot.
    pub fn from_columns(
        name: impl Into<String>,
        columns: Vec<ColumnDefinition>,
        config: SegmentConfig,
        data: Vec<ColumnData>,
    ) -> Result<Self, StorageError> {
        let name = name.into();
        if columns.is_empty() {
            return Err(StorageError::NoColumns(name));
        }
        let versions = committed_versions(&name, &data, columns.len())?;
        Ok(Self {
            types: columns.iter().map(|c| c.logical_type.clone()).collect(),
            name,
            columns,
            config,
            dropped: AtomicBool::new(false),
            data: RwLock::new(TableData { columns: data, versions }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn types(&self) -> &[LogicalType] {
        &self.types
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn config(&self) -> SegmentConfig {
        self.config
    }

    pub fn row_count(&self) -> u64 {
        self.data.read().row_count()
    }

    pub fn is_dropped(&self) -> bool {
        self.dropped.load(Ordering::Acquire)
    }

    pub(crate) fn mark_dropped(&self) {
        self.dropped.store(true, Ordering::Release);
    }

    /// Shared access for scans. Writers wait until the guard is dropped.
    pub fn read(&self) -> RwLockReadGuard<'_, TableData> {
        self.data.read()
    }

    /// Swaps in checkpointed column data.
    pub fn replace_data(&self, data: Vec<ColumnData>) -> Result<(), StorageError> {
        let versions = committed_versions(&self.name, &data, self.columns.len())?;
        let rows = versions.len();
        *self.data.write() = TableData { columns: data, versions };
        debug!(target: "data_table::replace_data", table = %self.name, rows, "Table storage replaced");
        Ok(())
    }

    fn check_row(&self, data: &TableData, row: RowId) -> Result<(), StorageError> {
        if row >= data.row_count() {
            return Err(StorageError::RowOutOfRange {
                table: self.name.clone(),
                row,
            });
        }
        Ok(())
    }

    fn check_column(&self, column: usize) -> Result<(), StorageError> {
        if column >= self.columns.len() {
            return Err(StorageError::ColumnOutOfRange {
                table: self.name.clone(),
                column,
            });
        }
        Ok(())
    }

    fn conflict(&self, row: RowId) -> TransactionError {
        TransactionError::WriteConflict {
            table: self.name.clone(),
            row,
        }
    }

    /// Appends `columns[c][rows[i]]` as new rows carrying `version`.
    pub fn append(&self, columns: &[Vector], rows: &[usize], version: u64) -> Result<Range<RowId>, StorageError> {
        if columns.len() != self.types.len() {
            return Err(VectorError::ColumnCount {
                expected: self.types.len(),
                actual: columns.len(),
            }
            .into());
        }
        for (vector, ty) in columns.iter().zip(&self.types) {
            if vector.logical_type() != ty {
                return Err(VectorError::TypeMismatch {
                    expected: ty.clone(),
                    found: vector.logical_type().to_string(),
                }
                .into());
            }
        }
        let mut data = self.data.write();
        let start = data.row_count();
        for (column, vector) in data.columns.iter_mut().zip(columns) {
            column.append(vector, rows)?;
        }
        data.versions.append(rows.len(), version);
        debug!(
            target: "data_table::append",
            table = %self.name, start, rows = rows.len(), version,
            "Rows appended"
        );
        Ok(start..start + rows.len() as u64)
    }

    pub fn append_rows(&self, rows: &[Vec<ScalarValue>], version: u64) -> Result<Range<RowId>, StorageError> {
        let chunk = DataChunk::from_rows(&self.types, rows)?;
        let selection: Vec<usize> = (0..chunk.cardinality()).collect();
        self.append(chunk.columns(), &selection, version)
    }

    /// Whether `column` of `row` carries a version `snapshot` cannot see.
    fn has_hidden_update(data: &TableData, column: usize, row: RowId, snapshot: &Snapshot) -> bool {
        data.columns[column]
            .latest_update_version(row)
            .is_some_and(|v| !snapshot.sees(v))
    }

    /// Marks `rows` deleted by `snapshot.txn_id`. Either every row is
    /// checked and marked, or nothing changes. Returns the rows marked;
    /// rows already deleted from the writer's point of view are skipped.
    pub fn delete(&self, rows: &[RowId], snapshot: &Snapshot) -> Result<Vec<RowId>, TransactionError> {
        let mut data = self.data.write();
        let mut seen = FxHashSet::default();
        let mut targets = Vec::with_capacity(rows.len());
        for &row in rows {
            self.check_row(&data, row)?;
            if !seen.insert(row) {
                continue;
            }
            match data.versions.check_write(row, snapshot) {
                WriteCheck::Writable => {}
                WriteCheck::Deleted => continue,
                WriteCheck::Conflict => return Err(self.conflict(row)),
            }
            if (0..data.columns.len()).any(|c| Self::has_hidden_update(&data, c, row, snapshot)) {
                return Err(self.conflict(row));
            }
            targets.push(row);
        }
        for &row in &targets {
            data.versions.mark_deleted(row, snapshot.txn_id);
        }
        Ok(targets)
    }

    pub fn commit_delete(&self, rows: &[RowId], txn_id: u64, commit_ts: u64) -> Result<(), StorageError> {
        let mut data = self.data.write();
        for &row in rows {
            self.check_row(&data, row)?;
            data.versions.commit_delete(row, txn_id, commit_ts);
        }
        Ok(())
    }

    pub fn revert_delete(&self, rows: &[RowId], txn_id: u64) -> Result<(), TransactionError> {
        let mut data = self.data.write();
        for &row in rows {
            if row >= data.row_count() || !data.versions.unmark_deleted(row, txn_id) {
                return Err(TransactionError::UndoInconsistency(format!(
                    "row {} of {} carries no deletion by transaction {}",
                    row, self.name, txn_id
                )));
            }
        }
        Ok(())
    }

    /// Deletes rows on behalf of an already committed transaction.
    pub fn delete_committed(&self, rows: &[RowId], commit_ts: u64) -> Result<(), StorageError> {
        let mut data = self.data.write();
        for &row in rows {
            self.check_row(&data, row)?;
            data.versions.mark_deleted(row, commit_ts);
        }
        Ok(())
    }

    /// Writes `values[i]` into `column` of `rows[i]` as versions owned by
    /// `snapshot.txn_id`. Returns the updated rows and their before-images.
    pub fn update(
        &self,
        column: usize,
        rows: &[RowId],
        values: &[ScalarValue],
        snapshot: &Snapshot,
    ) -> Result<(Vec<RowId>, Vec<ScalarValue>), TransactionError> {
        self.check_column(column)?;
        if rows.len() != values.len() {
            return Err(VectorError::IndexOutOfBounds {
                index: rows.len(),
                capacity: values.len(),
            }
            .into());
        }
        let mut data = self.data.write();
        let mut targets = Vec::with_capacity(rows.len());
        for (i, &row) in rows.iter().enumerate() {
            self.check_row(&data, row)?;
            match data.versions.check_write(row, snapshot) {
                WriteCheck::Writable => {}
                WriteCheck::Deleted => continue,
                WriteCheck::Conflict => return Err(self.conflict(row)),
            }
            if Self::has_hidden_update(&data, column, row, snapshot) {
                return Err(self.conflict(row));
            }
            if !values[i].fits(&self.types[column]) {
                return Err(VectorError::TypeMismatch {
                    expected: self.types[column].clone(),
                    found: values[i].to_string(),
                }
                .into());
            }
            targets.push(i);
        }

        let target = &mut data.columns[column];
        let mut updated = Vec::with_capacity(targets.len());
        let mut before_images = Vec::with_capacity(targets.len());
        for i in targets {
            let row = rows[i];
            before_images.push(target.fetch(row, snapshot)?);
            target.update(row, snapshot.txn_id, values[i].clone())?;
            updated.push(row);
        }
        Ok((updated, before_images))
    }

    pub fn commit_update(&self, column: usize, rows: &[RowId], txn_id: u64, commit_ts: u64) -> Result<(), StorageError> {
        self.check_column(column)?;
        let mut data = self.data.write();
        for &row in rows {
            data.columns[column].commit_update(row, txn_id, commit_ts)?;
        }
        Ok(())
    }

    /// Drops the newest version `snapshot.txn_id` wrote on `row` and checks
    /// that the value now visible is the recorded before-image.
    pub fn revert_update(
        &self,
        column: usize,
        row: RowId,
        snapshot: &Snapshot,
        before_image: &ScalarValue,
    ) -> Result<(), TransactionError> {
        let inconsistent = |what: String| TransactionError::UndoInconsistency(what);
        if column >= self.columns.len() {
            return Err(inconsistent(format!("column {} of {} does not exist", column, self.name)));
        }
        let mut data = self.data.write();
        let target = &mut data.columns[column];
        if target.revert_update(row, snapshot.txn_id)?.is_none() {
            return Err(inconsistent(format!(
                "row {} column {} of {} has no version by transaction {}",
                row, column, self.name, snapshot.txn_id
            )));
        }
        let restored = target.fetch(row, snapshot)?;
        if !restored.same_as(before_image) {
            return Err(inconsistent(format!(
                "row {} column {} of {} restored to {}, expected {}",
                row, column, self.name, restored, before_image
            )));
        }
        Ok(())
    }

    /// Updates rows on behalf of an already committed transaction.
    pub fn update_committed(
        &self,
        column: usize,
        rows: &[RowId],
        values: &[ScalarValue],
        commit_ts: u64,
    ) -> Result<(), StorageError> {
        self.check_column(column)?;
        if rows.len() != values.len() {
            return Err(StorageError::corruption(
                "update record",
                format!("{} rows but {} values", rows.len(), values.len()),
            ));
        }
        let mut data = self.data.write();
        for (&row, value) in rows.iter().zip(values) {
            self.check_row(&data, row)?;
            data.columns[column].update(row, commit_ts, value.clone())?;
        }
        Ok(())
    }

    pub fn fetch(&self, column: usize, row: RowId, snapshot: &Snapshot) -> Result<ScalarValue, StorageError> {
        self.check_column(column)?;
        let data = self.data.read();
        self.check_row(&data, row)?;
        data.columns[column].fetch(row, snapshot)
    }

    /// Copies the rows visible to `snapshot` into fresh columns: updates
    /// are folded into base values and deleted rows are dropped.
    pub fn materialize(&self, snapshot: &Snapshot, vector_size: usize) -> Result<Vec<ColumnData>, StorageError> {
        let data = self.data.read();
        let mut out = self
            .types
            .iter()
            .map(|t| ColumnData::new(t.clone(), self.config))
            .collect::<Result<Vec<_>, _>>()?;
        let total = data.row_count();
        let step = vector_size.max(1) as u64;
        let mut start = 0;
        while start < total {
            let count = step.min(total - start) as usize;
            let visible = data.versions.visible_rows(start, count, snapshot);
            if !visible.is_empty() {
                for (source, target) in data.columns.iter().zip(out.iter_mut()) {
                    let values = source.scan(start, count, snapshot)?;
                    target.append(&values, visible.as_slice())?;
                }
            }
            start += count as u64;
        }
        info!(
            target: "data_table::materialize",
            table = %self.name, rows = total,
            kept = out.first().map_or(0, ColumnData::row_count),
            "Table materialized"
        );
        Ok(out)
    }
}

fn committed_versions(name: &str, data: &[ColumnData], expected: usize) -> Result<VersionInfo, StorageError> {
    if data.len() != expected {
        return Err(StorageError::corruption(
            format!("table {}", name),
            format!("{} column stores for {} columns", data.len(), expected),
        ));
    }
    let rows = data.first().map_or(0, ColumnData::row_count);
    if let Some(bad) = data.iter().find(|c| c.row_count() != rows) {
        return Err(StorageError::corruption(
            format!("table {}", name),
            format!("column holds {} rows, expected {}", bad.row_count(), rows),
        ));
    }
    Ok(VersionInfo::committed(rows))
}
