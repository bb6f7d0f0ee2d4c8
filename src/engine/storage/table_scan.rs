use std::ops::Range;

use rayon::prelude::*;
use tracing::debug;

use crate::engine::core::column::PruneResult;
use crate::engine::core::txn::{CancelHandle, LOCAL_ROW_START, LocalTableStorage, Snapshot};
use crate::engine::core::vector::{DataChunk, STANDARD_VECTOR_SIZE, SelectionVector, Vector};
use crate::engine::errors::{StorageError, TransactionError};
use crate::engine::storage::{BoundFilters, DataTable, RowId, TableData, TableFilter};
use crate::engine::types::ScalarValue;

/// Projected rows of one scanned range. `row_ids[i]` is the id of logical
/// row `i` of `chunk`.
#[derive(Debug, Clone)]
pub struct ScanChunk {
    pub chunk: DataChunk,
    pub row_ids: Vec<RowId>,
}

impl ScanChunk {
    pub fn len(&self) -> usize {
        self.row_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_ids.is_empty()
    }

    pub fn rows(&self) -> Vec<Vec<ScalarValue>> {
        self.chunk.rows()
    }
}

/// Reads a table as of one snapshot: committed segments first, then the
/// reader's own uncommitted inserts.
pub struct TableScan<'a> {
    table: &'a DataTable,
    snapshot: Snapshot,
    column_ids: Vec<usize>,
    filters: Option<BoundFilters>,
    local: Option<&'a LocalTableStorage>,
    cancel: Option<&'a CancelHandle>,
    vector_size: usize,
}

impl<'a> TableScan<'a> {
    pub fn new(
        table: &'a DataTable,
        snapshot: Snapshot,
        column_ids: &[usize],
        filters: &[TableFilter],
    ) -> Result<Self, StorageError> {
        if let Some(&column) = column_ids.iter().find(|&&c| c >= table.column_count()) {
            return Err(StorageError::ColumnOutOfRange {
                table: table.name().to_string(),
                column,
            });
        }
        Ok(Self {
            table,
            snapshot,
            column_ids: column_ids.to_vec(),
            filters: BoundFilters::bind(table, filters)?,
            local: None,
            cancel: None,
            vector_size: STANDARD_VECTOR_SIZE,
        })
    }

    pub fn with_local(mut self, local: Option<&'a LocalTableStorage>) -> Self {
        self.local = local;
        self
    }

    pub fn with_cancel(mut self, cancel: &'a CancelHandle) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_vector_size(mut self, vector_size: usize) -> Self {
        self.vector_size = vector_size.max(1);
        self
    }

    fn check_cancel(&self) -> Result<(), TransactionError> {
        if self.cancel.is_some_and(CancelHandle::is_cancelled) {
            return Err(TransactionError::Cancelled);
        }
        Ok(())
    }

    /// Segment-aligned ranges of at most `vector_size` rows, skipping
    /// segments the statistics rule out.
    fn plan(&self, data: &TableData) -> Vec<Range<u64>> {
        let step = self.vector_size as u64;
        let mut ranges = Vec::new();
        let mut pruned = 0usize;
        for (idx, segment) in data.segment_ranges().into_iter().enumerate() {
            let verdict = self.filters.as_ref().map(|f| f.prune(data, idx));
            if verdict == Some(PruneResult::AlwaysFalse) {
                pruned += 1;
                continue;
            }
            let mut start = segment.start;
            while start < segment.end {
                let end = (start + step).min(segment.end);
                ranges.push(start..end);
                start = end;
            }
        }
        debug!(
            target: "table_scan::plan",
            table = %self.table.name(), ranges = ranges.len(), pruned_segments = pruned,
            "Scan planned"
        );
        ranges
    }

    pub fn execute(&self) -> Result<Vec<ScanChunk>, TransactionError> {
        let mut out = Vec::new();
        {
            let data = self.table.read();
            for range in self.plan(&data) {
                self.check_cancel()?;
                if let Some(chunk) = self.scan_range(&data, range)? {
                    out.push(chunk);
                }
            }
        }
        self.scan_local(&mut out)?;
        Ok(out)
    }

    /// Scans disjoint ranges on the current rayon pool. Chunks come back
    /// in row order.
    pub fn execute_parallel(&self) -> Result<Vec<ScanChunk>, TransactionError> {
        let mut out: Vec<ScanChunk> = {
            let guard = self.table.read();
            let data: &TableData = &guard;
            self.plan(data)
                .into_par_iter()
                .map(|range| {
                    self.check_cancel()?;
                    Ok(self.scan_range(data, range)?)
                })
                .collect::<Result<Vec<_>, TransactionError>>()?
                .into_iter()
                .flatten()
                .collect()
        };
        self.scan_local(&mut out)?;
        Ok(out)
    }

    fn needed_columns(&self) -> Vec<usize> {
        let mut needed: Vec<usize> = self.column_ids.clone();
        if let Some(filters) = &self.filters {
            needed.extend(filters.columns());
        }
        needed.sort_unstable();
        needed.dedup();
        needed
    }

    fn scan_range(&self, data: &TableData, range: Range<u64>) -> Result<Option<ScanChunk>, StorageError> {
        let start = range.start;
        let count = (range.end - range.start) as usize;
        let sel = data.versions().visible_rows(start, count, &self.snapshot);
        if sel.is_empty() {
            return Ok(None);
        }
        let mut vectors: Vec<Option<Vector>> = vec![None; self.table.column_count()];
        for column in self.needed_columns() {
            vectors[column] = Some(data.column(column).scan(start, count, &self.snapshot)?);
        }
        self.finish(vectors, count, sel, |i| start + i as u64)
    }

    fn scan_local(&self, out: &mut Vec<ScanChunk>) -> Result<(), TransactionError> {
        let Some(local) = self.local else {
            return Ok(());
        };
        let mut start = 0;
        while start < local.len() {
            self.check_cancel()?;
            let count = self.vector_size.min(local.len() - start);
            let sel: SelectionVector = (0..count).filter(|&i| !local.is_deleted(start + i)).collect();
            if !sel.is_empty() {
                let mut vectors: Vec<Option<Vector>> = vec![None; self.table.column_count()];
                for column in self.needed_columns() {
                    let source = &local.columns()[column];
                    let mut vector = Vector::new(source.logical_type().clone(), count);
                    for i in 0..count {
                        vector.copy_slot(i, source, start + i)?;
                    }
                    vectors[column] = Some(vector);
                }
                let base = start;
                if let Some(chunk) = self.finish(vectors, count, sel, |i| LOCAL_ROW_START + (base + i) as u64)? {
                    out.push(chunk);
                }
            }
            start += count;
        }
        Ok(())
    }

    /// Applies the filters to the scanned vectors, then moves the projected
    /// ones into the result chunk. A column projected twice is copied once.
    fn finish(
        &self,
        mut vectors: Vec<Option<Vector>>,
        count: usize,
        mut sel: SelectionVector,
        row_id: impl Fn(usize) -> RowId,
    ) -> Result<Option<ScanChunk>, StorageError> {
        let missing = |column| StorageError::ColumnOutOfRange {
            table: self.table.name().to_string(),
            column,
        };
        if let Some(filters) = &self.filters {
            let inputs = filters
                .columns()
                .map(|c| vectors.get(c).and_then(Option::as_ref).ok_or_else(|| missing(c)))
                .collect::<Result<Vec<&Vector>, _>>()?;
            filters.apply(&inputs, count, &mut sel)?;
            if sel.is_empty() {
                return Ok(None);
            }
        }
        let mut columns = Vec::with_capacity(self.column_ids.len());
        for (pos, &column) in self.column_ids.iter().enumerate() {
            let projected_again = self.column_ids[pos + 1..].contains(&column);
            let slot = vectors.get_mut(column).ok_or_else(|| missing(column))?;
            let vector = if projected_again { slot.clone() } else { slot.take() };
            columns.push(vector.ok_or_else(|| missing(column))?);
        }
        let mut chunk = DataChunk::from_vectors(columns, count)?;
        let row_ids = sel.iter().map(&row_id).collect();
        chunk.slice(&sel)?;
        Ok(Some(ScanChunk { chunk, row_ids }))
    }
}
