use crate::engine::core::vector::SelectionVector;

/// First transaction id. Commit timestamps stay below it, so a version
/// field tells a committed row apart from one still owned by a writer.
pub const TRANSACTION_ID_START: u64 = 1 << 62;

/// Deletion marker of a row nobody deleted.
pub const NOT_DELETED: u64 = u64::MAX;

/// Point-in-time view of a reader: everything committed at or before
/// `start_ts`, plus its own uncommitted writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub start_ts: u64,
    pub txn_id: u64,
}

impl Snapshot {
    pub fn new(start_ts: u64, txn_id: u64) -> Self {
        Self { start_ts, txn_id }
    }

    /// Sees every committed version and nothing uncommitted.
    pub fn committed() -> Self {
        Self {
            start_ts: TRANSACTION_ID_START - 1,
            txn_id: 0,
        }
    }

    #[inline]
    pub fn sees(&self, version: u64) -> bool {
        version <= self.start_ts || version == self.txn_id
    }
}

/// Outcome of checking whether a writer may delete or update a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteCheck {
    Writable,
    /// Already deleted as far as the writer can see.
    Deleted,
    /// Owned by another transaction, or changed after the writer started.
    Conflict,
}

/// Insert and delete versions of every row of a table.
#[derive(Debug, Clone, Default)]
pub struct VersionInfo {
    inserted: Vec<u64>,
    deleted: Vec<u64>,
}

impl VersionInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows loaded from a checkpoint: visible to every snapshot.
    pub fn committed(count: u64) -> Self {
        let mut info = Self::new();
        info.append(count as usize, 0);
        info
    }

    pub fn len(&self) -> u64 {
        self.inserted.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty()
    }

    pub fn append(&mut self, count: usize, version: u64) {
        self.inserted.resize(self.inserted.len() + count, version);
        self.deleted.resize(self.deleted.len() + count, NOT_DELETED);
    }

    pub fn inserted(&self, row: u64) -> u64 {
        self.inserted[row as usize]
    }

    pub fn deleted(&self, row: u64) -> u64 {
        self.deleted[row as usize]
    }

    #[inline]
    pub fn is_visible(&self, row: u64, snapshot: &Snapshot) -> bool {
        let row = row as usize;
        snapshot.sees(self.inserted[row]) && !snapshot.sees(self.deleted[row])
    }

    /// Offsets (relative to `start`) of the rows of `[start, start + count)`
    /// visible to `snapshot`.
    pub fn visible_rows(&self, start: u64, count: usize, snapshot: &Snapshot) -> SelectionVector {
        let mut sel = SelectionVector::with_capacity(count);
        for i in 0..count {
            if self.is_visible(start + i as u64, snapshot) {
                sel.push(i);
            }
        }
        sel
    }

    pub fn check_write(&self, row: u64, snapshot: &Snapshot) -> WriteCheck {
        let row = row as usize;
        if !snapshot.sees(self.inserted[row]) {
            return WriteCheck::Conflict;
        }
        match self.deleted[row] {
            NOT_DELETED => WriteCheck::Writable,
            d if snapshot.sees(d) => WriteCheck::Deleted,
            _ => WriteCheck::Conflict,
        }
    }

    pub fn mark_deleted(&mut self, row: u64, version: u64) {
        self.deleted[row as usize] = version;
    }

    /// Clears a deletion mark left by `txn_id`. Returns false when the row
    /// carries someone else's mark.
    pub fn unmark_deleted(&mut self, row: u64, txn_id: u64) -> bool {
        let slot = &mut self.deleted[row as usize];
        if *slot != txn_id {
            return false;
        }
        *slot = NOT_DELETED;
        true
    }

    pub fn commit_delete(&mut self, row: u64, txn_id: u64, commit_ts: u64) {
        let slot = &mut self.deleted[row as usize];
        if *slot == txn_id {
            *slot = commit_ts;
        }
    }
}
