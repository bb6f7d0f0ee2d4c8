use std::path::Path;

use tracing::{debug, info};

use crate::engine::core::column::SegmentConfig;
use crate::engine::core::wal::{WalEntry, WalReader};
use crate::engine::errors::{StorageError, WalError};
use crate::engine::storage::{Catalog, DataTable};
use crate::shared::storage_header::BinaryHeader;

/// Outcome of replaying one WAL file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied_commits: usize,
    /// Entries already contained in the loaded checkpoint.
    pub skipped_entries: usize,
    /// Entries of a trailing group that never reached its commit record.
    pub discarded_entries: usize,
    pub last_commit_ts: u64,
    pub valid_len: u64,
    /// Offset just past the last applied commit record, or the skipped
    /// prefix. Anything after it is not committed.
    pub committed_len: u64,
    pub torn_tail: bool,
}

/// Rebuilds committed state from the log on top of a loaded checkpoint.
pub struct WalReplayer<'a> {
    catalog: &'a Catalog,
    config: SegmentConfig,
    checkpoint_iteration: u64,
}

impl<'a> WalReplayer<'a> {
    pub fn new(catalog: &'a Catalog, config: SegmentConfig, checkpoint_iteration: u64) -> Self {
        Self {
            catalog,
            config,
            checkpoint_iteration,
        }
    }

    pub fn replay(&self, path: &Path) -> Result<ReplaySummary, WalError> {
        let read = WalReader::new(path).read()?;
        let mut summary = ReplaySummary {
            valid_len: read.valid_len,
            torn_tail: read.torn_tail,
            ..ReplaySummary::default()
        };

        // Everything up to the newest marker the loaded checkpoint covers is
        // already in the checkpoint.
        let start = read
            .entries
            .iter()
            .rposition(|e| matches!(e, WalEntry::Checkpoint { iteration } if *iteration <= self.checkpoint_iteration))
            .map_or(0, |idx| idx + 1);
        summary.skipped_entries = start;
        summary.committed_len = match start {
            0 => BinaryHeader::TOTAL_LEN as u64,
            n => read.entry_ends[n - 1],
        }
        .min(read.valid_len);

        let mut pending: Vec<&WalEntry> = Vec::new();
        for (entry, &end) in read.entries[start..].iter().zip(&read.entry_ends[start..]) {
            match entry {
                WalEntry::Commit { commit_ts } => {
                    self.apply_group(&pending, *commit_ts)?;
                    debug!(
                        target: "wal_replay::replay",
                        commit_ts, entries = pending.len(),
                        "Replayed commit group"
                    );
                    pending.clear();
                    summary.applied_commits += 1;
                    summary.last_commit_ts = summary.last_commit_ts.max(*commit_ts);
                    summary.committed_len = end;
                }
                WalEntry::Checkpoint { iteration } => {
                    debug!(
                        target: "wal_replay::replay",
                        iteration, loaded = self.checkpoint_iteration,
                        "Ignoring marker of a checkpoint that was never installed"
                    );
                }
                other => pending.push(other),
            }
        }
        summary.discarded_entries = pending.len();

        info!(
            target: "wal_replay::replay",
            path = ?path,
            applied_commits = summary.applied_commits,
            skipped = summary.skipped_entries,
            discarded = summary.discarded_entries,
            torn_tail = summary.torn_tail,
            "WAL replay complete"
        );
        Ok(summary)
    }

    fn apply_group(&self, entries: &[&WalEntry], commit_ts: u64) -> Result<(), WalError> {
        for entry in entries {
            self.apply(entry, commit_ts).map_err(|e| WalError::Replay(Box::new(e)))?;
        }
        Ok(())
    }

    fn apply(&self, entry: &WalEntry, commit_ts: u64) -> Result<(), StorageError> {
        match entry {
            WalEntry::CreateTable { name, columns } => {
                self.catalog.insert(DataTable::new(name, columns.clone(), self.config)?)?;
            }
            WalEntry::DropTable { name } => {
                self.catalog.remove(name)?;
            }
            WalEntry::Insert { table, rows } => {
                self.catalog.get(table)?.append_rows(rows, commit_ts)?;
            }
            WalEntry::Delete { table, rows } => {
                self.catalog.get(table)?.delete_committed(rows, commit_ts)?;
            }
            WalEntry::Update {
                table,
                column,
                rows,
                values,
            } => {
                self.catalog.get(table)?.update_committed(*column, rows, values, commit_ts)?;
            }
            WalEntry::Checkpoint { .. } | WalEntry::Commit { .. } => {}
        }
        Ok(())
    }
}
