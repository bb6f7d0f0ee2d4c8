use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::engine::core::txn::{TRANSACTION_ID_START, Transaction};
use crate::engine::core::wal::{WalEntry, WalWriter};
use crate::engine::errors::{TransactionError, WalError};

/// Hands out transaction ids and commit timestamps and serializes commits.
///
/// `begin`, `commit`, schema changes and checkpoints all run under the
/// commit lock, so a new snapshot never observes a half-applied commit.
pub struct TransactionManager {
    commit_lock: Mutex<()>,
    next_txn_id: AtomicU64,
    last_commit_ts: AtomicU64,
    active: Mutex<BTreeMap<u64, u64>>,
    wal: Mutex<WalWriter>,
}

impl TransactionManager {
    pub fn new(wal: WalWriter, last_commit_ts: u64) -> Arc<Self> {
        info!(
            target: "transaction_manager::new",
            last_commit_ts, wal_len = wal.len(),
            "Transaction manager ready"
        );
        Arc::new(Self {
            commit_lock: Mutex::new(()),
            next_txn_id: AtomicU64::new(TRANSACTION_ID_START),
            last_commit_ts: AtomicU64::new(last_commit_ts),
            active: Mutex::new(BTreeMap::new()),
            wal: Mutex::new(wal),
        })
    }

    pub fn begin(self: &Arc<Self>) -> Transaction {
        let _guard = self.commit_lock.lock();
        let txn_id = self.next_txn_id.fetch_add(1, Ordering::SeqCst);
        let start_ts = self.last_commit_ts.load(Ordering::SeqCst);
        self.active.lock().insert(txn_id, start_ts);
        debug!(target: "transaction_manager::begin", txn_id, start_ts, "Transaction started");
        Transaction::new(Arc::clone(self), txn_id, start_ts)
    }

    pub fn last_commit_ts(&self) -> u64 {
        self.last_commit_ts.load(Ordering::SeqCst)
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    pub fn wal_len(&self) -> u64 {
        self.wal.lock().len()
    }

    /// Blocks new begins, commits and schema changes while held.
    pub fn lock_commits(&self) -> MutexGuard<'_, ()> {
        self.commit_lock.lock()
    }

    pub(crate) fn wal(&self) -> &Mutex<WalWriter> {
        &self.wal
    }

    /// Timestamp the next commit will carry. Only meaningful under the
    /// commit lock.
    pub(crate) fn next_commit_ts(&self) -> u64 {
        self.last_commit_ts.load(Ordering::SeqCst) + 1
    }

    pub(crate) fn publish(&self, commit_ts: u64) {
        self.last_commit_ts.store(commit_ts, Ordering::SeqCst);
    }

    pub(crate) fn unregister(&self, txn_id: u64) {
        self.active.lock().remove(&txn_id);
    }

    /// Writes `entries` plus a commit record as one durable group outside
    /// any transaction. Used for schema changes.
    pub(crate) fn log_committed(
        &self,
        _commit_guard: &MutexGuard<'_, ()>,
        mut entries: Vec<WalEntry>,
    ) -> Result<u64, TransactionError> {
        let commit_ts = self.next_commit_ts();
        entries.push(WalEntry::Commit { commit_ts });
        self.wal.lock().append(&entries).map_err(|e| match e {
            WalError::Io(io) => TransactionError::WalFlush(io),
            other => TransactionError::Wal(other),
        })?;
        self.publish(commit_ts);
        Ok(commit_ts)
    }
}
