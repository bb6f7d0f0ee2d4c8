use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, warn};

use crate::engine::core::column::SegmentConfig;
use crate::engine::core::txn::{Snapshot, Transaction, TransactionManager};
use crate::engine::core::vector::{DataChunk, Vector};
use crate::engine::core::wal::{WAL_FILE_NAME, WalEntry, WalReplayer, WalWriter};
use crate::engine::errors::{StorageError, TransactionError};
use crate::engine::storage::checkpoint::CheckpointStore;
use crate::engine::storage::{Catalog, ColumnDefinition, DataTable, RowId, ScanChunk, TableFilter, TableScan};
use crate::shared::config::Settings;

/// Handle to an open database. Clones share the same state.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

struct DatabaseInner {
    catalog: Catalog,
    manager: Arc<TransactionManager>,
    checkpoints: CheckpointStore,
    config: SegmentConfig,
    iteration: AtomicU64,
    vector_size: usize,
    checkpoint_threshold: u64,
    scan_pool: Option<rayon::ThreadPool>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("dir", &self.inner.checkpoints.dir())
            .field("tables", &self.inner.catalog.table_names())
            .field("iteration", &self.checkpoint_iteration())
            .finish()
    }
}

impl Database {
    /// Loads the installed checkpoint and replays the WAL on top of it.
    pub fn open(settings: &Settings) -> Result<Self, TransactionError> {
        let data_dir = PathBuf::from(&settings.storage.data_dir);
        fs::create_dir_all(&data_dir).map_err(StorageError::from)?;
        let config = SegmentConfig::from_settings(&settings.storage)?;
        let checkpoints = CheckpointStore::new(&data_dir, settings.storage.block_size, config);

        let catalog = Catalog::new();
        let (iteration, checkpoint_ts) = match checkpoints.load()? {
            Some(loaded) => {
                for table in loaded.tables {
                    catalog.insert(table)?;
                }
                (loaded.iteration, loaded.last_commit_ts)
            }
            None => (0, 0),
        };

        let wal_path = Path::new(&settings.wal.dir).join(WAL_FILE_NAME);
        let summary = WalReplayer::new(&catalog, config, iteration).replay(&wal_path)?;
        let mut wal = WalWriter::open(&settings.wal)?;
        if summary.discarded_entries > 0 {
            wal.truncate_to(summary.committed_len)?;
        }
        let last_commit_ts = checkpoint_ts.max(summary.last_commit_ts);
        let manager = TransactionManager::new(wal, last_commit_ts);

        let scan_pool = match settings.execution.scan_threads {
            0 => None,
            threads => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("strata-scan-{}", i))
                    .build()
                    .map_err(|e| StorageError::Io(io::Error::other(e)))?,
            ),
        };

        info!(
            target: "database::open",
            dir = ?data_dir, tables = catalog.len(), iteration,
            replayed_commits = summary.applied_commits, last_commit_ts,
            "Database opened"
        );
        Ok(Self {
            inner: Arc::new(DatabaseInner {
                catalog,
                manager,
                checkpoints,
                config,
                iteration: AtomicU64::new(iteration),
                vector_size: settings.execution.vector_size.max(1),
                checkpoint_threshold: settings.wal.checkpoint_threshold,
                scan_pool,
            }),
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    pub fn transaction_manager(&self) -> &Arc<TransactionManager> {
        &self.inner.manager
    }

    pub fn checkpoint_iteration(&self) -> u64 {
        self.inner.iteration.load(Ordering::SeqCst)
    }

    pub fn begin(&self) -> Transaction {
        self.inner.manager.begin()
    }

    /// Commits `txn`, then checkpoints if the WAL has outgrown its
    /// threshold and nothing else is running.
    pub fn commit(&self, txn: &mut Transaction) -> Result<u64, TransactionError> {
        let commit_ts = txn.commit()?;
        let threshold = self.inner.checkpoint_threshold;
        if threshold > 0
            && self.inner.manager.wal_len() > threshold
            && self.inner.manager.active_count() == 0
        {
            debug!(target: "database::commit", threshold, "WAL over threshold, checkpointing");
            if let Err(e) = self.checkpoint() {
                warn!(target: "database::commit", error = %e, "Automatic checkpoint skipped");
            }
        }
        Ok(commit_ts)
    }

    pub fn rollback(&self, txn: &mut Transaction) -> Result<(), TransactionError> {
        txn.rollback()
    }

    /// Creates a table. Schema changes commit immediately.
    pub fn create_table(&self, name: &str, columns: Vec<ColumnDefinition>) -> Result<Arc<DataTable>, TransactionError> {
        let manager = &self.inner.manager;
        let guard = manager.lock_commits();
        if self.inner.catalog.contains(name) {
            return Err(StorageError::TableExists(name.to_string()).into());
        }
        let table = DataTable::new(name, columns.clone(), self.inner.config)?;
        let commit_ts = manager.log_committed(
            &guard,
            vec![WalEntry::CreateTable {
                name: name.to_string(),
                columns,
            }],
        )?;
        let table = self.inner.catalog.insert(table)?;
        info!(target: "database::create_table", table = %name, commit_ts, "Table created");
        Ok(table)
    }

    pub fn drop_table(&self, name: &str) -> Result<(), TransactionError> {
        let manager = &self.inner.manager;
        let guard = manager.lock_commits();
        self.inner.catalog.get(name)?;
        let commit_ts = manager.log_committed(&guard, vec![WalEntry::DropTable { name: name.to_string() }])?;
        self.inner.catalog.remove(name)?;
        info!(target: "database::drop_table", table = %name, commit_ts, "Table dropped");
        Ok(())
    }

    pub fn table(&self, name: &str) -> Result<Arc<DataTable>, StorageError> {
        self.inner.catalog.get(name)
    }

    pub fn insert(&self, txn: &mut Transaction, table: &str, chunk: &DataChunk) -> Result<usize, TransactionError> {
        let table = self.table(table)?;
        txn.insert(&table, chunk)
    }

    pub fn delete(&self, txn: &mut Transaction, table: &str, rows: &[RowId]) -> Result<usize, TransactionError> {
        let table = self.table(table)?;
        txn.delete(&table, rows)
    }

    pub fn update(
        &self,
        txn: &mut Transaction,
        table: &str,
        column: usize,
        rows: &[RowId],
        values: &Vector,
    ) -> Result<usize, TransactionError> {
        let table = self.table(table)?;
        txn.update(&table, column, rows, values)
    }

    /// Reads `column_ids` of the rows of `table` visible to `txn` that pass
    /// every filter, including the transaction's own uncommitted rows.
    pub fn scan(
        &self,
        txn: &Transaction,
        table: &str,
        column_ids: &[usize],
        filters: &[TableFilter],
    ) -> Result<Vec<ScanChunk>, TransactionError> {
        txn.ensure_readable()?;
        let table = self.table(table)?;
        let cancel = txn.cancel_handle();
        TableScan::new(&table, txn.snapshot(), column_ids, filters)?
            .with_local(txn.local_table(&table))
            .with_cancel(&cancel)
            .with_vector_size(self.inner.vector_size)
            .execute()
    }

    /// Same result as `scan`, with segment ranges read in parallel.
    pub fn parallel_scan(
        &self,
        txn: &Transaction,
        table: &str,
        column_ids: &[usize],
        filters: &[TableFilter],
    ) -> Result<Vec<ScanChunk>, TransactionError> {
        txn.ensure_readable()?;
        let table = self.table(table)?;
        let cancel = txn.cancel_handle();
        let scan = TableScan::new(&table, txn.snapshot(), column_ids, filters)?
            .with_local(txn.local_table(&table))
            .with_cancel(&cancel)
            .with_vector_size(self.inner.vector_size);
        match &self.inner.scan_pool {
            Some(pool) => pool.install(|| scan.execute_parallel()),
            None => scan.execute_parallel(),
        }
    }

    /// Rewrites every table from its committed rows into a new checkpoint
    /// file and truncates the WAL. Returns the new iteration.
    pub fn checkpoint(&self) -> Result<u64, TransactionError> {
        let inner = &self.inner;
        let _guard = inner.manager.lock_commits();
        let active = inner.manager.active_count();
        if active > 0 {
            return Err(TransactionError::CheckpointConflict(active));
        }

        let iteration = inner.iteration.load(Ordering::SeqCst) + 1;
        let last_commit_ts = inner.manager.last_commit_ts();
        let snapshot = Snapshot::committed();
        let mut tables = Vec::new();
        for table in inner.catalog.tables() {
            let columns = table.materialize(&snapshot, inner.vector_size)?;
            tables.push((table, columns));
        }
        let written = inner.checkpoints.write(iteration, last_commit_ts, tables)?;

        inner
            .manager
            .wal()
            .lock()
            .append(&[WalEntry::Checkpoint { iteration }])?;
        inner.checkpoints.install(&written.pointer)?;
        for (table, columns) in written.tables {
            table.replace_data(columns)?;
        }
        inner.iteration.store(iteration, Ordering::SeqCst);
        inner.manager.wal().lock().truncate()?;
        let removed = inner.checkpoints.remove_stale(iteration)?;

        info!(
            target: "database::checkpoint",
            iteration, last_commit_ts, stale_removed = removed,
            "Checkpoint complete"
        );
        Ok(iteration)
    }
}
