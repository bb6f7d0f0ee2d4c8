use tempfile::TempDir;

use crate::engine::storage::{ColumnDefinition, Database};
use crate::engine::types::LogicalType;
use crate::shared::config::Settings;

/// A database in its own temporary directory.
pub struct TestDatabase {
    pub db: Database,
    pub settings: Settings,
    pub dir: TempDir,
}

impl TestDatabase {
    /// Drops the handle and opens the same directory again.
    pub fn reopen(self) -> TestDatabase {
        let TestDatabase { db, settings, dir } = self;
        drop(db);
        let db = Database::open(&settings).expect("reopen database");
        TestDatabase { db, settings, dir }
    }
}

/// Builds a database rooted in a fresh temp dir. Fsync and automatic
/// checkpoints are off unless asked for.
pub struct DatabaseFactory {
    settings: Settings,
    dir: TempDir,
    tables: Vec<(String, Vec<ColumnDefinition>)>,
}

impl DatabaseFactory {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let mut settings = Settings::with_data_dir(dir.path());
        settings.wal.fsync = false;
        settings.wal.checkpoint_threshold = 0;
        settings.storage.block_size = 4096;
        settings.storage.segment_capacity = 1024;
        Self {
            settings,
            dir,
            tables: Vec::new(),
        }
    }

    pub fn with_segment_capacity(mut self, capacity: usize) -> Self {
        self.settings.storage.segment_capacity = capacity;
        self
    }

    pub fn with_compression(mut self, compression: &str) -> Self {
        self.settings.storage.compression = compression.to_string();
        self
    }

    pub fn with_vector_size(mut self, vector_size: usize) -> Self {
        self.settings.execution.vector_size = vector_size;
        self
    }

    pub fn with_scan_threads(mut self, threads: usize) -> Self {
        self.settings.execution.scan_threads = threads;
        self
    }

    pub fn with_checkpoint_threshold(mut self, bytes: u64) -> Self {
        self.settings.wal.checkpoint_threshold = bytes;
        self
    }

    pub fn with_table(mut self, name: &str, columns: &[(&str, LogicalType)]) -> Self {
        let columns = columns
            .iter()
            .map(|(n, t)| ColumnDefinition::new(*n, t.clone()))
            .collect();
        self.tables.push((name.to_string(), columns));
        self
    }

    pub fn create(self) -> TestDatabase {
        let db = Database::open(&self.settings).expect("open database");
        for (name, columns) in self.tables {
            db.create_table(&name, columns).expect("create table");
        }
        TestDatabase {
            db,
            settings: self.settings,
            dir: self.dir,
        }
    }
}
