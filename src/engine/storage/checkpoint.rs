use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::engine::core::block::{BlockManager, BlockPointer};
use crate::engine::core::column::{ColumnData, ColumnSegment, SegmentConfig, SegmentStatistics};
use crate::engine::errors::StorageError;
use crate::engine::storage::{ColumnDefinition, DataTable};

pub const CURRENT_FILE_NAME: &str = "CURRENT";
const CURRENT_TMP_NAME: &str = "CURRENT.tmp";
const CHECKPOINT_PREFIX: &str = "checkpoint-";
const CHECKPOINT_SUFFIX: &str = ".db";

pub fn checkpoint_file_name(iteration: u64) -> String {
    format!("{}{:08}{}", CHECKPOINT_PREFIX, iteration, CHECKPOINT_SUFFIX)
}

fn parse_checkpoint_file_name(name: &str) -> Option<u64> {
    name.strip_prefix(CHECKPOINT_PREFIX)?
        .strip_suffix(CHECKPOINT_SUFFIX)?
        .parse()
        .ok()
}

/// Contents of the `CURRENT` file: which checkpoint is installed and where
/// its metadata blob lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentPointer {
    pub iteration: u64,
    pub file: String,
    pub metadata: BlockPointer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentMetadata {
    pub start: u64,
    pub count: usize,
    pub stats: SegmentStatistics,
    pub pointer: BlockPointer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMetadata {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    pub row_count: u64,
    /// One list of segments per column.
    pub segments: Vec<Vec<SegmentMetadata>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub iteration: u64,
    pub last_commit_ts: u64,
    pub tables: Vec<TableMetadata>,
}

/// A checkpoint read back from disk.
#[derive(Debug)]
pub struct LoadedCheckpoint {
    pub iteration: u64,
    pub last_commit_ts: u64,
    pub tables: Vec<DataTable>,
}

/// A checkpoint file that has been written and synced but not installed.
pub struct WrittenCheckpoint {
    pub iteration: u64,
    pub pointer: CurrentPointer,
    /// Persistent columns per table, in the order the tables were given.
    pub tables: Vec<(Arc<DataTable>, Vec<ColumnData>)>,
}

/// Reads and writes checkpoint files in the data directory.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
    block_size: usize,
    config: SegmentConfig,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>, block_size: usize, config: SegmentConfig) -> Self {
        Self {
            dir: dir.into(),
            block_size,
            config,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Loads the checkpoint named by `CURRENT`, if any. Any damage fails
    /// the load.
    pub fn load(&self) -> Result<Option<LoadedCheckpoint>, StorageError> {
        let current_path = self.dir.join(CURRENT_FILE_NAME);
        if !current_path.exists() {
            debug!(target: "checkpoint::load", dir = ?self.dir, "No checkpoint installed");
            return Ok(None);
        }
        let current: CurrentPointer = serde_json::from_slice(&fs::read(&current_path)?)?;
        let blocks = Arc::new(BlockManager::open(&self.dir.join(&current.file))?);
        let metadata: CheckpointMetadata = bincode::deserialize(&blocks.read(current.metadata)?)?;
        if metadata.iteration != current.iteration {
            return Err(StorageError::corruption(
                current.file,
                format!(
                    "metadata is for iteration {}, CURRENT names {}",
                    metadata.iteration, current.iteration
                ),
            ));
        }

        let mut tables = Vec::with_capacity(metadata.tables.len());
        for table in metadata.tables {
            tables.push(self.load_table(table, &blocks)?);
        }
        info!(
            target: "checkpoint::load",
            iteration = metadata.iteration, tables = tables.len(),
            last_commit_ts = metadata.last_commit_ts,
            "Checkpoint loaded"
        );
        Ok(Some(LoadedCheckpoint {
            iteration: metadata.iteration,
            last_commit_ts: metadata.last_commit_ts,
            tables,
        }))
    }

    fn load_table(&self, meta: TableMetadata, blocks: &Arc<BlockManager>) -> Result<DataTable, StorageError> {
        if meta.segments.len() != meta.columns.len() {
            return Err(StorageError::corruption(
                format!("checkpoint table {}", meta.name),
                format!("{} segment lists for {} columns", meta.segments.len(), meta.columns.len()),
            ));
        }
        let mut data = Vec::with_capacity(meta.columns.len());
        for (definition, segments) in meta.columns.iter().zip(meta.segments) {
            let segments = segments
                .into_iter()
                .map(|s| {
                    ColumnSegment::persistent(
                        definition.logical_type.clone(),
                        s.start,
                        s.count,
                        s.stats,
                        Arc::clone(blocks),
                        s.pointer,
                    )
                })
                .collect();
            let column = ColumnData::from_segments(definition.logical_type.clone(), self.config, segments)?;
            if column.row_count() != meta.row_count {
                return Err(StorageError::corruption(
                    format!("checkpoint table {}", meta.name),
                    format!("column {} holds {} rows, expected {}", definition.name, column.row_count(), meta.row_count),
                ));
            }
            data.push(column);
        }
        DataTable::from_columns(meta.name, meta.columns, self.config, data)
    }

    /// Writes materialized `tables` into `checkpoint-{iteration}.db` and
    /// syncs it. The returned columns read from the new file.
    pub fn write(
        &self,
        iteration: u64,
        last_commit_ts: u64,
        tables: Vec<(Arc<DataTable>, Vec<ColumnData>)>,
    ) -> Result<WrittenCheckpoint, StorageError> {
        fs::create_dir_all(&self.dir)?;
        let file = checkpoint_file_name(iteration);
        let path = self.dir.join(&file);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        let blocks = Arc::new(BlockManager::create(&path, self.block_size)?);

        let mut metas = Vec::with_capacity(tables.len());
        let mut persisted = Vec::with_capacity(tables.len());
        for (table, columns) in tables {
            let row_count = columns.first().map_or(0, ColumnData::row_count);
            let mut segment_lists = Vec::with_capacity(columns.len());
            let mut persistent_columns = Vec::with_capacity(columns.len());
            for column in &columns {
                let (list, segments) = self.write_column(column, &blocks)?;
                segment_lists.push(list);
                persistent_columns.push(ColumnData::from_segments(
                    column.logical_type().clone(),
                    self.config,
                    segments,
                )?);
            }
            metas.push(TableMetadata {
                name: table.name().to_string(),
                columns: table.columns().to_vec(),
                row_count,
                segments: segment_lists,
            });
            persisted.push((table, persistent_columns));
        }

        let metadata = CheckpointMetadata {
            iteration,
            last_commit_ts,
            tables: metas,
        };
        let metadata_ptr = blocks.write(&bincode::serialize(&metadata)?)?;
        blocks.sync()?;
        info!(
            target: "checkpoint::write",
            iteration, file = %file, blocks = blocks.block_count(),
            tables = persisted.len(),
            "Checkpoint file written"
        );
        Ok(WrittenCheckpoint {
            iteration,
            pointer: CurrentPointer {
                iteration,
                file,
                metadata: metadata_ptr,
            },
            tables: persisted,
        })
    }

    fn write_column(
        &self,
        column: &ColumnData,
        blocks: &Arc<BlockManager>,
    ) -> Result<(Vec<SegmentMetadata>, Vec<ColumnSegment>), StorageError> {
        let mut list = Vec::with_capacity(column.segments().len());
        let mut segments = Vec::with_capacity(column.segments().len());
        for segment in column.segments() {
            let bytes = segment.encoded(self.config.compression, self.config.zstd_level)?;
            let pointer = blocks.write(&bytes)?;
            list.push(SegmentMetadata {
                start: segment.start(),
                count: segment.count(),
                stats: segment.stats().clone(),
                pointer,
            });
            segments.push(ColumnSegment::persistent(
                column.logical_type().clone(),
                segment.start(),
                segment.count(),
                segment.stats().clone(),
                Arc::clone(blocks),
                pointer,
            ));
        }
        Ok((list, segments))
    }

    /// Points `CURRENT` at `pointer` with a temp-file rename.
    pub fn install(&self, pointer: &CurrentPointer) -> Result<(), StorageError> {
        let tmp = self.dir.join(CURRENT_TMP_NAME);
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&serde_json::to_vec(pointer)?)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, self.dir.join(CURRENT_FILE_NAME))?;
        debug!(
            target: "checkpoint::install",
            iteration = pointer.iteration, file = %pointer.file,
            "CURRENT switched"
        );
        Ok(())
    }

    /// Deletes checkpoint files other than `keep`. Open readers of a deleted
    /// file keep their handle.
    pub fn remove_stale(&self, keep: u64) -> Result<usize, StorageError> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)?.flatten() {
            let name = entry.file_name();
            let Some(iteration) = name.to_str().and_then(parse_checkpoint_file_name) else {
                continue;
            };
            if iteration == keep {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => warn!(
                    target: "checkpoint::remove_stale",
                    path = ?entry.path(), error = %e,
                    "Failed to remove stale checkpoint"
                ),
            }
        }
        Ok(removed)
    }
}
