use crate::engine::core::column::ColumnSegment;
use crate::engine::core::column::compression::CompressionScheme;
use crate::engine::core::txn::Snapshot;
use crate::engine::core::vector::Vector;
use crate::engine::errors::{StorageError, VectorError};
use crate::engine::types::{LogicalType, ScalarValue};
use crate::shared::config::StorageConfig;

/// Segment sizing and compression shared by all columns of a database.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentConfig {
    pub capacity: usize,
    pub compression: CompressionScheme,
    pub zstd_level: i32,
}

impl SegmentConfig {
    pub fn from_settings(cfg: &StorageConfig) -> Result<Self, StorageError> {
        Ok(Self {
            capacity: cfg.segment_capacity.max(1),
            compression: cfg.compression.parse()?,
            zstd_level: cfg.zstd_level,
        })
    }
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            capacity: 16 * 1024,
            compression: CompressionScheme::Lz4,
            zstd_level: 3,
        }
    }
}

/// All segments of one column, ordered by start row. Every segment but the
/// last is sealed; segments of sibling columns share boundaries.
#[derive(Debug)]
pub struct ColumnData {
    logical_type: LogicalType,
    config: SegmentConfig,
    segments: Vec<ColumnSegment>,
    row_count: u64,
}

impl ColumnData {
    pub fn new(logical_type: LogicalType, config: SegmentConfig) -> Result<Self, StorageError> {
        if logical_type.is_nested() {
            return Err(StorageError::UnsupportedType(logical_type));
        }
        Ok(Self {
            logical_type,
            config,
            segments: Vec::new(),
            row_count: 0,
        })
    }

    /// Rebuilds a column from checkpointed segments.
    pub fn from_segments(
        logical_type: LogicalType,
        config: SegmentConfig,
        segments: Vec<ColumnSegment>,
    ) -> Result<Self, StorageError> {
        let mut expected = 0u64;
        for segment in &segments {
            if segment.start() != expected {
                return Err(StorageError::corruption(
                    "column segments",
                    format!("segment starts at {}, expected {}", segment.start(), expected),
                ));
            }
            expected = segment.end();
        }
        Ok(Self {
            logical_type,
            config,
            segments,
            row_count: expected,
        })
    }

    pub fn logical_type(&self) -> &LogicalType {
        &self.logical_type
    }

    pub fn config(&self) -> SegmentConfig {
        self.config
    }

    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    pub fn segments(&self) -> &[ColumnSegment] {
        &self.segments
    }

    /// Appends `source[rows[i]]` in order, sealing each segment as it fills.
    pub fn append(&mut self, source: &Vector, rows: &[usize]) -> Result<(), StorageError> {
        if source.logical_type() != &self.logical_type {
            return Err(StorageError::Vector(VectorError::TypeMismatch {
                expected: self.logical_type.clone(),
                found: source.logical_type().to_string(),
            }));
        }
        let mut remaining = rows;
        while !remaining.is_empty() {
            let needs_segment = self.segments.last().is_none_or(|s| s.is_full() || !s.is_transient());
            if needs_segment {
                self.segments.push(ColumnSegment::transient(
                    self.logical_type.clone(),
                    self.row_count,
                    self.config.capacity,
                )?);
            }
            let Some(tail) = self.segments.last_mut() else {
                break;
            };
            let taken = tail.append(source, remaining)?;
            self.row_count += taken as u64;
            remaining = &remaining[taken..];
            if tail.is_full() {
                tail.seal(self.config.compression, self.config.zstd_level)?;
            }
        }
        Ok(())
    }

    /// Index of the segment holding `row`.
    pub fn segment_index(&self, row: u64) -> Option<usize> {
        if row >= self.row_count {
            return None;
        }
        let idx = self.segments.partition_point(|s| s.end() <= row);
        (idx < self.segments.len()).then_some(idx)
    }

    fn locate(&self, row: u64) -> Result<(usize, usize), StorageError> {
        let idx = self.segment_index(row).ok_or_else(|| StorageError::RowOutOfRange {
            table: String::new(),
            row,
        })?;
        Ok((idx, (row - self.segments[idx].start()) as usize))
    }

    /// Reads rows `[start, start + count)` as seen by `snapshot`.
    pub fn scan(&self, start: u64, count: usize, snapshot: &Snapshot) -> Result<Vector, StorageError> {
        let mut out = Vector::new(self.logical_type.clone(), count);
        self.scan_into(&mut out, 0, start, count, snapshot)?;
        Ok(out)
    }

    pub fn scan_into(
        &self,
        out: &mut Vector,
        out_offset: usize,
        start: u64,
        count: usize,
        snapshot: &Snapshot,
    ) -> Result<(), StorageError> {
        let end = start + count as u64;
        if end > self.row_count {
            return Err(StorageError::RowOutOfRange {
                table: String::new(),
                row: end.saturating_sub(1),
            });
        }
        let mut row = start;
        let mut written = out_offset;
        while row < end {
            let (idx, offset) = self.locate(row)?;
            let segment = &self.segments[idx];
            let take = ((segment.end() - row) as usize).min((end - row) as usize);
            segment.scan(offset..offset + take, snapshot, out, written)?;
            row += take as u64;
            written += take;
        }
        Ok(())
    }

    pub fn fetch(&self, row: u64, snapshot: &Snapshot) -> Result<ScalarValue, StorageError> {
        let (idx, offset) = self.locate(row)?;
        self.segments[idx].fetch(offset, snapshot)
    }

    pub fn update(&mut self, row: u64, version: u64, value: ScalarValue) -> Result<(), StorageError> {
        if !value.fits(&self.logical_type) {
            return Err(StorageError::Vector(VectorError::TypeMismatch {
                expected: self.logical_type.clone(),
                found: value.to_string(),
            }));
        }
        let (idx, offset) = self.locate(row)?;
        self.segments[idx].update(offset, version, value);
        Ok(())
    }

    pub fn commit_update(&mut self, row: u64, txn_id: u64, commit_ts: u64) -> Result<(), StorageError> {
        let (idx, offset) = self.locate(row)?;
        self.segments[idx].commit_update(offset, txn_id, commit_ts);
        Ok(())
    }

    pub fn revert_update(&mut self, row: u64, txn_id: u64) -> Result<Option<ScalarValue>, StorageError> {
        let (idx, offset) = self.locate(row)?;
        Ok(self.segments[idx].revert_update(offset, txn_id))
    }

    pub fn latest_update_version(&self, row: u64) -> Option<u64> {
        let (idx, offset) = self.locate(row).ok()?;
        self.segments[idx].latest_update_version(offset)
    }
}
