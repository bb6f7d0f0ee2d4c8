use std::borrow::Cow;
use std::ops::Range;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::engine::core::block::{BlockManager, BlockPointer};
use crate::engine::core::column::compression::CompressionScheme;
use crate::engine::core::column::segment_codec::{decode_segment, encode_segment};
use crate::engine::core::column::{SegmentStatistics, UpdateOverlay};
use crate::engine::core::txn::Snapshot;
use crate::engine::core::vector::Vector;
use crate::engine::errors::StorageError;
use crate::engine::types::{LogicalType, ScalarValue};

/// Where a segment's base values live.
pub enum SegmentData {
    /// Append buffer of the tail segment.
    Transient(Vector),
    /// Encoded in memory, immutable.
    Sealed(Arc<[u8]>),
    /// Encoded in a checkpoint file, loaded on first read.
    Persistent {
        blocks: Arc<BlockManager>,
        pointer: BlockPointer,
    },
}

/// One column's values over rows `[start, start + count)`.
///
/// Base values never change once sealed; updates go to the overlay.
pub struct ColumnSegment {
    logical_type: LogicalType,
    start: u64,
    count: usize,
    capacity: usize,
    stats: SegmentStatistics,
    data: SegmentData,
    decoded: OnceLock<Vector>,
    overlay: UpdateOverlay,
}

impl std::fmt::Debug for ColumnSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.data {
            SegmentData::Transient(_) => "transient",
            SegmentData::Sealed(_) => "sealed",
            SegmentData::Persistent { .. } => "persistent",
        };
        f.debug_struct("ColumnSegment")
            .field("type", &self.logical_type)
            .field("start", &self.start)
            .field("count", &self.count)
            .field("state", &state)
            .field("updates", &self.overlay.len())
            .finish()
    }
}

impl ColumnSegment {
    pub fn transient(logical_type: LogicalType, start: u64, capacity: usize) -> Result<Self, StorageError> {
        if logical_type.is_nested() {
            return Err(StorageError::UnsupportedType(logical_type));
        }
        Ok(Self {
            data: SegmentData::Transient(Vector::new(logical_type.clone(), capacity)),
            stats: SegmentStatistics::new(logical_type.clone()),
            logical_type,
            start,
            count: 0,
            capacity,
            decoded: OnceLock::new(),
            overlay: UpdateOverlay::new(),
        })
    }

    pub fn persistent(
        logical_type: LogicalType,
        start: u64,
        count: usize,
        stats: SegmentStatistics,
        blocks: Arc<BlockManager>,
        pointer: BlockPointer,
    ) -> Self {
        Self {
            logical_type,
            start,
            count,
            capacity: count,
            stats,
            data: SegmentData::Persistent { blocks, pointer },
            decoded: OnceLock::new(),
            overlay: UpdateOverlay::new(),
        }
    }

    pub fn logical_type(&self) -> &LogicalType {
        &self.logical_type
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn end(&self) -> u64 {
        self.start + self.count as u64
    }

    pub fn is_transient(&self) -> bool {
        matches!(self.data, SegmentData::Transient(_))
    }

    pub fn is_full(&self) -> bool {
        self.count >= self.capacity
    }

    pub fn stats(&self) -> &SegmentStatistics {
        &self.stats
    }

    pub fn overlay(&self) -> &UpdateOverlay {
        &self.overlay
    }

    pub fn data(&self) -> &SegmentData {
        &self.data
    }

    /// Appends `source[rows[i]]` for as many rows as fit and returns how
    /// many were taken. Sealed segments accept nothing.
    pub fn append(&mut self, source: &Vector, rows: &[usize]) -> Result<usize, StorageError> {
        let SegmentData::Transient(buffer) = &mut self.data else {
            return Ok(0);
        };
        let take = rows.len().min(self.capacity - self.count);
        for (i, &row) in rows[..take].iter().enumerate() {
            buffer.copy_slot(self.count + i, source, row)?;
            self.stats.update(&buffer.get_value(self.count + i));
        }
        self.count += take;
        Ok(take)
    }

    /// Encodes the append buffer and makes the segment immutable.
    pub fn seal(&mut self, preferred: CompressionScheme, zstd_level: i32) -> Result<(), StorageError> {
        let SegmentData::Transient(buffer) = &self.data else {
            return Ok(());
        };
        let bytes = encode_segment(buffer, self.count, preferred, zstd_level)?;
        debug!(
            target: "column_segment::seal",
            start = self.start, rows = self.count, bytes = bytes.len(),
            "Sealed segment"
        );
        if let SegmentData::Transient(mut buffer) =
            std::mem::replace(&mut self.data, SegmentData::Sealed(bytes.into()))
        {
            buffer.resize(self.count);
            let _ = self.decoded.set(buffer);
        }
        self.capacity = self.count;
        Ok(())
    }

    /// Encoded base values, for writing into a checkpoint.
    pub fn encoded(&self, preferred: CompressionScheme, zstd_level: i32) -> Result<Arc<[u8]>, StorageError> {
        match &self.data {
            SegmentData::Transient(buffer) => Ok(encode_segment(buffer, self.count, preferred, zstd_level)?.into()),
            SegmentData::Sealed(bytes) => Ok(Arc::clone(bytes)),
            SegmentData::Persistent { blocks, pointer } => Ok(blocks.read(*pointer)?.into()),
        }
    }

    fn base(&self) -> Result<&Vector, StorageError> {
        if let Some(vector) = self.decoded.get() {
            return Ok(vector);
        }
        let bytes: Cow<'_, [u8]> = match &self.data {
            SegmentData::Transient(buffer) => return Ok(buffer),
            SegmentData::Sealed(bytes) => Cow::Borrowed(bytes.as_ref()),
            SegmentData::Persistent { blocks, pointer } => Cow::Owned(blocks.read(*pointer)?),
        };
        let vector = decode_segment(&bytes, &self.logical_type)?;
        if vector.capacity() != self.count {
            return Err(StorageError::corruption(
                "column segment",
                format!("decoded {} rows, expected {}", vector.capacity(), self.count),
            ));
        }
        Ok(self.decoded.get_or_init(|| vector))
    }

    /// Copies offsets `range` into `out` starting at `out_offset`, applying
    /// the updates visible to `snapshot`.
    pub fn scan(
        &self,
        range: Range<usize>,
        snapshot: &Snapshot,
        out: &mut Vector,
        out_offset: usize,
    ) -> Result<(), StorageError> {
        if range.end > self.count {
            return Err(StorageError::corruption(
                "column segment",
                format!("scan {}..{} beyond {} rows", range.start, range.end, self.count),
            ));
        }
        let base = self.base()?;
        for (i, offset) in range.clone().enumerate() {
            out.copy_slot(out_offset + i, base, offset)?;
        }
        for offset in self.overlay.offsets_in(range.start, range.end) {
            if let Some(value) = self.overlay.resolve(offset, snapshot) {
                out.set_value(out_offset + offset - range.start, value)?;
            }
        }
        Ok(())
    }

    pub fn fetch(&self, offset: usize, snapshot: &Snapshot) -> Result<ScalarValue, StorageError> {
        if let Some(value) = self.overlay.resolve(offset, snapshot) {
            return Ok(value.clone());
        }
        Ok(self.base()?.get_value(offset))
    }

    pub fn update(&mut self, offset: usize, version: u64, value: ScalarValue) {
        self.stats.update_in_place(&value);
        self.overlay.push(offset, version, value);
    }

    pub fn commit_update(&mut self, offset: usize, txn_id: u64, commit_ts: u64) {
        self.overlay.commit(offset, txn_id, commit_ts);
    }

    pub fn revert_update(&mut self, offset: usize, txn_id: u64) -> Option<ScalarValue> {
        self.overlay.remove(offset, txn_id)
    }

    pub fn latest_update_version(&self, offset: usize) -> Option<u64> {
        self.overlay.latest_version(offset)
    }
}
