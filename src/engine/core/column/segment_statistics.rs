use std::cmp::Ordering;
use std::hash::Hasher;

use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

use crate::engine::core::row::CompareOp;
use crate::engine::core::vector::Vector;
use crate::engine::types::{LogicalType, ScalarValue};

/// Outcome of testing a `column OP constant` predicate against statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneResult {
    /// No row of the segment can match; the scan may be skipped.
    AlwaysFalse,
    /// Every row matches; the filter may be skipped for this segment.
    AlwaysTrue,
    Unknown,
}

const SKETCH_WORDS: usize = 16;
const SKETCH_BITS: usize = SKETCH_WORDS * 64;

/// Linear-counting sketch over value hashes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistinctSketch {
    bits: [u64; SKETCH_WORDS],
}

impl Default for DistinctSketch {
    fn default() -> Self {
        Self {
            bits: [0; SKETCH_WORDS],
        }
    }
}

impl DistinctSketch {
    pub fn insert(&mut self, value: &ScalarValue) {
        let slot = (hash_value(value) as usize) % SKETCH_BITS;
        self.bits[slot / 64] |= 1u64 << (slot % 64);
    }

    pub fn merge(&mut self, other: &DistinctSketch) {
        for (a, b) in self.bits.iter_mut().zip(other.bits.iter()) {
            *a |= *b;
        }
    }

    pub fn estimate(&self) -> u64 {
        let set: u32 = self.bits.iter().map(|w| w.count_ones()).sum();
        let zeros = SKETCH_BITS as f64 - set as f64;
        if zeros == 0.0 {
            // Saturated; the caller clamps to the row count.
            return u64::MAX;
        }
        let m = SKETCH_BITS as f64;
        (m * (m / zeros).ln()).round() as u64
    }
}

fn hash_value(value: &ScalarValue) -> u64 {
    let mut h = FxHasher::default();
    match value {
        ScalarValue::Null => h.write_u8(0),
        ScalarValue::Boolean(v) => h.write_u8(*v as u8 + 1),
        ScalarValue::TinyInt(v) => h.write_i64(*v as i64),
        ScalarValue::SmallInt(v) => h.write_i64(*v as i64),
        ScalarValue::Integer(v) => h.write_i64(*v as i64),
        ScalarValue::BigInt(v) => h.write_i64(*v),
        ScalarValue::UBigInt(v) => h.write_u64(*v),
        ScalarValue::Real(v) => h.write_u64((*v as f64 + 0.0).to_bits()),
        ScalarValue::Double(v) => h.write_u64((*v + 0.0).to_bits()),
        ScalarValue::Varchar(s) => h.write(s.as_bytes()),
        ScalarValue::List(items) => {
            for item in items {
                h.write_u64(hash_value(item));
            }
        }
    }
    // Fx mixes poorly in the low bits for small integers.
    h.finish().wrapping_mul(0x9E37_79B9_7F4A_7C15).rotate_left(29)
}

/// Running statistics of one column segment.
///
/// `min`/`max` bound every value any snapshot can read from the segment:
/// appends and updates only widen them. `null_count` is exact for appended
/// rows; after an update it is only meaningful as zero/non-zero. `min` is
/// `None` exactly when no non-null value was ever stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentStatistics {
    logical_type: LogicalType,
    min: Option<ScalarValue>,
    max: Option<ScalarValue>,
    null_count: u64,
    row_count: u64,
    distinct: DistinctSketch,
}

impl SegmentStatistics {
    pub fn new(logical_type: LogicalType) -> Self {
        Self {
            logical_type,
            min: None,
            max: None,
            null_count: 0,
            row_count: 0,
            distinct: DistinctSketch::default(),
        }
    }

    pub fn logical_type(&self) -> &LogicalType {
        &self.logical_type
    }

    pub fn min(&self) -> Option<&ScalarValue> {
        self.min.as_ref()
    }

    pub fn max(&self) -> Option<&ScalarValue> {
        self.max.as_ref()
    }

    pub fn null_count(&self) -> u64 {
        self.null_count
    }

    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    pub fn has_nulls(&self) -> bool {
        self.null_count > 0
    }

    /// Estimated number of distinct non-null values.
    pub fn distinct_hint(&self) -> u64 {
        if self.min.is_none() {
            return 0;
        }
        self.distinct
            .estimate()
            .clamp(1, self.row_count.saturating_sub(self.null_count).max(1))
    }

    /// Accounts for one appended value.
    pub fn update(&mut self, value: &ScalarValue) {
        self.row_count += 1;
        if value.is_null() {
            self.null_count += 1;
        } else {
            self.widen(value);
        }
    }

    pub fn update_vector(&mut self, vector: &Vector, count: usize) {
        for i in 0..count {
            self.update(&vector.get_value(i));
        }
    }

    /// Accounts for an in-place update. The row count is unchanged.
    pub fn update_in_place(&mut self, value: &ScalarValue) {
        if value.is_null() {
            self.null_count = self.null_count.max(1);
        } else {
            self.widen(value);
        }
    }

    fn widen(&mut self, value: &ScalarValue) {
        match &self.min {
            Some(min) if value.compare(min) != Some(Ordering::Less) => {}
            _ => self.min = Some(value.clone()),
        }
        match &self.max {
            Some(max) if value.compare(max) != Some(Ordering::Greater) => {}
            _ => self.max = Some(value.clone()),
        }
        self.distinct.insert(value);
    }

    pub fn merge(&mut self, other: &SegmentStatistics) {
        self.row_count += other.row_count;
        self.null_count += other.null_count;
        if let Some(min) = &other.min {
            self.widen(min);
        }
        if let Some(max) = &other.max {
            self.widen(max);
        }
        self.distinct.merge(&other.distinct);
    }

    /// Tests `column OP constant` for the whole segment. Never answers
    /// `AlwaysFalse` for a segment holding a matching row.
    pub fn check_predicate(&self, op: CompareOp, constant: &ScalarValue) -> PruneResult {
        if self.row_count == 0 {
            return PruneResult::AlwaysFalse;
        }
        let all_null = self.min.is_none();

        if constant.is_null() {
            return match op {
                CompareOp::NotDistinctFrom if !self.has_nulls() => PruneResult::AlwaysFalse,
                CompareOp::NotDistinctFrom if all_null => PruneResult::AlwaysTrue,
                CompareOp::DistinctFrom if !self.has_nulls() => PruneResult::AlwaysTrue,
                CompareOp::DistinctFrom if all_null => PruneResult::AlwaysFalse,
                CompareOp::NotDistinctFrom | CompareOp::DistinctFrom => PruneResult::Unknown,
                _ => PruneResult::AlwaysFalse,
            };
        }

        let (Some(min), Some(max)) = (&self.min, &self.max) else {
            return match op {
                CompareOp::DistinctFrom => PruneResult::AlwaysTrue,
                _ => PruneResult::AlwaysFalse,
            };
        };
        let (Some(c_min), Some(c_max)) = (constant.compare(min), constant.compare(max)) else {
            return PruneResult::Unknown;
        };
        let no_nulls = !self.has_nulls();
        let single = c_min == Ordering::Equal && c_max == Ordering::Equal;
        let outside = c_min == Ordering::Less || c_max == Ordering::Greater;

        let (never, always) = match op {
            CompareOp::Equal | CompareOp::NotDistinctFrom => (outside, single && no_nulls),
            CompareOp::NotEqual => (single, outside && no_nulls),
            CompareOp::DistinctFrom => (single && no_nulls, outside),
            // column < c
            CompareOp::LessThan => (c_min != Ordering::Greater, c_max == Ordering::Greater && no_nulls),
            CompareOp::LessThanOrEqual => (c_min == Ordering::Less, c_max != Ordering::Less && no_nulls),
            // column > c
            CompareOp::GreaterThan => (c_max != Ordering::Less, c_min == Ordering::Less && no_nulls),
            CompareOp::GreaterThanOrEqual => (c_max == Ordering::Greater, c_min != Ordering::Greater && no_nulls),
        };

        if never {
            PruneResult::AlwaysFalse
        } else if always {
            PruneResult::AlwaysTrue
        } else {
            PruneResult::Unknown
        }
    }
}
