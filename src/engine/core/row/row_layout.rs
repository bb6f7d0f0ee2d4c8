use crate::engine::errors::MatchError;
use crate::engine::types::{LogicalType, PhysicalType};

/// Fixed-width row-major layout derived from a list of column types.
///
/// Row bytes: `[validity bytes][col 0][col 1]...`. One validity bit per
/// column, packed LSB first, 1 = valid. Offsets are computed once here and
/// shared by every row of the layout.
#[derive(Debug, Clone, PartialEq)]
pub struct RowLayout {
    types: Vec<LogicalType>,
    physical: Vec<PhysicalType>,
    offsets: Vec<usize>,
    validity_bytes: usize,
    row_width: usize,
}

impl RowLayout {
    pub fn new(types: Vec<LogicalType>) -> Result<Self, MatchError> {
        let validity_bytes = types.len().div_ceil(8);
        let mut offsets = Vec::with_capacity(types.len());
        let mut physical = Vec::with_capacity(types.len());
        let mut offset = validity_bytes;
        for ty in &types {
            let phys = ty.physical_type();
            let width = phys
                .row_width()
                .ok_or_else(|| MatchError::UnsupportedType(ty.clone()))?;
            offsets.push(offset);
            physical.push(phys);
            offset += width;
        }
        Ok(Self {
            types,
            physical,
            offsets,
            validity_bytes,
            row_width: offset,
        })
    }

    pub fn types(&self) -> &[LogicalType] {
        &self.types
    }

    pub fn column_count(&self) -> usize {
        self.types.len()
    }

    #[inline]
    pub fn offset(&self, col: usize) -> usize {
        self.offsets[col]
    }

    #[inline]
    pub fn physical_type(&self, col: usize) -> PhysicalType {
        self.physical[col]
    }

    pub fn row_width(&self) -> usize {
        self.row_width
    }

    pub fn validity_bytes(&self) -> usize {
        self.validity_bytes
    }

    /// Byte index and bit mask of the validity bit of `col`.
    #[inline]
    pub fn validity_position(col: usize) -> (usize, u8) {
        (col / 8, 1u8 << (col % 8))
    }
}
