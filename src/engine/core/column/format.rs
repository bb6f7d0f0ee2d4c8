use crate::engine::core::column::compression::CompressionScheme;
use crate::engine::types::PhysicalType;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BlockFlags: u8 {
        const HAS_NULLS  = 0b0000_0001;
        const COMPRESSED = 0b0000_0010;
    }
}

/// Header preceding every encoded segment.
///
/// Layout (little endian): `phys u8 | flags u8 | scheme u8 | reserved u8 |
/// row_count u32 | raw_len u32`. `raw_len` is the body length before
/// compression.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnBlockHeader {
    pub phys: u8,
    pub flags: BlockFlags,
    pub scheme: u8,
    pub reserved: u8,
    pub row_count: u32,
    pub raw_len: u32,
}

impl ColumnBlockHeader {
    pub const LEN: usize = 1 + 1 + 1 + 1 + 4 + 4;

    pub fn new(
        phys: PhysicalType,
        scheme: CompressionScheme,
        has_nulls: bool,
        row_count: u32,
        raw_len: u32,
    ) -> Self {
        let mut flags = BlockFlags::empty();
        flags.set(BlockFlags::HAS_NULLS, has_nulls);
        flags.set(
            BlockFlags::COMPRESSED,
            matches!(scheme, CompressionScheme::Lz4 | CompressionScheme::Zstd),
        );
        Self {
            phys: phys.into(),
            flags,
            scheme: scheme.into(),
            reserved: 0,
            row_count,
            raw_len,
        }
    }

    pub fn has_nulls(&self) -> bool {
        self.flags.contains(BlockFlags::HAS_NULLS)
    }

    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.push(self.phys);
        buf.push(self.flags.bits());
        buf.push(self.scheme);
        buf.push(self.reserved);
        buf.extend_from_slice(&self.row_count.to_le_bytes());
        buf.extend_from_slice(&self.raw_len.to_le_bytes());
    }

    /// Returns `None` when the slice is too short or carries unknown flag bits.
    pub fn read_from(slice: &[u8]) -> Option<Self> {
        if slice.len() < Self::LEN {
            return None;
        }
        let flags = BlockFlags::from_bits(slice[1])?;
        let mut c = [0u8; 4];
        c.copy_from_slice(&slice[4..8]);
        let row_count = u32::from_le_bytes(c);
        c.copy_from_slice(&slice[8..12]);
        let raw_len = u32::from_le_bytes(c);
        Some(Self {
            phys: slice[0],
            flags,
            scheme: slice[2],
            reserved: slice[3],
            row_count,
            raw_len,
        })
    }
}
