use crate::engine::core::wal::WalEntry;
use crate::engine::errors::WalError;

/// `[kind u8][payload_len u32][crc32(payload) u32]`, little endian.
pub const FRAME_HEADER_LEN: usize = 9;

/// Appends the framed encoding of `entry` to `out`.
pub fn encode_frame(entry: &WalEntry, out: &mut Vec<u8>) -> Result<(), WalError> {
    let payload = entry.encode()?;
    let len = u32::try_from(payload.len()).map_err(|_| WalError::EntryTooLarge(payload.len()))?;
    out.push(entry.kind() as u8);
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub kind: u8,
    pub len: u32,
    pub crc: u32,
}

impl FrameHeader {
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let header = bytes.get(..FRAME_HEADER_LEN)?;
        Some(Self {
            kind: header[0],
            len: u32::from_le_bytes([header[1], header[2], header[3], header[4]]),
            crc: u32::from_le_bytes([header[5], header[6], header[7], header[8]]),
        })
    }
}
