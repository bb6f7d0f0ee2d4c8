use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::engine::core::wal::wal_frame::{FRAME_HEADER_LEN, FrameHeader};
use crate::engine::core::wal::{WalEntry, WalEntryKind, WalFile};
use crate::engine::errors::WalError;
use crate::shared::storage_header::{BinaryHeader, MagicFile};

/// Entries recovered from a WAL file.
#[derive(Debug, Default)]
pub struct WalReadResult {
    pub entries: Vec<WalEntry>,
    /// File offset just past each entry.
    pub entry_ends: Vec<u64>,
    /// Offset just past the last complete entry; the writer resumes here.
    pub valid_len: u64,
    /// Whether a partial trailing entry was discarded.
    pub torn_tail: bool,
}

/// Sequential forward reader of one WAL file.
#[derive(Debug, Clone)]
pub struct WalReader {
    path: PathBuf,
}

impl WalReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every complete entry. A partial entry at the end of the file
    /// is a torn write from a crash: it is dropped with a warning. Damage
    /// followed by more data is corruption.
    pub fn read(&self) -> Result<WalReadResult, WalError> {
        if !self.path.exists() {
            debug!(target: "wal_reader::read", path = ?self.path, "No WAL file");
            return Ok(WalReadResult::default());
        }
        let bytes = fs::read(&self.path)?;
        if bytes.len() < BinaryHeader::TOTAL_LEN {
            warn!(
                target: "wal_reader::read",
                path = ?self.path, len = bytes.len(),
                "WAL header incomplete, treating log as empty"
            );
            return Ok(WalReadResult {
                torn_tail: !bytes.is_empty(),
                ..WalReadResult::default()
            });
        }
        WalFile::read_and_validate_header(&mut &bytes[..BinaryHeader::TOTAL_LEN]).map_err(|e| {
            WalError::Corruption {
                offset: 0,
                reason: e.to_string(),
            }
        })?;
        parse_frames(&bytes, BinaryHeader::TOTAL_LEN)
    }
}

/// Decodes the frames of `bytes` starting at `start`.
pub fn parse_frames(bytes: &[u8], start: usize) -> Result<WalReadResult, WalError> {
    let mut result = WalReadResult {
        valid_len: start as u64,
        ..WalReadResult::default()
    };
    let mut pos = start;

    while pos < bytes.len() {
        let Some(header) = FrameHeader::parse(&bytes[pos..]) else {
            warn!(
                target: "wal_reader::parse_frames",
                offset = pos, trailing = bytes.len() - pos,
                "Discarding torn frame header at end of WAL"
            );
            result.torn_tail = true;
            break;
        };
        let payload_start = pos + FRAME_HEADER_LEN;
        let payload_end = payload_start + header.len as usize;
        if payload_end > bytes.len() {
            warn!(
                target: "wal_reader::parse_frames",
                offset = pos, expected = header.len, available = bytes.len() - payload_start,
                "Discarding torn entry at end of WAL"
            );
            result.torn_tail = true;
            break;
        }
        let payload = &bytes[payload_start..payload_end];
        let is_last = payload_end == bytes.len();

        let damage = if WalEntryKind::try_from(header.kind).is_err() {
            Some(format!("unknown entry kind {}", header.kind))
        } else if crc32fast::hash(payload) != header.crc {
            Some("checksum mismatch".to_string())
        } else {
            None
        };
        if let Some(reason) = damage {
            if is_last {
                warn!(
                    target: "wal_reader::parse_frames",
                    offset = pos, %reason,
                    "Discarding damaged final WAL entry"
                );
                result.torn_tail = true;
                break;
            }
            return Err(WalError::Corruption {
                offset: pos as u64,
                reason,
            });
        }

        let entry = WalEntry::decode(payload).map_err(|e| WalError::Corruption {
            offset: pos as u64,
            reason: format!("undecodable payload: {}", e),
        })?;
        if entry.kind() as u8 != header.kind {
            return Err(WalError::Corruption {
                offset: pos as u64,
                reason: format!("frame kind {} does not match payload {:?}", header.kind, entry.kind()),
            });
        }
        result.entries.push(entry);
        result.entry_ends.push(payload_end as u64);
        pos = payload_end;
        result.valid_len = pos as u64;
    }

    debug!(
        target: "wal_reader::parse_frames",
        entries = result.entries.len(), valid_len = result.valid_len, torn = result.torn_tail,
        "WAL scanned"
    );
    Ok(result)
}
