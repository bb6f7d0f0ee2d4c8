pub mod wal_entry;
pub mod wal_frame;
pub mod wal_reader;
pub mod wal_replay;
pub mod wal_writer;

pub use wal_entry::{WalEntry, WalEntryKind};
pub use wal_reader::{WalReadResult, WalReader};
pub use wal_replay::{ReplaySummary, WalReplayer};
pub use wal_writer::{WAL_FILE_NAME, WalWriter};

use crate::shared::storage_header::{FileKind, MagicFile};

/// Header identity of the write-ahead log file.
pub struct WalFile;

impl MagicFile for WalFile {
    const MAGIC: [u8; 8] = FileKind::Wal.magic();
}

#[cfg(test)]
mod wal_entry_test;
