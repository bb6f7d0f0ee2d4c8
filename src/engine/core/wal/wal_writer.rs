use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::engine::core::wal::wal_frame::encode_frame;
use crate::engine::core::wal::{WalEntry, WalFile, WalReader};
use crate::engine::errors::WalError;
use crate::shared::config::WalConfig;
use crate::shared::storage_header::{BinaryHeader, MagicFile};

pub const WAL_FILE_NAME: &str = "strata.wal";

/// Appends framed entries to the single WAL file.
///
/// `durable_len` is the offset up to which the file holds complete,
/// flushed groups. A failed append truncates back to it, so a retried
/// commit never leaves duplicate entries behind.
pub struct WalWriter {
    path: PathBuf,
    file: File,
    durable_len: u64,
    fsync: bool,
    buffer_size: usize,
    #[cfg(test)]
    fail_after: Option<usize>,
}

impl WalWriter {
    /// Opens (or creates) `strata.wal` in `cfg.dir`, dropping any torn
    /// tail left by a crash.
    pub fn open(cfg: &WalConfig) -> Result<Self, WalError> {
        Self::open_in(Path::new(&cfg.dir), cfg)
    }

    pub fn open_in(dir: &Path, cfg: &WalConfig) -> Result<Self, WalError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(WAL_FILE_NAME);
        let scanned = WalReader::new(&path).read()?;

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)?;

        let durable_len = if scanned.valid_len < BinaryHeader::TOTAL_LEN as u64 {
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            WalFile::write_header(&mut file, 0)?;
            file.sync_data()?;
            BinaryHeader::TOTAL_LEN as u64
        } else {
            if scanned.torn_tail {
                warn!(
                    target: "wal_writer::open",
                    ?path, valid_len = scanned.valid_len,
                    "Truncating torn WAL tail"
                );
                file.set_len(scanned.valid_len)?;
                file.sync_data()?;
            }
            scanned.valid_len
        };
        file.seek(SeekFrom::Start(durable_len))?;

        info!(
            target: "wal_writer::open",
            ?path, len = durable_len, entries = scanned.entries.len(),
            "WAL opened"
        );
        Ok(Self {
            path,
            file,
            durable_len,
            fsync: cfg.fsync,
            buffer_size: cfg.buffer_size,
            #[cfg(test)]
            fail_after: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes of durable log, header included.
    pub fn len(&self) -> u64 {
        self.durable_len
    }

    pub fn is_empty(&self) -> bool {
        self.durable_len <= BinaryHeader::TOTAL_LEN as u64
    }

    /// Writes `entries` as one group and makes it durable before returning.
    pub fn append(&mut self, entries: &[WalEntry]) -> Result<(), WalError> {
        let mut buf = Vec::with_capacity(self.buffer_size);
        for entry in entries {
            encode_frame(entry, &mut buf)?;
        }
        if let Err(e) = self.write_durable(&buf) {
            warn!(
                target: "wal_writer::append",
                path = ?self.path, error = %e, durable_len = self.durable_len,
                "WAL append failed, truncating to last durable offset"
            );
            if let Err(reset) = self.reset_to_durable() {
                warn!(target: "wal_writer::append", error = %reset, "Could not truncate WAL after failed append");
            }
            return Err(e.into());
        }
        self.durable_len += buf.len() as u64;
        debug!(
            target: "wal_writer::append",
            entries = entries.len(), bytes = buf.len(), len = self.durable_len,
            "WAL group appended"
        );
        Ok(())
    }

    /// Makes the next append write only `bytes` of its group and then fail.
    #[cfg(test)]
    pub(crate) fn fail_next_append_after(&mut self, bytes: usize) {
        self.fail_after = Some(bytes);
    }

    fn write_durable(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.file.seek(SeekFrom::Start(self.durable_len))?;
        #[cfg(test)]
        if let Some(limit) = self.fail_after.take() {
            self.file.write_all(&buf[..limit.min(buf.len())])?;
            return Err(std::io::Error::other("injected write failure"));
        }
        self.file.write_all(buf)?;
        self.file.flush()?;
        if self.fsync {
            self.file.sync_data()?;
        }
        Ok(())
    }

    fn reset_to_durable(&mut self) -> std::io::Result<()> {
        self.file.set_len(self.durable_len)?;
        self.file.seek(SeekFrom::Start(self.durable_len))?;
        Ok(())
    }

    /// Cuts the log back to `len` bytes. Used after replay to drop a
    /// trailing group that never committed.
    pub fn truncate_to(&mut self, len: u64) -> Result<(), WalError> {
        if len >= self.durable_len || len < BinaryHeader::TOTAL_LEN as u64 {
            return Ok(());
        }
        warn!(
            target: "wal_writer::truncate_to",
            path = ?self.path, from = self.durable_len, to = len,
            "Dropping uncommitted WAL entries"
        );
        self.durable_len = len;
        self.reset_to_durable()?;
        self.file.sync_data()?;
        Ok(())
    }

    /// Drops every entry, keeping the header. Called once a checkpoint
    /// holds all committed state.
    pub fn truncate(&mut self) -> Result<(), WalError> {
        self.durable_len = BinaryHeader::TOTAL_LEN as u64;
        self.reset_to_durable()?;
        self.file.sync_data()?;
        info!(target: "wal_writer::truncate", path = ?self.path, "WAL truncated");
        Ok(())
    }
}
