use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crc32fast::Hasher as Crc32Hasher;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::errors::StorageError;
use crate::shared::storage_header::{FileKind, MagicFile};

/// Bytes reserved at the start of a block file for its header.
pub const HEADER_AREA: u64 = 4096;
/// Per-block prefix: `crc32 u32 | used_len u32`.
pub const BLOCK_HEADER_LEN: usize = 8;
pub const MIN_BLOCK_SIZE: usize = 64;

/// Location of a payload: `block_count` consecutive blocks from `block_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPointer {
    pub block_id: u64,
    pub block_count: u32,
    pub length: u64,
}

struct BlockFile;

impl MagicFile for BlockFile {
    const MAGIC: [u8; 8] = FileKind::BlockFile.magic();
}

/// Fixed-size checksummed blocks in one checkpoint file.
///
/// Shared through `Arc` by every persistent segment pointing into the file,
/// so a superseded checkpoint stays readable until its last reader is gone.
pub struct BlockManager {
    path: PathBuf,
    block_size: usize,
    file: Mutex<BlockFileState>,
}

struct BlockFileState {
    file: File,
    block_count: u64,
}

impl std::fmt::Debug for BlockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockManager")
            .field("path", &self.path)
            .field("block_size", &self.block_size)
            .finish()
    }
}

impl BlockManager {
    pub fn create(path: &Path, block_size: usize) -> Result<Self, StorageError> {
        if block_size < MIN_BLOCK_SIZE || block_size > u32::MAX as usize {
            return Err(StorageError::corruption(
                path.display().to_string(),
                format!("invalid block size {block_size}"),
            ));
        }
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(path)?;
        let mut header = Vec::with_capacity(HEADER_AREA as usize);
        BlockFile::write_header(&mut header, block_size as u32)?;
        header.resize(HEADER_AREA as usize, 0);
        file.write_all(&header)?;

        info!(target: "block_manager::create", path = %path.display(), block_size, "Created block file");
        Ok(Self {
            path: path.to_path_buf(),
            block_size,
            file: Mutex::new(BlockFileState { file, block_count: 0 }),
        })
    }

    /// Opens an existing block file; a bad header or a partial trailing
    /// block is corruption.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let context = path.display().to_string();
        let (file, header) =
            BlockFile::open_existing(path).map_err(|e| StorageError::corruption(&context, e.to_string()))?;
        let block_size = header.reserved as usize;
        if block_size < MIN_BLOCK_SIZE {
            return Err(StorageError::corruption(&context, format!("invalid block size {block_size}")));
        }

        let len = file.metadata()?.len();
        if len < HEADER_AREA || (len - HEADER_AREA) % block_size as u64 != 0 {
            return Err(StorageError::corruption(
                &context,
                format!("file length {len} is not header plus whole blocks of {block_size}"),
            ));
        }
        let block_count = (len - HEADER_AREA) / block_size as u64;
        debug!(target: "block_manager::open", path = %context, block_size, block_count, "Opened block file");
        Ok(Self {
            path: path.to_path_buf(),
            block_size,
            file: Mutex::new(BlockFileState { file, block_count }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn block_count(&self) -> u64 {
        self.file.lock().block_count
    }

    fn capacity(&self) -> usize {
        self.block_size - BLOCK_HEADER_LEN
    }

    /// Appends `payload` to fresh blocks.
    pub fn write(&self, payload: &[u8]) -> Result<BlockPointer, StorageError> {
        let capacity = self.capacity();
        let needed = payload.len().div_ceil(capacity).max(1);
        let block_count = u32::try_from(needed).map_err(|_| StorageError::TooLarge {
            what: "block run",
            len: needed,
        })?;
        let mut buf = Vec::with_capacity(needed * self.block_size);
        for i in 0..needed {
            let part = &payload[(i * capacity).min(payload.len())..((i + 1) * capacity).min(payload.len())];
            let mut hasher = Crc32Hasher::new();
            hasher.update(part);
            buf.extend_from_slice(&hasher.finalize().to_le_bytes());
            buf.extend_from_slice(&(part.len() as u32).to_le_bytes());
            buf.extend_from_slice(part);
            buf.resize((i + 1) * self.block_size, 0);
        }

        let mut state = self.file.lock();
        let block_id = state.block_count;
        state
            .file
            .seek(SeekFrom::Start(HEADER_AREA + block_id * self.block_size as u64))?;
        state.file.write_all(&buf)?;
        state.block_count += needed as u64;
        Ok(BlockPointer {
            block_id,
            block_count,
            length: payload.len() as u64,
        })
    }

    /// Reads and verifies the payload at `ptr`.
    pub fn read(&self, ptr: BlockPointer) -> Result<Vec<u8>, StorageError> {
        let context = || format!("{} block {}", self.path.display(), ptr.block_id);
        let mut state = self.file.lock();
        if ptr.block_count == 0 || ptr.block_id + ptr.block_count as u64 > state.block_count {
            return Err(StorageError::corruption(
                context(),
                format!(
                    "blocks {}+{} beyond file of {} blocks",
                    ptr.block_id, ptr.block_count, state.block_count
                ),
            ));
        }

        let mut raw = vec![0u8; ptr.block_count as usize * self.block_size];
        state
            .file
            .seek(SeekFrom::Start(HEADER_AREA + ptr.block_id * self.block_size as u64))?;
        state.file.read_exact(&mut raw).map_err(|e| StorageError::corruption(context(), e.to_string()))?;
        drop(state);

        let mut out = Vec::with_capacity(ptr.length as usize);
        for block in raw.chunks_exact(self.block_size) {
            let crc = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
            let used = u32::from_le_bytes([block[4], block[5], block[6], block[7]]) as usize;
            if used > self.capacity() {
                return Err(StorageError::corruption(context(), format!("used length {used} exceeds block")));
            }
            let data = &block[BLOCK_HEADER_LEN..BLOCK_HEADER_LEN + used];
            let mut hasher = Crc32Hasher::new();
            hasher.update(data);
            if hasher.finalize() != crc {
                return Err(StorageError::corruption(context(), "checksum mismatch"));
            }
            out.extend_from_slice(data);
        }
        if out.len() as u64 != ptr.length {
            return Err(StorageError::corruption(
                context(),
                format!("read {} bytes, expected {}", out.len(), ptr.length),
            ));
        }
        Ok(out)
    }

    pub fn sync(&self) -> Result<(), StorageError> {
        let state = self.file.lock();
        state.file.sync_all()?;
        Ok(())
    }
}
