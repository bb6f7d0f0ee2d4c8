use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crc32fast::Hasher as Crc32Hasher;

/// Fixed 20-byte header at the start of every file the engine owns:
/// `[magic 8][version u16][flags u16][reserved u32][crc32 u32]`, little
/// endian, the CRC covering the first 16 bytes.
///
/// `reserved` carries a per-kind parameter (the block size for block files).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryHeader {
    pub magic: [u8; 8],
    pub version: u16,
    pub flags: u16,
    pub reserved: u32,
    pub header_crc32: u32,
}

fn invalid(reason: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, reason.to_string())
}

impl BinaryHeader {
    pub const LEN_WITHOUT_CRC: usize = 16;
    pub const TOTAL_LEN: usize = Self::LEN_WITHOUT_CRC + 4;

    pub fn new(magic: [u8; 8], version: u16, flags: u16) -> Self {
        Self::with_reserved(magic, version, flags, 0)
    }

    pub fn with_reserved(magic: [u8; 8], version: u16, flags: u16, reserved: u32) -> Self {
        let mut header = Self {
            magic,
            version,
            flags,
            reserved,
            header_crc32: 0,
        };
        header.header_crc32 = crc32fast::hash(&header.body());
        header
    }

    fn body(&self) -> [u8; Self::LEN_WITHOUT_CRC] {
        let mut body = [0u8; Self::LEN_WITHOUT_CRC];
        body[..8].copy_from_slice(&self.magic);
        body[8..10].copy_from_slice(&self.version.to_le_bytes());
        body[10..12].copy_from_slice(&self.flags.to_le_bytes());
        body[12..16].copy_from_slice(&self.reserved.to_le_bytes());
        body
    }

    pub fn encode(&self) -> [u8; Self::TOTAL_LEN] {
        let mut out = [0u8; Self::TOTAL_LEN];
        out[..Self::LEN_WITHOUT_CRC].copy_from_slice(&self.body());
        out[Self::LEN_WITHOUT_CRC..].copy_from_slice(&self.header_crc32.to_le_bytes());
        out
    }

    /// Parses and checks the CRC of an encoded header.
    pub fn decode(buf: &[u8; Self::TOTAL_LEN]) -> io::Result<Self> {
        let le_u16 = |at: usize| u16::from_le_bytes([buf[at], buf[at + 1]]);
        let le_u32 = |at: usize| u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]);
        let mut magic = [0u8; 8];
        magic.copy_from_slice(&buf[..8]);
        let header = Self {
            magic,
            version: le_u16(8),
            flags: le_u16(10),
            reserved: le_u32(12),
            header_crc32: le_u32(16),
        };
        let mut hasher = Crc32Hasher::new();
        hasher.update(&buf[..Self::LEN_WITHOUT_CRC]);
        if hasher.finalize() != header.header_crc32 {
            return Err(invalid("header CRC mismatch"));
        }
        Ok(header)
    }

    pub fn write_to<W: Write>(&self, mut w: W) -> io::Result<()> {
        w.write_all(&self.encode())
    }

    pub fn read_from<R: Read>(mut r: R) -> io::Result<Self> {
        let mut buf = [0u8; Self::TOTAL_LEN];
        r.read_exact(&mut buf)?;
        Self::decode(&buf)
    }
}

/// A file kind identified by its magic and format version.
pub trait MagicFile {
    const MAGIC: [u8; 8];
    const VERSION: u16 = 1;

    fn write_header<W: Write>(writer: &mut W, reserved: u32) -> io::Result<()> {
        BinaryHeader::with_reserved(Self::MAGIC, Self::VERSION, 0, reserved).write_to(writer)
    }

    fn read_and_validate_header<R: Read>(reader: &mut R) -> io::Result<BinaryHeader> {
        let header = BinaryHeader::read_from(reader)?;
        if header.magic != Self::MAGIC {
            return Err(invalid("invalid magic"));
        }
        if header.version != Self::VERSION {
            return Err(invalid("unsupported version"));
        }
        Ok(header)
    }

    /// Opens an existing file read-only and validates its header. The
    /// cursor is left just past the header.
    fn open_existing(path: &Path) -> io::Result<(File, BinaryHeader)> {
        let mut file = File::open(path)?;
        if file.metadata()?.len() < BinaryHeader::TOTAL_LEN as u64 {
            return Err(invalid("file too small for header"));
        }
        file.seek(SeekFrom::Start(0))?;
        let header = Self::read_and_validate_header(&mut file)?;
        Ok((file, header))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    BlockFile,
    Wal,
}

impl FileKind {
    pub const fn magic(&self) -> [u8; 8] {
        match self {
            FileKind::BlockFile => *b"STRDBBLK",
            FileKind::Wal => *b"STRDBWAL",
        }
    }
}
