use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::errors::StorageError;

use lz4_flex::block::{compress_prepend_size as lz4_compress, decompress as lz4_decompress};

/// How a segment body is stored. The tag is written into the block header.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionScheme {
    Uncompressed = 0,
    /// One value repeated for every non-null row.
    Constant = 1,
    Lz4 = 2,
    Zstd = 3,
}

impl TryFrom<u8> for CompressionScheme {
    type Error = u8;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(CompressionScheme::Uncompressed),
            1 => Ok(CompressionScheme::Constant),
            2 => Ok(CompressionScheme::Lz4),
            3 => Ok(CompressionScheme::Zstd),
            other => Err(other),
        }
    }
}

impl From<CompressionScheme> for u8 {
    fn from(s: CompressionScheme) -> u8 {
        s as u8
    }
}

impl fmt::Display for CompressionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompressionScheme::Uncompressed => "none",
            CompressionScheme::Constant => "constant",
            CompressionScheme::Lz4 => "lz4",
            CompressionScheme::Zstd => "zstd",
        };
        f.write_str(name)
    }
}

/// Parses the `storage.compression` setting. Only general-purpose codecs
/// can be configured; `Constant` is chosen per segment.
impl FromStr for CompressionScheme {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "uncompressed" => Ok(CompressionScheme::Uncompressed),
            "lz4" => Ok(CompressionScheme::Lz4),
            "zstd" => Ok(CompressionScheme::Zstd),
            other => Err(StorageError::Codec(format!("unknown compression '{other}'"))),
        }
    }
}

pub trait CompressionCodec {
    fn scheme(&self) -> CompressionScheme;
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, StorageError>;
    fn decompress(&self, input: &[u8], uncompressed_len: usize) -> Result<Vec<u8>, StorageError>;
}

pub struct Lz4Codec;

impl CompressionCodec for Lz4Codec {
    fn scheme(&self) -> CompressionScheme {
        CompressionScheme::Lz4
    }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, StorageError> {
        Ok(lz4_compress(input))
    }

    fn decompress(&self, input: &[u8], uncompressed_len: usize) -> Result<Vec<u8>, StorageError> {
        // The prepended size is checked before allocating.
        let Some((prefix, body)) = input.split_first_chunk::<4>() else {
            return Err(StorageError::Codec("lz4 block shorter than size prefix".into()));
        };
        let size = u32::from_le_bytes(*prefix) as usize;
        if size != uncompressed_len {
            return Err(StorageError::Codec(format!(
                "lz4 size prefix {size}, expected {uncompressed_len}"
            )));
        }
        let out = lz4_decompress(body, size).map_err(|e| StorageError::Codec(format!("lz4 decompress: {e}")))?;
        check_len(out, uncompressed_len)
    }
}

pub struct ZstdCodec {
    pub level: i32,
}

impl CompressionCodec for ZstdCodec {
    fn scheme(&self) -> CompressionScheme {
        CompressionScheme::Zstd
    }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, StorageError> {
        zstd::encode_all(input, self.level).map_err(|e| StorageError::Codec(format!("zstd compress: {e}")))
    }

    fn decompress(&self, input: &[u8], uncompressed_len: usize) -> Result<Vec<u8>, StorageError> {
        let out = zstd::decode_all(input).map_err(|e| StorageError::Codec(format!("zstd decompress: {e}")))?;
        check_len(out, uncompressed_len)
    }
}

/// Codec for a general-purpose scheme; `None` for `Uncompressed`/`Constant`.
pub fn codec_for(scheme: CompressionScheme, zstd_level: i32) -> Option<Box<dyn CompressionCodec>> {
    match scheme {
        CompressionScheme::Lz4 => Some(Box::new(Lz4Codec)),
        CompressionScheme::Zstd => Some(Box::new(ZstdCodec { level: zstd_level })),
        CompressionScheme::Uncompressed | CompressionScheme::Constant => None,
    }
}

fn check_len(out: Vec<u8>, expected: usize) -> Result<Vec<u8>, StorageError> {
    if out.len() != expected {
        return Err(StorageError::Codec(format!(
            "decompressed {} bytes, expected {}",
            out.len(),
            expected
        )));
    }
    Ok(out)
}
