pub mod compression_codec;
pub mod le_slice_reader;

pub use compression_codec::{CompressionCodec, CompressionScheme, Lz4Codec, ZstdCodec, codec_for};
pub use le_slice_reader::{LeSliceReader, SIZE_U32, SIZE_U64};

#[cfg(test)]
mod le_slice_reader_test;
