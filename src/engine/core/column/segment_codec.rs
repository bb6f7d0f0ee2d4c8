use std::borrow::Cow;

use tracing::debug;

use crate::engine::core::column::compression::{CompressionScheme, LeSliceReader, SIZE_U32, codec_for};
use crate::engine::core::column::format::ColumnBlockHeader;
use crate::engine::core::vector::{NativeType, ValidityMask, Vector};
use crate::engine::errors::StorageError;
use crate::engine::types::{LogicalType, PhysicalType};

const CONTEXT: &str = "column segment";

/// Narrows a length written into a segment to its 32-bit on-disk field.
pub(crate) fn len_u32(what: &'static str, len: usize) -> Result<u32, StorageError> {
    u32::try_from(len).map_err(|_| StorageError::TooLarge { what, len })
}

/// Encodes the first `count` slots of `vector` as
/// `[ColumnBlockHeader][null bitmap if HAS_NULLS][body]`.
///
/// `Constant` is used when every non-null value is equal; otherwise the
/// preferred codec is kept only if it shrinks the body.
pub fn encode_segment(
    vector: &Vector,
    count: usize,
    preferred: CompressionScheme,
    zstd_level: i32,
) -> Result<Vec<u8>, StorageError> {
    let physical = vector.physical_type();
    let null_count = vector.validity().count_invalid(count);
    let has_nulls = null_count > 0;

    let (scheme, raw_len, body) = match encode_constant(vector, count)? {
        Some(body) => (CompressionScheme::Constant, body.len(), body),
        None => {
            let raw = encode_plain(vector, count)?;
            let raw_len = raw.len();
            match codec_for(preferred, zstd_level) {
                Some(codec) => match codec.compress(&raw) {
                    Ok(compressed) if compressed.len() < raw_len => (codec.scheme(), raw_len, compressed),
                    Ok(_) => (CompressionScheme::Uncompressed, raw_len, raw),
                    Err(e) => {
                        debug!(target: "segment_codec::encode", error = %e, "Codec failed, storing uncompressed");
                        (CompressionScheme::Uncompressed, raw_len, raw)
                    }
                },
                None => (CompressionScheme::Uncompressed, raw_len, raw),
            }
        }
    };

    let header = ColumnBlockHeader::new(
        physical,
        scheme,
        has_nulls,
        len_u32("segment row count", count)?,
        len_u32("segment body length", raw_len)?,
    );
    let bitmap_len = if has_nulls { count.div_ceil(8) } else { 0 };
    let mut out = Vec::with_capacity(ColumnBlockHeader::LEN + bitmap_len + body.len());
    header.write_to(&mut out);
    if has_nulls {
        out.extend_from_slice(&vector.validity().to_null_bitmap(count));
    }
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decodes a segment produced by [`encode_segment`]. Any inconsistency
/// between header, lengths and payload is reported as corruption.
pub fn decode_segment(bytes: &[u8], logical_type: &LogicalType) -> Result<Vector, StorageError> {
    let header = ColumnBlockHeader::read_from(bytes)
        .ok_or_else(|| StorageError::corruption(CONTEXT, "truncated or invalid block header"))?;
    let physical = logical_type.physical_type();
    if PhysicalType::try_from(header.phys) != Ok(physical) {
        return Err(StorageError::corruption(
            CONTEXT,
            format!("physical tag {} does not match {}", header.phys, physical),
        ));
    }
    let scheme = CompressionScheme::try_from(header.scheme)
        .map_err(|tag| StorageError::corruption(CONTEXT, format!("unknown compression tag {tag}")))?;
    let count = header.row_count as usize;
    let raw_len = header.raw_len as usize;

    let mut reader = LeSliceReader::new(&bytes[ColumnBlockHeader::LEN..]);
    let validity = if header.has_nulls() {
        let bits = reader
            .read_bytes(count.div_ceil(8))
            .ok_or_else(|| StorageError::corruption(CONTEXT, "truncated null bitmap"))?;
        ValidityMask::from_null_bitmap(bits, count, count)
    } else {
        ValidityMask::new(count)
    };
    let payload = reader.rest();

    let mut vector = Vector::new(logical_type.clone(), count);
    *vector.validity_mut() = validity;

    let body: Cow<'_, [u8]> = match codec_for(scheme, 0) {
        None => Cow::Borrowed(payload),
        Some(codec) => Cow::Owned(
            codec
                .decompress(payload, raw_len)
                .map_err(|e| StorageError::corruption(CONTEXT, e.to_string()))?,
        ),
    };
    if body.len() != raw_len {
        return Err(StorageError::corruption(
            CONTEXT,
            format!("body is {} bytes, header says {}", body.len(), raw_len),
        ));
    }

    if scheme == CompressionScheme::Constant {
        decode_constant(&mut vector, &body, count)?;
    } else {
        decode_plain(&mut vector, &body, count)?;
    }
    Ok(vector)
}

fn encode_plain(vector: &Vector, count: usize) -> Result<Vec<u8>, StorageError> {
    match vector.physical_type() {
        PhysicalType::Bool => Ok(encode_fixed::<bool>(vector, count)),
        PhysicalType::I8 => Ok(encode_fixed::<i8>(vector, count)),
        PhysicalType::I16 => Ok(encode_fixed::<i16>(vector, count)),
        PhysicalType::I32 => Ok(encode_fixed::<i32>(vector, count)),
        PhysicalType::I64 => Ok(encode_fixed::<i64>(vector, count)),
        PhysicalType::U64 => Ok(encode_fixed::<u64>(vector, count)),
        PhysicalType::F32 => Ok(encode_fixed::<f32>(vector, count)),
        PhysicalType::F64 => Ok(encode_fixed::<f64>(vector, count)),
        PhysicalType::VarBytes => {
            let strings = vector.strings().unwrap_or_default();
            let mut offsets = Vec::with_capacity((count + 1) * SIZE_U32);
            let mut data = Vec::new();
            offsets.extend_from_slice(&0u32.to_le_bytes());
            for (i, s) in strings.iter().take(count).enumerate() {
                if vector.is_valid(i) {
                    data.extend_from_slice(s.as_bytes());
                }
                offsets.extend_from_slice(&len_u32("segment string data", data.len())?.to_le_bytes());
            }
            offsets.extend_from_slice(&data);
            Ok(offsets)
        }
        PhysicalType::List => Err(StorageError::UnsupportedType(vector.logical_type().clone())),
    }
}

fn encode_fixed<T: NativeType>(vector: &Vector, count: usize) -> Vec<u8> {
    let values = vector.values::<T>().unwrap_or_default();
    let mut out = vec![0u8; count * T::WIDTH];
    for (i, v) in values.iter().take(count).enumerate() {
        let v = if vector.is_valid(i) { *v } else { T::default() };
        v.write_le(&mut out[i * T::WIDTH..]);
    }
    out
}

/// Body of a constant segment, or `None` when values differ. An all-NULL
/// segment is constant with an empty body.
fn encode_constant(vector: &Vector, count: usize) -> Result<Option<Vec<u8>>, StorageError> {
    if vector.physical_type() == PhysicalType::List {
        return Err(StorageError::UnsupportedType(vector.logical_type().clone()));
    }
    if count == 0 {
        return Ok(None);
    }
    let mut first = None;
    for i in 0..count {
        if !vector.is_valid(i) {
            continue;
        }
        let value = vector.get_value(i);
        match &first {
            None => first = Some(value),
            Some(f) if f.same_as(&value) => {}
            Some(_) => return Ok(None),
        }
    }
    let Some(value) = first else {
        return Ok(Some(Vec::new()));
    };
    let mut single = Vector::new(vector.logical_type().clone(), 1);
    single.set_value(0, &value)?;
    let body = match single.physical_type() {
        PhysicalType::VarBytes => {
            let s = single.strings().and_then(|s| s.first()).cloned().unwrap_or_default();
            let mut out = len_u32("constant string", s.len())?.to_le_bytes().to_vec();
            out.extend_from_slice(s.as_bytes());
            out
        }
        _ => encode_plain(&single, 1)?,
    };
    Ok(Some(body))
}

fn decode_plain(vector: &mut Vector, body: &[u8], count: usize) -> Result<(), StorageError> {
    match vector.physical_type() {
        PhysicalType::Bool => decode_fixed::<bool>(vector, body, count),
        PhysicalType::I8 => decode_fixed::<i8>(vector, body, count),
        PhysicalType::I16 => decode_fixed::<i16>(vector, body, count),
        PhysicalType::I32 => decode_fixed::<i32>(vector, body, count),
        PhysicalType::I64 => decode_fixed::<i64>(vector, body, count),
        PhysicalType::U64 => decode_fixed::<u64>(vector, body, count),
        PhysicalType::F32 => decode_fixed::<f32>(vector, body, count),
        PhysicalType::F64 => decode_fixed::<f64>(vector, body, count),
        PhysicalType::VarBytes => decode_strings(vector, body, count),
        PhysicalType::List => Err(StorageError::UnsupportedType(vector.logical_type().clone())),
    }
}

fn decode_fixed<T: NativeType>(vector: &mut Vector, body: &[u8], count: usize) -> Result<(), StorageError> {
    if body.len() != count * T::WIDTH {
        return Err(StorageError::corruption(
            CONTEXT,
            format!("{} value bytes for {} rows of width {}", body.len(), count, T::WIDTH),
        ));
    }
    let values = vector
        .values_mut::<T>()
        .ok_or_else(|| StorageError::corruption(CONTEXT, "vector type mismatch"))?;
    for (i, chunk) in body.chunks_exact(T::WIDTH).enumerate() {
        values[i] = T::read_le(chunk);
    }
    Ok(())
}

fn decode_strings(vector: &mut Vector, body: &[u8], count: usize) -> Result<(), StorageError> {
    let offsets_len = (count + 1) * SIZE_U32;
    let mut reader = LeSliceReader::new(body);
    let offsets = reader
        .read_bytes(offsets_len)
        .ok_or_else(|| StorageError::corruption(CONTEXT, "truncated string offsets"))?;
    let data = reader.rest();
    let strings = vector
        .strings_mut()
        .ok_or_else(|| StorageError::corruption(CONTEXT, "vector type mismatch"))?;

    let mut offsets = LeSliceReader::new(offsets);
    let mut start = offsets.read_u32().unwrap_or_default() as usize;
    for slot in strings.iter_mut().take(count) {
        let end = offsets.read_u32().unwrap_or_default() as usize;
        if end < start || end > data.len() {
            return Err(StorageError::corruption(
                CONTEXT,
                format!("string offsets {start}..{end} exceed {} bytes", data.len()),
            ));
        }
        *slot = std::str::from_utf8(&data[start..end])
            .map_err(|e| StorageError::corruption(CONTEXT, e.to_string()))?
            .to_owned();
        start = end;
    }
    if start != data.len() {
        return Err(StorageError::corruption(CONTEXT, "trailing string bytes"));
    }
    Ok(())
}

fn decode_constant(vector: &mut Vector, body: &[u8], count: usize) -> Result<(), StorageError> {
    if body.is_empty() {
        if vector.validity().count_invalid(count) != count {
            return Err(StorageError::corruption(CONTEXT, "empty constant body with non-null rows"));
        }
        return Ok(());
    }
    let mut single = Vector::new(vector.logical_type().clone(), 1);
    match single.physical_type() {
        PhysicalType::VarBytes => {
            let mut reader = LeSliceReader::new(body);
            let len = reader
                .read_u32()
                .ok_or_else(|| StorageError::corruption(CONTEXT, "truncated constant"))?;
            if reader.remaining() != len as usize {
                return Err(StorageError::corruption(CONTEXT, "constant string length mismatch"));
            }
            let mut offsets = 0u32.to_le_bytes().to_vec();
            offsets.extend_from_slice(&len.to_le_bytes());
            offsets.extend_from_slice(reader.rest());
            decode_strings(&mut single, &offsets, 1)?;
        }
        _ => decode_plain(&mut single, body, 1)?,
    }
    for i in 0..count {
        if vector.is_valid(i) {
            vector.copy_slot(i, &single, 0)?;
        }
    }
    Ok(())
}
