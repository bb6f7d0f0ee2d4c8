use crate::engine::core::column::compression::CompressionScheme;
use crate::engine::core::column::format::ColumnBlockHeader;
use crate::engine::core::column::segment_codec::{decode_segment, encode_segment, len_u32};
use crate::engine::errors::StorageError;
use crate::engine::core::vector::Vector;
use crate::engine::types::{LogicalType, ScalarValue};

fn vector(ty: LogicalType, values: Vec<ScalarValue>) -> Vector {
    Vector::from_values(ty, &values).unwrap()
}

fn scheme_of(bytes: &[u8]) -> CompressionScheme {
    CompressionScheme::try_from(ColumnBlockHeader::read_from(bytes).unwrap().scheme).unwrap()
}

#[test]
fn constant_segments_store_one_value() {
    let v = vector(LogicalType::Integer, vec![ScalarValue::Integer(7); 1000]);
    let bytes = encode_segment(&v, 1000, CompressionScheme::Lz4, 3).unwrap();
    assert_eq!(scheme_of(&bytes), CompressionScheme::Constant);
    assert_eq!(bytes.len(), ColumnBlockHeader::LEN + 4);

    let decoded = decode_segment(&bytes, &LogicalType::Integer).unwrap();
    assert_eq!(decoded.capacity(), 1000);
    assert_eq!(decoded.get_value(999), ScalarValue::Integer(7));
}

#[test]
fn constant_with_nulls_keeps_bitmap() {
    let values = vec![
        ScalarValue::from("same"),
        ScalarValue::Null,
        ScalarValue::from("same"),
    ];
    let v = vector(LogicalType::Varchar, values.clone());
    let bytes = encode_segment(&v, 3, CompressionScheme::Zstd, 3).unwrap();
    assert_eq!(scheme_of(&bytes), CompressionScheme::Constant);
    let decoded = decode_segment(&bytes, &LogicalType::Varchar).unwrap();
    for (i, value) in values.iter().enumerate() {
        assert_eq!(&decoded.get_value(i), value);
    }
}

#[test]
fn all_null_segment_has_empty_body() {
    let v = vector(LogicalType::Double, vec![ScalarValue::Null; 5]);
    let bytes = encode_segment(&v, 5, CompressionScheme::Lz4, 3).unwrap();
    assert_eq!(bytes.len(), ColumnBlockHeader::LEN + 1);
    let decoded = decode_segment(&bytes, &LogicalType::Double).unwrap();
    assert_eq!(decoded.validity().count_invalid(5), 5);
}

#[test]
fn compressible_data_uses_codec_and_random_like_data_does_not() {
    let repetitive: Vec<ScalarValue> = (0..4096).map(|i| ScalarValue::BigInt(i % 4)).collect();
    let v = vector(LogicalType::BigInt, repetitive.clone());
    for scheme in [CompressionScheme::Lz4, CompressionScheme::Zstd] {
        let bytes = encode_segment(&v, repetitive.len(), scheme, 3).unwrap();
        assert_eq!(scheme_of(&bytes), scheme);
        let decoded = decode_segment(&bytes, &LogicalType::BigInt).unwrap();
        assert_eq!(decoded.get_value(4095), ScalarValue::BigInt(3));
    }

    let few = vector(LogicalType::TinyInt, vec![ScalarValue::TinyInt(1), ScalarValue::TinyInt(2)]);
    let bytes = encode_segment(&few, 2, CompressionScheme::Lz4, 3).unwrap();
    assert_eq!(scheme_of(&bytes), CompressionScheme::Uncompressed);
}

#[test]
fn strings_with_nulls_survive() {
    let values = vec![
        ScalarValue::from("alpha"),
        ScalarValue::Null,
        ScalarValue::from(""),
        ScalarValue::from("ünïcödé"),
    ];
    let v = vector(LogicalType::Varchar, values.clone());
    let bytes = encode_segment(&v, 4, CompressionScheme::Uncompressed, 3).unwrap();
    let decoded = decode_segment(&bytes, &LogicalType::Varchar).unwrap();
    for (i, value) in values.iter().enumerate() {
        assert_eq!(&decoded.get_value(i), value);
    }
}

#[test]
fn truncated_or_mismatched_input_is_corruption() {
    let values: Vec<ScalarValue> = (0..64).map(ScalarValue::Integer).collect();
    let v = vector(LogicalType::Integer, values);
    let bytes = encode_segment(&v, 64, CompressionScheme::Uncompressed, 3).unwrap();

    assert!(decode_segment(&bytes[..5], &LogicalType::Integer).unwrap_err().is_corruption());
    assert!(decode_segment(&bytes[..bytes.len() - 1], &LogicalType::Integer).unwrap_err().is_corruption());
    assert!(decode_segment(&bytes, &LogicalType::BigInt).unwrap_err().is_corruption());

    let mut bad_scheme = bytes.clone();
    bad_scheme[2] = 9;
    assert!(decode_segment(&bad_scheme, &LogicalType::Integer).unwrap_err().is_corruption());
}

#[test]
fn damaged_compressed_body_is_corruption() {
    let values: Vec<ScalarValue> = (0..2048).map(|i| ScalarValue::Integer(i % 3)).collect();
    let v = vector(LogicalType::Integer, values);
    let mut bytes = encode_segment(&v, 2048, CompressionScheme::Lz4, 3).unwrap();
    let last = bytes.len() - 1;
    bytes.truncate(last - 3);
    assert!(decode_segment(&bytes, &LogicalType::Integer).unwrap_err().is_corruption());
}

#[test]
fn lists_are_rejected() {
    let ty = LogicalType::List(Box::new(LogicalType::Integer));
    let v = Vector::new(ty, 1);
    assert!(encode_segment(&v, 1, CompressionScheme::Lz4, 3).is_err());
}

#[test]
fn lengths_past_32_bits_are_rejected() {
    assert_eq!(len_u32("segment row count", 7).unwrap(), 7);
    assert!(matches!(
        len_u32("segment body length", u32::MAX as usize + 1),
        Err(StorageError::TooLarge {
            what: "segment body length",
            ..
        })
    ));
}
