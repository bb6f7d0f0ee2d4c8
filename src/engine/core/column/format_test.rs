use crate::engine::core::column::compression::CompressionScheme;
use crate::engine::core::column::format::{BlockFlags, ColumnBlockHeader};
use crate::engine::types::PhysicalType;

#[test]
fn header_len_is_twelve_bytes() {
    assert_eq!(ColumnBlockHeader::LEN, 12);
}

#[test]
fn header_write_read_roundtrip() {
    let hdr = ColumnBlockHeader::new(PhysicalType::I32, CompressionScheme::Zstd, true, 77, 308);
    let mut buf = Vec::new();
    hdr.write_to(&mut buf);
    assert_eq!(buf.len(), ColumnBlockHeader::LEN);

    let parsed = ColumnBlockHeader::read_from(&buf).unwrap();
    assert_eq!(parsed, hdr);
    assert!(parsed.has_nulls());
    assert!(parsed.flags.contains(BlockFlags::COMPRESSED));
    assert_eq!(PhysicalType::try_from(parsed.phys), Ok(PhysicalType::I32));
}

#[test]
fn constant_scheme_is_not_flagged_compressed() {
    let hdr = ColumnBlockHeader::new(PhysicalType::VarBytes, CompressionScheme::Constant, false, 3, 9);
    assert!(!hdr.flags.contains(BlockFlags::COMPRESSED));
    assert!(!hdr.has_nulls());
}

#[test]
fn short_or_unknown_flags_are_rejected() {
    let hdr = ColumnBlockHeader::new(PhysicalType::I64, CompressionScheme::Uncompressed, false, 1, 8);
    let mut buf = Vec::new();
    hdr.write_to(&mut buf);
    assert!(ColumnBlockHeader::read_from(&buf[..11]).is_none());
    buf[1] = 0b1000_0000;
    assert!(ColumnBlockHeader::read_from(&buf).is_none());
}
