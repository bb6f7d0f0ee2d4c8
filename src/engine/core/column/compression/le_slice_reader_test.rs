use crate::engine::core::column::compression::le_slice_reader::{
    LeSliceReader, SIZE_U32, SIZE_U64,
};

#[test]
fn reads_u32_and_advances() {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(0x11223344u32).to_le_bytes());
    buf.extend_from_slice(&(0x55667788u32).to_le_bytes());
    let mut r = LeSliceReader::new(&buf);

    assert!(r.has_bytes(SIZE_U32 * 2));
    assert_eq!(r.read_u32(), Some(0x11223344));
    assert_eq!(r.remaining(), SIZE_U32);
    assert_eq!(r.read_u32(), Some(0x55667788));
    assert!(r.read_u32().is_none());
}

#[test]
fn mixed_reads_stop_at_bounds() {
    let mut buf = vec![9u8];
    buf.extend_from_slice(&(7u64).to_le_bytes());
    buf.extend_from_slice(b"abc");
    let mut r = LeSliceReader::new(&buf);

    assert_eq!(r.read_u8(), Some(9));
    assert_eq!(r.read_u64(), Some(7));
    assert_eq!(r.position(), 1 + SIZE_U64);
    assert!(r.read_bytes(4).is_none());
    assert_eq!(r.read_bytes(2), Some(&b"ab"[..]));
    assert_eq!(r.rest(), b"c");
    assert_eq!(r.remaining(), 0);
    assert!(r.read_u8().is_none());
}
