use crate::engine::core::wal::wal_frame::{FRAME_HEADER_LEN, FrameHeader, encode_frame};
use crate::engine::core::wal::{WalEntry, WalEntryKind};
use crate::engine::storage::ColumnDefinition;
use crate::engine::types::{LogicalType, ScalarValue};

#[test]
fn kind_tags_are_stable() {
    assert_eq!(WalEntryKind::CreateTable as u8, 1);
    assert_eq!(WalEntryKind::Commit as u8, 7);
    assert_eq!(WalEntryKind::try_from(5), Ok(WalEntryKind::Update));
    assert_eq!(WalEntryKind::try_from(0), Err(0));
    assert_eq!(WalEntryKind::try_from(8), Err(8));
}

#[test]
fn entry_kind_matches_variant() {
    let entry = WalEntry::Update {
        table: "t".into(),
        column: 1,
        rows: vec![3],
        values: vec![ScalarValue::Null],
    };
    assert_eq!(entry.kind(), WalEntryKind::Update);
    assert_eq!(WalEntry::Checkpoint { iteration: 2 }.kind(), WalEntryKind::Checkpoint);
}

#[test]
fn payload_decodes_to_same_entry() {
    let entry = WalEntry::CreateTable {
        name: "events".into(),
        columns: vec![
            ColumnDefinition::new("id", LogicalType::BigInt),
            ColumnDefinition::new("tag", LogicalType::Varchar),
        ],
    };

    let decoded = WalEntry::decode(&entry.encode().unwrap()).unwrap();

    assert_eq!(decoded, entry);
}

#[test]
fn frame_header_describes_payload() {
    let entry = WalEntry::Insert {
        table: "t".into(),
        rows: vec![vec![ScalarValue::Integer(1), ScalarValue::Varchar("a".into())]],
    };
    let mut buf = Vec::new();

    encode_frame(&entry, &mut buf).unwrap();
    let header = FrameHeader::parse(&buf).unwrap();
    let payload = &buf[FRAME_HEADER_LEN..];

    assert_eq!(header.kind, WalEntryKind::Insert as u8);
    assert_eq!(header.len as usize, payload.len());
    assert_eq!(header.crc, crc32fast::hash(payload));
}

#[test]
fn short_frame_header_is_not_parsed() {
    assert!(FrameHeader::parse(&[3, 0, 0]).is_none());
}
