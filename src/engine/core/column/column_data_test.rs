use crate::engine::core::column::compression::CompressionScheme;
use crate::engine::core::column::{ColumnData, SegmentConfig};
use crate::engine::core::txn::{Snapshot, TRANSACTION_ID_START};
use crate::engine::core::vector::Vector;
use crate::engine::types::{LogicalType, ScalarValue};

fn config(capacity: usize) -> SegmentConfig {
    SegmentConfig {
        capacity,
        compression: CompressionScheme::Lz4,
        zstd_level: 3,
    }
}

fn bigints(range: std::ops::Range<i64>) -> Vector {
    let values: Vec<ScalarValue> = range.map(ScalarValue::BigInt).collect();
    Vector::from_values(LogicalType::BigInt, &values).unwrap()
}

#[test]
fn append_splits_into_sealed_segments() {
    let mut column = ColumnData::new(LogicalType::BigInt, config(4)).unwrap();
    let source = bigints(0..10);
    column.append(&source, &(0..10).collect::<Vec<_>>()).unwrap();

    assert_eq!(column.row_count(), 10);
    let segments = column.segments();
    assert_eq!(segments.len(), 3);
    assert!(!segments[0].is_transient());
    assert!(!segments[1].is_transient());
    assert!(segments[2].is_transient());
    assert_eq!(segments[2].start(), 8);
    assert_eq!(column.segment_index(7), Some(1));
    assert_eq!(column.segment_index(10), None);
}

#[test]
fn scan_crosses_segment_boundaries() {
    let mut column = ColumnData::new(LogicalType::BigInt, config(3)).unwrap();
    column.append(&bigints(0..8), &(0..8).collect::<Vec<_>>()).unwrap();

    let out = column.scan(2, 5, &Snapshot::committed()).unwrap();
    let values: Vec<ScalarValue> = (0..5).map(|i| out.get_value(i)).collect();
    assert_eq!(values, (2..7).map(ScalarValue::BigInt).collect::<Vec<_>>());
    assert!(column.scan(6, 5, &Snapshot::committed()).is_err());
}

#[test]
fn append_through_selection_order() {
    let mut column = ColumnData::new(LogicalType::BigInt, config(16)).unwrap();
    column.append(&bigints(0..5), &[4, 0, 2]).unwrap();
    let out = column.scan(0, 3, &Snapshot::committed()).unwrap();
    assert_eq!(out.get_value(0), ScalarValue::BigInt(4));
    assert_eq!(out.get_value(2), ScalarValue::BigInt(2));
}

#[test]
fn update_commit_and_revert() {
    let txn = TRANSACTION_ID_START + 1;
    let mut column = ColumnData::new(LogicalType::BigInt, config(2)).unwrap();
    column.append(&bigints(0..4), &[0, 1, 2, 3]).unwrap();

    column.update(3, txn, ScalarValue::BigInt(-3)).unwrap();
    assert_eq!(column.latest_update_version(3), Some(txn));
    assert_eq!(column.fetch(3, &Snapshot::new(0, txn)).unwrap(), ScalarValue::BigInt(-3));
    assert_eq!(column.fetch(3, &Snapshot::committed()).unwrap(), ScalarValue::BigInt(3));

    column.commit_update(3, txn, 1).unwrap();
    assert_eq!(column.fetch(3, &Snapshot::committed()).unwrap(), ScalarValue::BigInt(-3));

    column.update(0, txn + 1, ScalarValue::Null).unwrap();
    assert_eq!(column.revert_update(0, txn + 1).unwrap(), Some(ScalarValue::Null));
    assert_eq!(column.fetch(0, &Snapshot::new(0, txn + 1)).unwrap(), ScalarValue::BigInt(0));

    assert!(column.update(0, txn, ScalarValue::from("x")).is_err());
    assert!(column.update(9, txn, ScalarValue::BigInt(1)).is_err());
}

#[test]
fn from_segments_rejects_gaps() {
    let mut a = ColumnData::new(LogicalType::BigInt, config(2)).unwrap();
    a.append(&bigints(0..4), &[0, 1, 2, 3]).unwrap();
    let config = a.config();
    let seg = crate::engine::core::column::ColumnSegment::transient(LogicalType::BigInt, 5, 2).unwrap();
    assert!(ColumnData::from_segments(LogicalType::BigInt, config, vec![seg]).is_err());
}
