use std::sync::Arc;

use crate::engine::core::column::SegmentConfig;
use crate::engine::core::row::CompareOp;
use crate::engine::core::txn::{CancelHandle, LOCAL_ROW_START, LocalTableStorage, Snapshot};
use crate::engine::errors::{StorageError, TransactionError};
use crate::engine::storage::{ColumnDefinition, DataTable, ScanChunk, TableFilter, TableScan};
use crate::engine::types::{LogicalType, ScalarValue};
use crate::test_helpers::factory::Factory;

fn table(rows: usize) -> Arc<DataTable> {
    let t = DataTable::new(
        "metrics",
        vec![
            ColumnDefinition::new("id", LogicalType::Integer),
            ColumnDefinition::new("name", LogicalType::Varchar),
        ],
        SegmentConfig {
            capacity: 4,
            ..SegmentConfig::default()
        },
    )
    .unwrap();
    let chunk = Factory::chunk().with_sequential(0, rows).create();
    t.append_rows(&chunk.rows(), 1).unwrap();
    Arc::new(t)
}

fn row_ids(chunks: &[ScanChunk]) -> Vec<u64> {
    chunks.iter().flat_map(|c| c.row_ids.iter().copied()).collect()
}

fn values(chunks: &[ScanChunk]) -> Vec<Vec<ScalarValue>> {
    chunks.iter().flat_map(ScanChunk::rows).collect()
}

#[test]
fn scan_returns_all_visible_rows_in_order() {
    let t = table(10);

    let chunks = TableScan::new(&t, Snapshot::committed(), &[0, 1], &[])
        .unwrap()
        .execute()
        .unwrap();

    assert_eq!(row_ids(&chunks), (0..10).collect::<Vec<u64>>());
    assert_eq!(values(&chunks)[7], vec![ScalarValue::Integer(7), ScalarValue::Varchar("v7".into())]);
}

#[test]
fn chunks_never_cross_segment_boundaries() {
    let t = table(10);

    let chunks = TableScan::new(&t, Snapshot::committed(), &[0], &[])
        .unwrap()
        .with_vector_size(3)
        .execute()
        .unwrap();

    let sizes: Vec<usize> = chunks.iter().map(ScanChunk::len).collect();
    assert_eq!(sizes, vec![3, 1, 3, 1, 2]);
}

#[test]
fn snapshot_hides_later_and_deleted_rows() {
    let t = table(4);
    t.append_rows(&Factory::chunk().with_sequential(4, 2).create().rows(), 5)
        .unwrap();
    t.delete_committed(&[1], 3).unwrap();

    let chunks = TableScan::new(&t, Snapshot::new(4, 0), &[0], &[])
        .unwrap()
        .execute()
        .unwrap();

    assert_eq!(row_ids(&chunks), vec![0, 2, 3]);
}

#[test]
fn filters_prune_segments_and_rows() {
    let t = table(12);
    let filters = [TableFilter::new(0, CompareOp::GreaterThanOrEqual, 6)];

    let chunks = TableScan::new(&t, Snapshot::committed(), &[1], &filters)
        .unwrap()
        .execute()
        .unwrap();

    assert_eq!(row_ids(&chunks), vec![6, 7, 8, 9, 10, 11]);
    assert_eq!(chunks.len(), 2);
    assert_eq!(values(&chunks)[0], vec![ScalarValue::Varchar("v6".into())]);
}

#[test]
fn filters_see_updated_values() {
    let t = table(4);
    t.update_committed(0, &[2], &[ScalarValue::Integer(100)], 2).unwrap();
    let filters = [TableFilter::new(0, CompareOp::GreaterThan, 50)];

    let before = TableScan::new(&t, Snapshot::new(1, 0), &[0], &filters)
        .unwrap()
        .execute()
        .unwrap();
    let after = TableScan::new(&t, Snapshot::committed(), &[0], &filters)
        .unwrap()
        .execute()
        .unwrap();

    assert!(before.is_empty());
    assert_eq!(row_ids(&after), vec![2]);
}

#[test]
fn empty_projection_still_reports_row_ids() {
    let t = table(6);
    let filters = [TableFilter::new(1, CompareOp::Equal, "v3")];

    let chunks = TableScan::new(&t, Snapshot::committed(), &[], &filters)
        .unwrap()
        .execute()
        .unwrap();

    assert_eq!(row_ids(&chunks), vec![3]);
    assert_eq!(chunks[0].chunk.column_count(), 0);
}

#[test]
fn parallel_scan_matches_serial_scan() {
    let t = table(300);
    let filters = [TableFilter::new(0, CompareOp::NotEqual, 150)];
    let scan = TableScan::new(&t, Snapshot::committed(), &[0, 1], &filters)
        .unwrap()
        .with_vector_size(16);

    let serial = scan.execute().unwrap();
    let parallel = scan.execute_parallel().unwrap();

    assert_eq!(row_ids(&parallel), row_ids(&serial));
    assert_eq!(values(&parallel), values(&serial));
    assert_eq!(serial.iter().map(ScanChunk::len).sum::<usize>(), 299);
}

#[test]
fn local_rows_follow_committed_rows() {
    let t = table(3);
    let mut local = LocalTableStorage::new(Arc::clone(&t));
    local
        .append(&Factory::chunk().with_sequential(100, 3).create())
        .unwrap();
    local.delete(1);

    let chunks = TableScan::new(&t, Snapshot::committed(), &[0], &[])
        .unwrap()
        .with_local(Some(&local))
        .execute()
        .unwrap();

    assert_eq!(
        row_ids(&chunks),
        vec![0, 1, 2, LOCAL_ROW_START, LOCAL_ROW_START + 2]
    );
    assert_eq!(values(&chunks)[4], vec![ScalarValue::Integer(102)]);
}

#[test]
fn cancelled_scan_stops() {
    let t = table(8);
    let cancel = CancelHandle::new();
    cancel.cancel();

    let err = TableScan::new(&t, Snapshot::committed(), &[0], &[])
        .unwrap()
        .with_cancel(&cancel)
        .execute()
        .unwrap_err();

    assert!(matches!(err, TransactionError::Cancelled));
}

#[test]
fn unknown_projection_column_is_rejected() {
    let t = table(2);

    let err = TableScan::new(&t, Snapshot::committed(), &[0, 5], &[]).err().unwrap();

    assert!(matches!(err, StorageError::ColumnOutOfRange { column: 5, .. }));
}

#[test]
fn out_of_range_constants_fold_instead_of_failing() {
    let t = table(6);

    let all = TableScan::new(
        &t,
        Snapshot::committed(),
        &[0],
        &[TableFilter::new(0, CompareOp::LessThan, 5_000_000_000i64)],
    )
    .unwrap()
    .execute()
    .unwrap();
    let none = TableScan::new(
        &t,
        Snapshot::committed(),
        &[0],
        &[TableFilter::new(0, CompareOp::GreaterThan, 5_000_000_000i64)],
    )
    .unwrap()
    .execute()
    .unwrap();

    assert_eq!(row_ids(&all), (0..6).collect::<Vec<u64>>());
    assert!(none.is_empty());
}

#[test]
fn column_projected_twice_appears_twice() {
    let t = table(3);

    let chunks = TableScan::new(&t, Snapshot::committed(), &[1, 0, 1], &[TableFilter::new(0, CompareOp::GreaterThan, 0)])
        .unwrap()
        .execute()
        .unwrap();

    assert_eq!(
        values(&chunks)[0],
        vec![ScalarValue::from("v1"), ScalarValue::Integer(1), ScalarValue::from("v1")]
    );
}
