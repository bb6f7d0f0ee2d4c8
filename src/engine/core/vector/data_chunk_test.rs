use crate::engine::core::vector::{DataChunk, SelectionVector};
use crate::engine::errors::VectorError;
use crate::engine::types::{LogicalType, ScalarValue};
use crate::test_helpers::factory::Factory;

#[test]
fn set_cardinality_does_not_reallocate() {
    let mut chunk = DataChunk::new(&[LogicalType::Integer, LogicalType::Varchar], 16);
    chunk.set_cardinality(10).unwrap();
    assert_eq!(chunk.cardinality(), 10);
    assert_eq!(chunk.capacity(), 16);
    assert_eq!(chunk.column(0).capacity(), 16);
    assert!(chunk.selection().is_none());
}

#[test]
fn set_cardinality_beyond_capacity_fails_and_keeps_state() {
    let mut chunk = DataChunk::new(&[LogicalType::Integer], 4);
    chunk.set_cardinality(3).unwrap();

    assert_eq!(
        chunk.set_cardinality(5),
        Err(VectorError::CapacityExceeded { capacity: 4 })
    );
    assert_eq!(chunk.cardinality(), 3);
}

#[test]
fn slice_filters_without_moving_data() {
    let mut chunk = Factory::chunk()
        .with_column(LogicalType::Integer)
        .with_rows(vec![
            vec![ScalarValue::Integer(10)],
            vec![ScalarValue::Integer(11)],
            vec![ScalarValue::Integer(12)],
            vec![ScalarValue::Integer(13)],
        ])
        .create();

    chunk.slice(&SelectionVector::from_indices(vec![1, 3])).unwrap();
    assert_eq!(chunk.cardinality(), 2);
    assert_eq!(chunk.get_value(0, 1), ScalarValue::Integer(13));
    // The physical buffer is untouched.
    assert_eq!(chunk.column(0).get_value(0), ScalarValue::Integer(10));

    chunk.slice(&SelectionVector::from_indices(vec![1])).unwrap();
    assert_eq!(chunk.row_index(0), 3);
    assert_eq!(chunk.rows(), vec![vec![ScalarValue::Integer(13)]]);
}

#[test]
fn slice_rejects_rows_beyond_cardinality() {
    let mut chunk = DataChunk::new(&[LogicalType::Integer], 8);
    chunk.set_cardinality(2).unwrap();
    assert!(matches!(
        chunk.slice(&SelectionVector::from_indices(vec![2])),
        Err(VectorError::IndexOutOfBounds { .. })
    ));
}

#[test]
fn append_row_grows_and_flattens_sliced_chunks() {
    let mut chunk = DataChunk::from_rows(
        &[LogicalType::BigInt, LogicalType::Varchar],
        &[
            vec![ScalarValue::BigInt(1), ScalarValue::from("a")],
            vec![ScalarValue::BigInt(2), ScalarValue::Null],
        ],
    )
    .unwrap();
    chunk.slice(&SelectionVector::from_indices(vec![1])).unwrap();
    chunk
        .append_row(&[ScalarValue::BigInt(3), ScalarValue::from("c")])
        .unwrap();

    assert!(chunk.selection().is_none());
    assert_eq!(
        chunk.rows(),
        vec![
            vec![ScalarValue::BigInt(2), ScalarValue::Null],
            vec![ScalarValue::BigInt(3), ScalarValue::from("c")],
        ]
    );
}

#[test]
fn append_row_checks_column_count() {
    let mut chunk = DataChunk::new(&[LogicalType::Integer], 1);
    assert_eq!(
        chunk.append_row(&[ScalarValue::Integer(1), ScalarValue::Integer(2)]),
        Err(VectorError::ColumnCount {
            expected: 1,
            actual: 2
        })
    );
}

#[test]
fn project_and_reset() {
    let mut chunk = Factory::chunk()
        .with_column(LogicalType::Integer)
        .with_column(LogicalType::Boolean)
        .with_rows(vec![vec![ScalarValue::Integer(1), ScalarValue::Boolean(true)]])
        .create();
    let projected = chunk.project(&[1]);
    assert_eq!(projected.column_count(), 1);
    assert_eq!(projected.get_value(0, 0), ScalarValue::Boolean(true));

    chunk.reset();
    assert!(chunk.is_empty());
}
