use crate::engine::types::{LogicalType, ScalarValue};
use crate::test_helpers::factory::Factory;

#[test]
fn sequential_rows_follow_column_types() {
    let chunk = Factory::chunk()
        .with_types(vec![LogicalType::BigInt, LogicalType::Varchar])
        .with_sequential(5, 3)
        .create();

    assert_eq!(chunk.cardinality(), 3);
    assert_eq!(
        chunk.row(0),
        vec![ScalarValue::BigInt(5), ScalarValue::Varchar("v5".into())]
    );
    assert_eq!(chunk.get_value(0, 2), ScalarValue::BigInt(7));
}

#[test]
fn explicit_rows_keep_nulls() {
    let chunk = Factory::chunk()
        .with_row(vec![ScalarValue::Integer(1), ScalarValue::Null])
        .create();

    assert_eq!(chunk.get_value(1, 0), ScalarValue::Null);
}

#[test]
fn with_column_replaces_defaults_then_accumulates() {
    let factory = Factory::chunk()
        .with_column(LogicalType::Integer)
        .with_column(LogicalType::Varchar)
        .with_column(LogicalType::Double);

    assert_eq!(
        factory.types(),
        &[LogicalType::Integer, LogicalType::Varchar, LogicalType::Double]
    );
    assert_eq!(
        Factory::chunk().with_column(LogicalType::Boolean).types(),
        &[LogicalType::Boolean]
    );
}
