use crate::engine::core::vector::{SelectionVector, Vector};
use crate::engine::errors::VectorError;
use crate::engine::types::{LogicalType, ScalarValue};

#[test]
fn initialized_vector_is_all_valid_with_default_values() {
    let v = Vector::new(LogicalType::Integer, 8);
    assert_eq!(v.capacity(), 8);
    assert!(v.validity().all_valid());
    assert_eq!(v.values::<i32>(), Some(&[0i32; 8][..]));
    assert_eq!(v.values::<i64>(), None);
}

#[test]
fn set_and_get_values_with_nulls() {
    let mut v = Vector::new(LogicalType::Varchar, 3);
    v.set_value(0, &ScalarValue::from("a")).unwrap();
    v.set_value(1, &ScalarValue::Null).unwrap();
    v.set_value(2, &ScalarValue::from("c")).unwrap();
    assert_eq!(v.get_value(0), ScalarValue::from("a"));
    assert_eq!(v.get_value(1), ScalarValue::Null);
    assert_eq!(v.get_value(2), ScalarValue::from("c"));

    v.set_value(1, &ScalarValue::from("b")).unwrap();
    assert_eq!(v.get_value(1), ScalarValue::from("b"));
}

#[test]
fn set_value_rejects_mismatched_types_and_bounds() {
    let mut v = Vector::new(LogicalType::BigInt, 2);
    assert!(matches!(
        v.set_value(0, &ScalarValue::Integer(1)),
        Err(VectorError::TypeMismatch { .. })
    ));
    assert_eq!(
        v.set_value(2, &ScalarValue::BigInt(1)),
        Err(VectorError::IndexOutOfBounds {
            index: 2,
            capacity: 2
        })
    );
}

#[test]
fn list_vectors_store_entries_in_child() {
    let ty = LogicalType::List(Box::new(LogicalType::Integer));
    let mut v = Vector::new(ty, 2);
    let first = ScalarValue::List(vec![ScalarValue::Integer(1), ScalarValue::Integer(2)]);
    let second = ScalarValue::List(vec![
        ScalarValue::Integer(3),
        ScalarValue::Null,
        ScalarValue::Integer(5),
    ]);
    v.set_value(0, &first).unwrap();
    v.set_value(1, &second).unwrap();

    assert_eq!(v.get_value(0), first);
    assert_eq!(v.get_value(1), second);
    let entry = v.list_entry(1).unwrap();
    assert_eq!((entry.offset, entry.length), (2, 3));
    assert!(v.list_child().unwrap().capacity() >= 5);
}

#[test]
fn reset_restores_validity() {
    let mut v = Vector::new(LogicalType::Double, 4);
    v.set_null(2);
    assert!(!v.is_valid(2));
    v.reset();
    assert!(v.is_valid(2));
}

#[test]
fn copy_slot_copies_value_and_null() {
    let src = Vector::from_values(
        LogicalType::SmallInt,
        &[ScalarValue::SmallInt(7), ScalarValue::Null],
    )
    .unwrap();
    let mut dst = Vector::new(LogicalType::SmallInt, 2);
    dst.copy_slot(1, &src, 0).unwrap();
    dst.copy_slot(0, &src, 1).unwrap();
    assert_eq!(dst.get_value(0), ScalarValue::Null);
    assert_eq!(dst.get_value(1), ScalarValue::SmallInt(7));
}

#[test]
fn append_from_copies_selected_rows_and_grows() {
    let src = Vector::from_values(
        LogicalType::Varchar,
        &[
            ScalarValue::from("a"),
            ScalarValue::Null,
            ScalarValue::from("c"),
        ],
    )
    .unwrap();
    let mut dst = Vector::new(LogicalType::Varchar, 1);
    dst.set_value(0, &ScalarValue::from("x")).unwrap();

    let len = dst
        .append_from(1, &src, &SelectionVector::from_indices(vec![2, 1]))
        .unwrap();

    assert_eq!(len, 3);
    assert!(dst.capacity() >= 3);
    assert_eq!(dst.get_value(0), ScalarValue::from("x"));
    assert_eq!(dst.get_value(1), ScalarValue::from("c"));
    assert_eq!(dst.get_value(2), ScalarValue::Null);
}

#[test]
fn append_from_rejects_other_type_and_bad_selection() {
    let src = Vector::new(LogicalType::Integer, 2);
    let mut dst = Vector::new(LogicalType::BigInt, 2);
    assert!(matches!(
        dst.append_from(0, &src, &SelectionVector::identity(2)),
        Err(VectorError::TypeMismatch { .. })
    ));

    let mut same = Vector::new(LogicalType::Integer, 2);
    assert!(matches!(
        same.append_from(0, &src, &SelectionVector::from_indices(vec![5])),
        Err(VectorError::IndexOutOfBounds { .. })
    ));
}
