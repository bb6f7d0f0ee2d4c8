use std::cmp::Ordering;

use crate::engine::core::row::CompareOp;
use crate::engine::errors::MatchError;

#[test]
fn standard_ops_follow_ordering() {
    assert!(CompareOp::Equal.apply(Ordering::Equal));
    assert!(!CompareOp::Equal.apply(Ordering::Less));
    assert!(CompareOp::NotEqual.apply(Ordering::Greater));
    assert!(CompareOp::LessThan.apply(Ordering::Less));
    assert!(CompareOp::LessThanOrEqual.apply(Ordering::Equal));
    assert!(!CompareOp::GreaterThan.apply(Ordering::Equal));
    assert!(CompareOp::GreaterThanOrEqual.apply(Ordering::Greater));
}

#[test]
fn null_policy_per_operator() {
    for op in [
        CompareOp::Equal,
        CompareOp::NotEqual,
        CompareOp::LessThan,
        CompareOp::GreaterThanOrEqual,
    ] {
        assert!(!op.apply_nulls(true, true), "{:?}", op);
        assert!(!op.apply_nulls(true, false), "{:?}", op);
    }
    assert!(CompareOp::NotDistinctFrom.apply_nulls(true, true));
    assert!(!CompareOp::NotDistinctFrom.apply_nulls(false, true));
    assert!(CompareOp::DistinctFrom.apply_nulls(true, false));
    assert!(!CompareOp::DistinctFrom.apply_nulls(true, true));
}

#[test]
fn flip_swaps_operand_order() {
    assert_eq!(CompareOp::LessThan.flip(), CompareOp::GreaterThan);
    assert_eq!(CompareOp::GreaterThanOrEqual.flip(), CompareOp::LessThanOrEqual);
    assert_eq!(CompareOp::Equal.flip(), CompareOp::Equal);
    for op in [CompareOp::LessThan, CompareOp::LessThanOrEqual, CompareOp::NotEqual] {
        for ord in [Ordering::Less, Ordering::Equal, Ordering::Greater] {
            assert_eq!(op.apply(ord), op.flip().apply(ord.reverse()));
        }
    }
}

#[test]
fn parses_symbols() {
    assert_eq!("<=".parse::<CompareOp>().unwrap(), CompareOp::LessThanOrEqual);
    assert_eq!("!=".parse::<CompareOp>().unwrap(), CompareOp::NotEqual);
    assert_eq!(
        "is not distinct from".parse::<CompareOp>().unwrap(),
        CompareOp::NotDistinctFrom
    );
    assert!(matches!(
        "~".parse::<CompareOp>(),
        Err(MatchError::UnknownOperator(_))
    ));
}
