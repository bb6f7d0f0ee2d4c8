use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::engine::core::column::{PruneResult, SegmentStatistics};
use crate::engine::core::row::CompareOp;
use crate::engine::types::{LogicalType, ScalarValue};

fn stats_of(values: &[Option<i64>]) -> SegmentStatistics {
    let mut stats = SegmentStatistics::new(LogicalType::BigInt);
    for v in values {
        stats.update(&ScalarValue::from(*v));
    }
    stats
}

#[test]
fn tracks_min_max_and_nulls() {
    let stats = stats_of(&[Some(3), Some(1), Some(4), Some(1), Some(5), Some(9), Some(2), Some(6)]);
    assert_eq!(stats.min(), Some(&ScalarValue::BigInt(1)));
    assert_eq!(stats.max(), Some(&ScalarValue::BigInt(9)));
    assert_eq!(stats.null_count(), 0);
    assert_eq!(stats.row_count(), 8);
}

#[test]
fn soundness_holds_for_random_appends() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..50 {
        let len = rng.gen_range(0..200);
        let values: Vec<Option<i64>> = (0..len)
            .map(|_| rng.gen_bool(0.8).then(|| rng.gen_range(-1000..1000)))
            .collect();
        let stats = stats_of(&values);

        let nulls = values.iter().filter(|v| v.is_none()).count() as u64;
        assert_eq!(stats.null_count(), nulls);
        assert_eq!(stats.row_count(), len as u64);
        for v in values.iter().flatten() {
            let v = ScalarValue::BigInt(*v);
            assert_ne!(stats.min().and_then(|m| v.compare(m)), Some(std::cmp::Ordering::Less));
            assert_ne!(stats.max().and_then(|m| v.compare(m)), Some(std::cmp::Ordering::Greater));
        }
        assert_eq!(stats.min().is_none(), nulls == len as u64);
    }
}

#[test]
fn pruning_never_skips_a_matching_segment() {
    let mut rng = StdRng::seed_from_u64(42);
    let ops = [
        CompareOp::Equal,
        CompareOp::NotEqual,
        CompareOp::LessThan,
        CompareOp::LessThanOrEqual,
        CompareOp::GreaterThan,
        CompareOp::GreaterThanOrEqual,
        CompareOp::DistinctFrom,
        CompareOp::NotDistinctFrom,
    ];
    for _ in 0..200 {
        let values: Vec<Option<i64>> = (0..rng.gen_range(1..20))
            .map(|_| rng.gen_bool(0.85).then(|| rng.gen_range(0..10)))
            .collect();
        let stats = stats_of(&values);
        let constant: Option<i64> = rng.gen_bool(0.9).then(|| rng.gen_range(-2..12));
        let c = ScalarValue::from(constant);

        for op in ops {
            let matches: Vec<bool> = values
                .iter()
                .map(|v| match (v, constant) {
                    (Some(a), Some(b)) => op.apply(a.cmp(&b)),
                    (a, b) => op.apply_nulls(a.is_none(), b.is_none()),
                })
                .collect();
            match stats.check_predicate(op, &c) {
                PruneResult::AlwaysFalse => assert!(matches.iter().all(|m| !m), "{:?} {:?} {:?}", op, c, values),
                PruneResult::AlwaysTrue => assert!(matches.iter().all(|m| *m), "{:?} {:?} {:?}", op, c, values),
                PruneResult::Unknown => {}
            }
        }
    }
}

#[test]
fn concrete_segment_prunes_by_range() {
    let stats = stats_of(&[Some(3), Some(1), Some(4), Some(1), Some(5), Some(9), Some(2), Some(6)]);
    assert_eq!(stats.check_predicate(CompareOp::GreaterThan, &ScalarValue::BigInt(9)), PruneResult::AlwaysFalse);
    assert_eq!(stats.check_predicate(CompareOp::GreaterThan, &ScalarValue::BigInt(4)), PruneResult::Unknown);
    assert_eq!(stats.check_predicate(CompareOp::GreaterThan, &ScalarValue::BigInt(0)), PruneResult::AlwaysTrue);
    assert_eq!(stats.check_predicate(CompareOp::Equal, &ScalarValue::BigInt(10)), PruneResult::AlwaysFalse);
    assert_eq!(stats.check_predicate(CompareOp::Equal, &ScalarValue::Null), PruneResult::AlwaysFalse);
    // Mismatched constant type gives no information.
    assert_eq!(stats.check_predicate(CompareOp::Equal, &ScalarValue::from("x")), PruneResult::Unknown);
}

#[test]
fn in_place_updates_only_widen() {
    let mut stats = stats_of(&[Some(5), Some(6)]);
    stats.update_in_place(&ScalarValue::BigInt(100));
    stats.update_in_place(&ScalarValue::Null);
    assert_eq!(stats.max(), Some(&ScalarValue::BigInt(100)));
    assert_eq!(stats.min(), Some(&ScalarValue::BigInt(5)));
    assert!(stats.has_nulls());
    assert_eq!(stats.row_count(), 2);
    // A NULL update on a two-row segment must not claim it is all NULL.
    assert_eq!(
        stats.check_predicate(CompareOp::Equal, &ScalarValue::BigInt(6)),
        PruneResult::Unknown
    );
}

#[test]
fn all_null_segment() {
    let stats = stats_of(&[None, None, None]);
    assert_eq!(stats.min(), None);
    assert_eq!(stats.distinct_hint(), 0);
    assert_eq!(stats.check_predicate(CompareOp::LessThan, &ScalarValue::BigInt(1)), PruneResult::AlwaysFalse);
    assert_eq!(stats.check_predicate(CompareOp::NotDistinctFrom, &ScalarValue::Null), PruneResult::AlwaysTrue);
    assert_eq!(stats.check_predicate(CompareOp::DistinctFrom, &ScalarValue::BigInt(1)), PruneResult::AlwaysTrue);
}

#[test]
fn distinct_hint_is_close_for_small_sets() {
    let values: Vec<Option<i64>> = (0..1000).map(|i| Some(i % 50)).collect();
    let hint = stats_of(&values).distinct_hint();
    assert!((40..=60).contains(&hint), "hint {}", hint);

    let single = stats_of(&[Some(7); 20]);
    assert_eq!(single.distinct_hint(), 1);
}

#[test]
fn merge_combines_ranges_and_counts() {
    let mut a = stats_of(&[Some(10), None]);
    let b = stats_of(&[Some(-3), Some(4)]);
    a.merge(&b);
    assert_eq!(a.min(), Some(&ScalarValue::BigInt(-3)));
    assert_eq!(a.max(), Some(&ScalarValue::BigInt(10)));
    assert_eq!(a.row_count(), 4);
    assert_eq!(a.null_count(), 1);
}

#[test]
fn varchar_and_double_bounds() {
    let mut s = SegmentStatistics::new(LogicalType::Varchar);
    for v in ["pear", "apple", "zoo"] {
        s.update(&ScalarValue::from(v));
    }
    assert_eq!(s.min(), Some(&ScalarValue::from("apple")));
    assert_eq!(s.check_predicate(CompareOp::LessThan, &ScalarValue::from("aardvark")), PruneResult::AlwaysFalse);

    let mut d = SegmentStatistics::new(LogicalType::Double);
    d.update(&ScalarValue::Double(-0.0));
    d.update(&ScalarValue::Double(f64::NAN));
    assert_eq!(d.check_predicate(CompareOp::GreaterThan, &ScalarValue::Double(1e300)), PruneResult::Unknown);
    assert_eq!(d.check_predicate(CompareOp::LessThan, &ScalarValue::Double(0.0)), PruneResult::AlwaysFalse);
}
