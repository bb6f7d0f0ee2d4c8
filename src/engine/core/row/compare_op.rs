use std::cmp::Ordering;
use std::str::FromStr;

use crate::engine::errors::MatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    DistinctFrom,
    NotDistinctFrom,
}

impl CompareOp {
    /// Outcome when both sides are non-null.
    #[inline]
    pub fn apply(&self, ord: Ordering) -> bool {
        match self {
            CompareOp::Equal | CompareOp::NotDistinctFrom => ord == Ordering::Equal,
            CompareOp::NotEqual | CompareOp::DistinctFrom => ord != Ordering::Equal,
            CompareOp::LessThan => ord == Ordering::Less,
            CompareOp::LessThanOrEqual => ord != Ordering::Greater,
            CompareOp::GreaterThan => ord == Ordering::Greater,
            CompareOp::GreaterThanOrEqual => ord != Ordering::Less,
        }
    }

    /// Outcome when at least one side is NULL.
    #[inline]
    pub fn apply_nulls(&self, lhs_null: bool, rhs_null: bool) -> bool {
        match self {
            CompareOp::NotDistinctFrom => lhs_null && rhs_null,
            CompareOp::DistinctFrom => lhs_null != rhs_null,
            _ => false,
        }
    }

    /// Ordering operators need a total order on the physical type.
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            CompareOp::LessThan
                | CompareOp::LessThanOrEqual
                | CompareOp::GreaterThan
                | CompareOp::GreaterThanOrEqual
        )
    }

    /// Operator with swapped operands: `a OP b == b OP.flip() a`.
    pub fn flip(&self) -> CompareOp {
        match self {
            CompareOp::LessThan => CompareOp::GreaterThan,
            CompareOp::LessThanOrEqual => CompareOp::GreaterThanOrEqual,
            CompareOp::GreaterThan => CompareOp::LessThan,
            CompareOp::GreaterThanOrEqual => CompareOp::LessThanOrEqual,
            other => *other,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Equal => "=",
            CompareOp::NotEqual => "<>",
            CompareOp::LessThan => "<",
            CompareOp::LessThanOrEqual => "<=",
            CompareOp::GreaterThan => ">",
            CompareOp::GreaterThanOrEqual => ">=",
            CompareOp::DistinctFrom => "IS DISTINCT FROM",
            CompareOp::NotDistinctFrom => "IS NOT DISTINCT FROM",
        }
    }
}

impl FromStr for CompareOp {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "=" | "==" => Ok(CompareOp::Equal),
            "<>" | "!=" => Ok(CompareOp::NotEqual),
            "<" => Ok(CompareOp::LessThan),
            "<=" => Ok(CompareOp::LessThanOrEqual),
            ">" => Ok(CompareOp::GreaterThan),
            ">=" => Ok(CompareOp::GreaterThanOrEqual),
            "IS DISTINCT FROM" => Ok(CompareOp::DistinctFrom),
            "IS NOT DISTINCT FROM" => Ok(CompareOp::NotDistinctFrom),
            other => Err(MatchError::UnknownOperator(other.to_string())),
        }
    }
}

/// Compile-time operator used to monomorphize match loops.
pub trait ComparisonOperator {
    const OP: CompareOp;

    #[inline(always)]
    fn on_ordering(ord: Ordering) -> bool {
        Self::OP.apply(ord)
    }

    #[inline(always)]
    fn on_nulls(lhs_null: bool, rhs_null: bool) -> bool {
        Self::OP.apply_nulls(lhs_null, rhs_null)
    }
}

macro_rules! comparison_operator {
    ($name:ident) => {
        pub struct $name;

        impl ComparisonOperator for $name {
            const OP: CompareOp = CompareOp::$name;
        }
    };
}

comparison_operator!(Equal);
comparison_operator!(NotEqual);
comparison_operator!(LessThan);
comparison_operator!(LessThanOrEqual);
comparison_operator!(GreaterThan);
comparison_operator!(GreaterThanOrEqual);
comparison_operator!(DistinctFrom);
comparison_operator!(NotDistinctFrom);
