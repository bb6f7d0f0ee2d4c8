use std::cmp::Ordering;

use tracing::trace;

use crate::engine::core::row::compare_op::{
    ComparisonOperator, DistinctFrom, Equal, GreaterThan, GreaterThanOrEqual, LessThan,
    LessThanOrEqual, NotDistinctFrom, NotEqual,
};
use crate::engine::core::row::{CompareOp, RowCollection, RowLayout, RowPointer};
use crate::engine::core::vector::{DataChunk, NativeType, SelectionVector, Vector};
use crate::engine::errors::{MatchError, VectorError};
use crate::engine::types::{LogicalType, PhysicalType};

type MatchFunction = fn(
    &Vector,
    Option<&SelectionVector>,
    &RowCollection,
    usize,
    &[RowPointer],
    &mut SelectionVector,
    Option<&mut SelectionVector>,
) -> Result<usize, MatchError>;

/// Compares columnar values against packed rows, one predicate per layout
/// column, narrowing a selection vector.
///
/// Match functions are resolved once per (type, operator) pair when the
/// matcher is built; each is a monomorphized loop with no per-row dispatch.
pub struct RowMatcher {
    predicates: Vec<CompareOp>,
    functions: Vec<MatchFunction>,
}

impl RowMatcher {
    pub fn new(layout: &RowLayout, predicates: &[CompareOp]) -> Result<Self, MatchError> {
        if predicates.len() != layout.column_count() {
            return Err(MatchError::PredicateCount {
                predicates: predicates.len(),
                columns: layout.column_count(),
            });
        }
        let functions = predicates
            .iter()
            .zip(layout.types())
            .map(|(op, ty)| resolve(ty, *op))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            predicates: predicates.to_vec(),
            functions,
        })
    }

    pub fn predicates(&self) -> &[CompareOp] {
        &self.predicates
    }

    /// Evaluates every predicate over the rows in `sel`, column by column.
    ///
    /// `sel` holds logical row indices of `columns`; `row_ptrs[i]` is the
    /// packed row paired with logical row `i`. Matching rows stay in `sel`
    /// (compacted in place, order preserved); the rest are appended to
    /// `no_match` when given. Returns the number of matching rows.
    pub fn match_rows(
        &self,
        columns: &DataChunk,
        rows: &RowCollection,
        row_ptrs: &[RowPointer],
        sel: &mut SelectionVector,
        no_match: Option<&mut SelectionVector>,
    ) -> Result<usize, MatchError> {
        let vectors: Vec<&Vector> = columns.columns().iter().collect();
        self.match_vectors(&vectors, columns.selection(), rows, row_ptrs, sel, no_match)
    }

    /// `match_rows` over borrowed vectors sharing the selection `lhs_sel`.
    pub fn match_vectors(
        &self,
        columns: &[&Vector],
        lhs_sel: Option<&SelectionVector>,
        rows: &RowCollection,
        row_ptrs: &[RowPointer],
        sel: &mut SelectionVector,
        mut no_match: Option<&mut SelectionVector>,
    ) -> Result<usize, MatchError> {
        let layout = rows.layout();
        if columns.len() < layout.column_count() {
            return Err(VectorError::ColumnCount {
                expected: layout.column_count(),
                actual: columns.len(),
            }
            .into());
        }

        let mut count = sel.len();
        for (col, function) in self.functions.iter().enumerate() {
            if count == 0 {
                break;
            }
            let vector = columns[col];
            if vector.logical_type() != &layout.types()[col] {
                return Err(VectorError::TypeMismatch {
                    expected: layout.types()[col].clone(),
                    found: vector.logical_type().to_string(),
                }
                .into());
            }
            count = function(vector, lhs_sel, rows, col, row_ptrs, sel, no_match.as_deref_mut())?;
            trace!(
                target: "row_matcher::match_vectors",
                col, op = ?self.predicates[col], remaining = count,
                "Predicate applied"
            );
        }
        Ok(count)
    }
}

macro_rules! dispatch_op {
    ($op:expr, $func:ident $(, $t:ty)?) => {
        match $op {
            CompareOp::Equal => $func::<$($t,)? Equal> as MatchFunction,
            CompareOp::NotEqual => $func::<$($t,)? NotEqual> as MatchFunction,
            CompareOp::LessThan => $func::<$($t,)? LessThan> as MatchFunction,
            CompareOp::LessThanOrEqual => $func::<$($t,)? LessThanOrEqual> as MatchFunction,
            CompareOp::GreaterThan => $func::<$($t,)? GreaterThan> as MatchFunction,
            CompareOp::GreaterThanOrEqual => $func::<$($t,)? GreaterThanOrEqual> as MatchFunction,
            CompareOp::DistinctFrom => $func::<$($t,)? DistinctFrom> as MatchFunction,
            CompareOp::NotDistinctFrom => $func::<$($t,)? NotDistinctFrom> as MatchFunction,
        }
    };
}

fn resolve(ty: &LogicalType, op: CompareOp) -> Result<MatchFunction, MatchError> {
    let physical = ty.physical_type();
    let function = match physical {
        // Booleans only take the equality class.
        PhysicalType::Bool if op.is_ordering() => {
            return Err(MatchError::UnsupportedOperator { op, physical });
        }
        PhysicalType::Bool => dispatch_op!(op, match_fixed, bool),
        PhysicalType::I8 => dispatch_op!(op, match_fixed, i8),
        PhysicalType::I16 => dispatch_op!(op, match_fixed, i16),
        PhysicalType::I32 => dispatch_op!(op, match_fixed, i32),
        PhysicalType::I64 => dispatch_op!(op, match_fixed, i64),
        PhysicalType::U64 => dispatch_op!(op, match_fixed, u64),
        PhysicalType::F32 => dispatch_op!(op, match_fixed, f32),
        PhysicalType::F64 => dispatch_op!(op, match_fixed, f64),
        PhysicalType::VarBytes => dispatch_op!(op, match_varchar),
        PhysicalType::List => return Err(MatchError::UnsupportedType(ty.clone())),
    };
    Ok(function)
}

fn match_fixed<T: NativeType, OP: ComparisonOperator>(
    lhs: &Vector,
    lhs_sel: Option<&SelectionVector>,
    rows: &RowCollection,
    col: usize,
    row_ptrs: &[RowPointer],
    sel: &mut SelectionVector,
    no_match: Option<&mut SelectionVector>,
) -> Result<usize, MatchError> {
    let values = lhs.values::<T>().ok_or_else(|| VectorError::TypeMismatch {
        expected: lhs.logical_type().clone(),
        found: T::PHYSICAL.to_string(),
    })?;
    let offset = rows.layout().offset(col);
    let compare =
        |lhs_idx: usize, ptr: RowPointer| T::total_cmp(&values[lhs_idx], &T::read_le(&rows.row(ptr)[offset..]));
    Ok(if lhs.validity().all_valid() {
        match_loop::<OP, true, _>(lhs, lhs_sel, rows, col, row_ptrs, sel, no_match, compare)
    } else {
        match_loop::<OP, false, _>(lhs, lhs_sel, rows, col, row_ptrs, sel, no_match, compare)
    })
}

fn match_varchar<OP: ComparisonOperator>(
    lhs: &Vector,
    lhs_sel: Option<&SelectionVector>,
    rows: &RowCollection,
    col: usize,
    row_ptrs: &[RowPointer],
    sel: &mut SelectionVector,
    no_match: Option<&mut SelectionVector>,
) -> Result<usize, MatchError> {
    let values = lhs.strings().ok_or_else(|| VectorError::TypeMismatch {
        expected: lhs.logical_type().clone(),
        found: PhysicalType::VarBytes.to_string(),
    })?;
    let compare = |lhs_idx: usize, ptr: RowPointer| values[lhs_idx].as_bytes().cmp(rows.load_bytes(ptr, col));
    Ok(if lhs.validity().all_valid() {
        match_loop::<OP, true, _>(lhs, lhs_sel, rows, col, row_ptrs, sel, no_match, compare)
    } else {
        match_loop::<OP, false, _>(lhs, lhs_sel, rows, col, row_ptrs, sel, no_match, compare)
    })
}

/// With `NO_NULLS` the columnar validity is never consulted; the packed
/// row's validity bit is always checked.
#[inline(always)]
#[allow(clippy::too_many_arguments)]
fn match_loop<OP, const NO_NULLS: bool, F>(
    lhs: &Vector,
    lhs_sel: Option<&SelectionVector>,
    rows: &RowCollection,
    col: usize,
    row_ptrs: &[RowPointer],
    sel: &mut SelectionVector,
    mut no_match: Option<&mut SelectionVector>,
    compare: F,
) -> usize
where
    OP: ComparisonOperator,
    F: Fn(usize, RowPointer) -> Ordering,
{
    let validity = lhs.validity();
    let (byte, bit) = RowLayout::validity_position(col);
    let count = sel.len();
    let mut match_count = 0;

    for i in 0..count {
        let idx = sel.get_index(i);
        let lhs_idx = match lhs_sel {
            Some(s) => s.get_index(idx),
            None => idx,
        };
        let ptr = row_ptrs[idx];
        let rhs_valid = rows.row(ptr)[byte] & bit != 0;

        let is_match = if NO_NULLS {
            if rhs_valid {
                OP::on_ordering(compare(lhs_idx, ptr))
            } else {
                OP::on_nulls(false, true)
            }
        } else {
            let lhs_valid = validity.is_valid(lhs_idx);
            if lhs_valid && rhs_valid {
                OP::on_ordering(compare(lhs_idx, ptr))
            } else {
                OP::on_nulls(!lhs_valid, !rhs_valid)
            }
        };

        if is_match {
            sel.set_index(match_count, idx);
            match_count += 1;
        } else if let Some(no_match) = no_match.as_deref_mut() {
            no_match.push(idx);
        }
    }

    sel.truncate(match_count);
    match_count
}
