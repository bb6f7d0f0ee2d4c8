use std::sync::Arc;

use tracing::debug;

use crate::engine::core::column::PruneResult;
use crate::engine::core::row::{CompareOp, RowCollection, RowLayout, RowMatcher};
use crate::engine::core::vector::{SelectionVector, Vector};
use crate::engine::errors::{StorageError, VectorError};
use crate::engine::storage::{DataTable, TableData};
use crate::engine::types::{LogicalType, ScalarValue};

/// `column OP constant`, pushed down into a table scan.
#[derive(Debug, Clone, PartialEq)]
pub struct TableFilter {
    pub column: usize,
    pub op: CompareOp,
    pub constant: ScalarValue,
}

impl TableFilter {
    pub fn new(column: usize, op: CompareOp, constant: impl Into<ScalarValue>) -> Self {
        Self {
            column,
            op,
            constant: constant.into(),
        }
    }
}

/// Outcome of binding one filter whose constant lies outside the column's
/// integer range.
enum Folded {
    /// Equivalent filter with the constant clamped to the range.
    Clamped(TableFilter),
    /// Matches every row, nulls included.
    Always,
    /// Matches nothing.
    Never,
}

fn integer_range(ty: &LogicalType) -> Option<(ScalarValue, ScalarValue)> {
    Some(match ty {
        LogicalType::TinyInt => (ScalarValue::TinyInt(i8::MIN), ScalarValue::TinyInt(i8::MAX)),
        LogicalType::SmallInt => (ScalarValue::SmallInt(i16::MIN), ScalarValue::SmallInt(i16::MAX)),
        LogicalType::Integer => (ScalarValue::Integer(i32::MIN), ScalarValue::Integer(i32::MAX)),
        LogicalType::BigInt => (ScalarValue::BigInt(i64::MIN), ScalarValue::BigInt(i64::MAX)),
        LogicalType::UBigInt => (ScalarValue::UBigInt(0), ScalarValue::UBigInt(u64::MAX)),
        _ => return None,
    })
}

/// Folds `column OP constant` when the integer constant cannot be
/// represented in the column type. Every stored value is then on one side
/// of the constant, so the filter reduces to a null check or a constant.
fn fold_out_of_range(filter: &TableFilter, ty: &LogicalType) -> Option<Folded> {
    let value = filter.constant.as_i128()?;
    let (min, max) = integer_range(ty)?;
    let above = value > max.as_i128()?;
    if !above && value >= min.as_i128()? {
        return None;
    }
    let clamped = |op, constant| {
        Folded::Clamped(TableFilter {
            column: filter.column,
            op,
            constant,
        })
    };
    Some(match (filter.op, above) {
        (CompareOp::DistinctFrom, _) => Folded::Always,
        (CompareOp::NotEqual, true) | (CompareOp::LessThan | CompareOp::LessThanOrEqual, true) => {
            clamped(CompareOp::LessThanOrEqual, max)
        }
        (CompareOp::NotEqual, false) | (CompareOp::GreaterThan | CompareOp::GreaterThanOrEqual, false) => {
            clamped(CompareOp::GreaterThanOrEqual, min)
        }
        _ => Folded::Never,
    })
}

/// A conjunction of filters bound to a table's column types.
///
/// The constants are packed into a one-row collection so the filters run
/// through the row matcher: every row pointer addresses that single row.
/// A conjunction holding a filter that can never match keeps no matcher.
pub struct BoundFilters {
    filters: Vec<TableFilter>,
    matcher: Option<(RowMatcher, RowCollection)>,
}

impl BoundFilters {
    pub fn bind(table: &DataTable, filters: &[TableFilter]) -> Result<Option<Self>, StorageError> {
        if filters.is_empty() {
            return Ok(None);
        }
        let mut bound = Vec::with_capacity(filters.len());
        let mut never = false;
        for filter in filters {
            let Some(ty) = table.types().get(filter.column) else {
                return Err(StorageError::ColumnOutOfRange {
                    table: table.name().to_string(),
                    column: filter.column,
                });
            };
            if let Some(constant) = filter.constant.try_cast(ty) {
                bound.push(TableFilter {
                    column: filter.column,
                    op: filter.op,
                    constant,
                });
                continue;
            }
            match fold_out_of_range(filter, ty) {
                Some(Folded::Clamped(clamped)) => bound.push(clamped),
                Some(Folded::Always) => {}
                Some(Folded::Never) => never = true,
                None => {
                    return Err(VectorError::TypeMismatch {
                        expected: ty.clone(),
                        found: filter.constant.to_string(),
                    }
                    .into());
                }
            }
            debug!(
                target: "table_filter::bind",
                table = %table.name(), column = filter.column, op = ?filter.op,
                constant = %filter.constant, never,
                "Folded out-of-range constant"
            );
        }

        if never {
            return Ok(Some(Self {
                filters: Vec::new(),
                matcher: None,
            }));
        }
        if bound.is_empty() {
            return Ok(None);
        }

        let types = bound.iter().map(|f| table.types()[f.column].clone()).collect();
        let layout = Arc::new(RowLayout::new(types)?);
        let ops: Vec<CompareOp> = bound.iter().map(|f| f.op).collect();
        let matcher = RowMatcher::new(&layout, &ops)?;
        let mut constants = RowCollection::new(layout);
        let values: Vec<ScalarValue> = bound.iter().map(|f| f.constant.clone()).collect();
        constants.append_row(&values)?;

        Ok(Some(Self {
            filters: bound,
            matcher: Some((matcher, constants)),
        }))
    }

    pub fn filters(&self) -> &[TableFilter] {
        &self.filters
    }

    /// Table columns the filters read, one per filter in filter order.
    pub fn columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.filters.iter().map(|f| f.column)
    }

    /// Whether the conjunction rejects every row.
    pub fn is_never(&self) -> bool {
        self.matcher.is_none()
    }

    /// Combined verdict of the segment statistics for segment `segment`.
    pub fn prune(&self, data: &TableData, segment: usize) -> PruneResult {
        if self.is_never() {
            return PruneResult::AlwaysFalse;
        }
        let mut always = true;
        for filter in &self.filters {
            let Some(seg) = data.column(filter.column).segments().get(segment) else {
                return PruneResult::Unknown;
            };
            match seg.stats().check_predicate(filter.op, &filter.constant) {
                PruneResult::AlwaysFalse => return PruneResult::AlwaysFalse,
                PruneResult::AlwaysTrue => {}
                PruneResult::Unknown => always = false,
            }
        }
        if always { PruneResult::AlwaysTrue } else { PruneResult::Unknown }
    }

    /// Narrows `sel` to the rows of `count` that pass every filter.
    /// `inputs[i]` is the scanned vector of the column of filter `i`.
    pub fn apply(&self, inputs: &[&Vector], count: usize, sel: &mut SelectionVector) -> Result<usize, StorageError> {
        let Some((matcher, constants)) = &self.matcher else {
            sel.truncate(0);
            return Ok(0);
        };
        if inputs.len() != self.filters.len() {
            return Err(VectorError::ColumnCount {
                expected: self.filters.len(),
                actual: inputs.len(),
            }
            .into());
        }
        let row_ptrs = vec![0; count];
        Ok(matcher.match_vectors(inputs, None, constants, &row_ptrs, sel, None)?)
    }
}
