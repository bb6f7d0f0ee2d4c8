pub mod compare_op;
pub mod row_collection;
pub mod row_layout;
pub mod row_matcher;

pub use compare_op::CompareOp;
pub use row_collection::{RowCollection, RowPointer};
pub use row_layout::RowLayout;
pub use row_matcher::RowMatcher;

#[cfg(test)]
mod compare_op_test;
