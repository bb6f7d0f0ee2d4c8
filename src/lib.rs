pub mod engine;
pub mod logging;
pub mod shared;

pub use engine::core::{CompareOp, DataChunk, SelectionVector, Transaction, TransactionState, Vector};
pub use engine::errors::{MatchError, StorageError, TransactionError, VectorError, WalError};
pub use engine::storage::{ColumnDefinition, Database, RowId, ScanChunk, TableFilter};
pub use engine::types::{LogicalType, PhysicalType, ScalarValue};
pub use shared::config::Settings;

#[cfg(test)]
#[path = "../tests/helpers/mod.rs"]
pub mod test_helpers;
