pub mod block;
pub mod column;
pub mod row;
pub mod txn;
pub mod vector;
pub mod wal;

pub use block::{BlockManager, BlockPointer};
pub use column::{ColumnData, ColumnSegment, PruneResult, SegmentConfig, SegmentStatistics};
pub use row::{CompareOp, RowCollection, RowLayout, RowMatcher, RowPointer};
pub use txn::{CancelHandle, Snapshot, Transaction, TransactionManager, TransactionState};
pub use vector::{DataChunk, STANDARD_VECTOR_SIZE, SelectionVector, ValidityMask, Vector};
pub use wal::{WalEntry, WalReader, WalReplayer, WalWriter};
