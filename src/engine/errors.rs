use std::io;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::engine::core::{CompareOp, TransactionState};
use crate::engine::types::{LogicalType, PhysicalType};

/// Errors raised by the vector runtime (chunks, vectors, selections).
#[derive(Debug, Error, PartialEq)]
pub enum VectorError {
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: LogicalType, found: String },

    #[error("Index {index} out of bounds for capacity {capacity}")]
    IndexOutOfBounds { index: usize, capacity: usize },

    #[error("Chunk has {actual} columns, expected {expected}")]
    ColumnCount { expected: usize, actual: usize },

    #[error("Chunk capacity {capacity} exceeded")]
    CapacityExceeded { capacity: usize },
}

/// Errors raised by row layout construction and the match engine.
#[derive(Debug, Error, PartialEq)]
pub enum MatchError {
    #[error("Unsupported type for row matching: {0}")]
    UnsupportedType(LogicalType),

    #[error("Unsupported operator {op:?} for physical type {physical}")]
    UnsupportedOperator { op: CompareOp, physical: PhysicalType },

    #[error("Unknown comparison operator: {0}")]
    UnknownOperator(String),

    #[error("Predicate count {predicates} does not match layout column count {columns}")]
    PredicateCount { predicates: usize, columns: usize },

    #[error("String heap would grow to {len} bytes, past the 32-bit offset range")]
    HeapOverflow { len: usize },

    #[error("Vector error: {0}")]
    Vector(#[from] VectorError),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Metadata serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("Manifest error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage corruption in {context}: {reason}")]
    Corruption { context: String, reason: String },

    #[error("Compression codec error: {0}")]
    Codec(String),

    #[error("Type {0} cannot be stored in a column segment")]
    UnsupportedType(LogicalType),

    #[error("{what} of {len} does not fit in 32 bits")]
    TooLarge { what: &'static str, len: usize },

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Table already exists: {0}")]
    TableExists(String),

    #[error("Table {0} must have at least one column")]
    NoColumns(String),

    #[error("Column {column} out of range for table {table}")]
    ColumnOutOfRange { table: String, column: usize },

    #[error("Row {row} out of range for table {table}")]
    RowOutOfRange { table: String, row: u64 },

    #[error("Vector error: {0}")]
    Vector(#[from] VectorError),

    #[error("Filter error: {0}")]
    Filter(#[from] MatchError),
}

impl StorageError {
    pub fn corruption(context: impl Into<String>, reason: impl Into<String>) -> Self {
        StorageError::Corruption {
            context: context.into(),
            reason: reason.into(),
        }
    }

    pub fn is_corruption(&self) -> bool {
        matches!(self, StorageError::Corruption { .. })
    }
}

#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("WAL record encode error: {0}")]
    Encode(#[from] bincode::Error),

    #[error("WAL corruption at offset {offset}: {reason}")]
    Corruption { offset: u64, reason: String },

    #[error("WAL entry of {0} bytes exceeds the frame limit")]
    EntryTooLarge(usize),

    #[error("WAL replay failed: {0}")]
    Replay(#[from] Box<StorageError>),
}

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Transaction {txn_id} is {actual:?}, expected {expected:?}")]
    InvalidState {
        txn_id: u64,
        expected: TransactionState,
        actual: TransactionState,
    },

    #[error("Write conflict on table {table} row {row}")]
    WriteConflict { table: String, row: u64 },

    #[error("Transaction was cancelled")]
    Cancelled,

    #[error("WAL flush failed: {0}")]
    WalFlush(#[source] io::Error),

    #[error("Undo buffer inconsistency: {0}")]
    UndoInconsistency(String),

    #[error("Cannot checkpoint while {0} other transaction(s) are active")]
    CheckpointConflict(usize),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("WAL error: {0}")]
    Wal(#[from] WalError),

    #[error("Vector error: {0}")]
    Vector(#[from] VectorError),
}

impl From<MatchError> for TransactionError {
    fn from(e: MatchError) -> Self {
        TransactionError::Storage(StorageError::Filter(e))
    }
}

impl TransactionError {
    pub fn log_error(&self) {
        match self {
            TransactionError::InvalidState { txn_id, actual, .. } => {
                error!("Transaction {} in invalid state {:?}", txn_id, actual);
                debug!("Invalid state details: {:?}", self);
            }
            TransactionError::WriteConflict { table, row } => {
                warn!("Write conflict on {} row {}", table, row);
            }
            TransactionError::Cancelled => {
                warn!("Transaction cancelled by client");
            }
            TransactionError::WalFlush(e) => {
                error!("WAL flush failed: {}", e);
                debug!("WAL flush error details: {:?}", e);
            }
            TransactionError::UndoInconsistency(e) => {
                error!("Undo buffer inconsistency: {}", e);
            }
            TransactionError::CheckpointConflict(n) => {
                warn!("Checkpoint blocked by {} active transaction(s)", n);
            }
            TransactionError::Storage(e) => {
                error!("Storage error: {}", e);
                debug!("Storage error details: {:?}", e);
            }
            TransactionError::Wal(e) => {
                error!("WAL error: {}", e);
                debug!("WAL error details: {:?}", e);
            }
            TransactionError::Vector(e) => {
                error!("Vector error: {}", e);
            }
        }
    }
}
