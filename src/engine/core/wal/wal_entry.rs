use serde::{Deserialize, Serialize};

use crate::engine::storage::{ColumnDefinition, RowId};
use crate::engine::types::ScalarValue;

/// Frame tag written ahead of every entry payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WalEntryKind {
    CreateTable = 1,
    DropTable = 2,
    Insert = 3,
    Delete = 4,
    Update = 5,
    Checkpoint = 6,
    Commit = 7,
}

impl TryFrom<u8> for WalEntryKind {
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Ok(match tag {
            1 => WalEntryKind::CreateTable,
            2 => WalEntryKind::DropTable,
            3 => WalEntryKind::Insert,
            4 => WalEntryKind::Delete,
            5 => WalEntryKind::Update,
            6 => WalEntryKind::Checkpoint,
            7 => WalEntryKind::Commit,
            other => return Err(other),
        })
    }
}

/// One durable log record. Everything a transaction did is written at
/// commit as a group closed by `Commit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WalEntry {
    CreateTable {
        name: String,
        columns: Vec<ColumnDefinition>,
    },
    DropTable {
        name: String,
    },
    Insert {
        table: String,
        rows: Vec<Vec<ScalarValue>>,
    },
    Delete {
        table: String,
        rows: Vec<RowId>,
    },
    Update {
        table: String,
        column: usize,
        rows: Vec<RowId>,
        values: Vec<ScalarValue>,
    },
    /// Everything before this marker is contained in checkpoint `iteration`.
    Checkpoint {
        iteration: u64,
    },
    Commit {
        commit_ts: u64,
    },
}

impl WalEntry {
    pub fn kind(&self) -> WalEntryKind {
        match self {
            WalEntry::CreateTable { .. } => WalEntryKind::CreateTable,
            WalEntry::DropTable { .. } => WalEntryKind::DropTable,
            WalEntry::Insert { .. } => WalEntryKind::Insert,
            WalEntry::Delete { .. } => WalEntryKind::Delete,
            WalEntry::Update { .. } => WalEntryKind::Update,
            WalEntry::Checkpoint { .. } => WalEntryKind::Checkpoint,
            WalEntry::Commit { .. } => WalEntryKind::Commit,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn decode(payload: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(payload)
    }
}
