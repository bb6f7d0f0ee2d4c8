pub mod cancel_handle;
pub mod local_storage;
pub mod transaction;
pub mod transaction_manager;
pub mod undo_buffer;
pub mod version_info;

pub use cancel_handle::CancelHandle;
pub use local_storage::{LOCAL_ROW_START, LocalStorage, LocalTableStorage};
pub use transaction::{Transaction, TransactionState};
pub use transaction_manager::TransactionManager;
pub use undo_buffer::{UndoBuffer, UndoRecord};
pub use version_info::{NOT_DELETED, Snapshot, TRANSACTION_ID_START, VersionInfo, WriteCheck};
