pub mod global;
pub mod model;

pub use global::CONFIG;
pub use model::{
    ExecutionConfig, LoggingConfig, Settings, StorageConfig, WalConfig, load_settings,
};
