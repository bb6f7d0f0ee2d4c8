pub mod core;
pub mod errors;
pub mod storage;
pub mod types;

pub use errors::*;
