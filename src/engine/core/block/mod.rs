pub mod block_manager;

pub use block_manager::{BlockManager, BlockPointer};

#[cfg(test)]
mod block_manager_test;
