pub mod chunk_factory;
pub mod database_factory;
pub mod row_collection_factory;

pub use chunk_factory::{ChunkFactory, value_for};
pub use database_factory::{DatabaseFactory, TestDatabase};
pub use row_collection_factory::RowCollectionFactory;

#[cfg(test)]
mod chunk_factory_test;
#[cfg(test)]
mod database_factory_test;
