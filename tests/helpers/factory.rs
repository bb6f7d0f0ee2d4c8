pub use super::factories::{ChunkFactory, DatabaseFactory, RowCollectionFactory, TestDatabase};

pub struct Factory;

impl Factory {
    pub fn chunk() -> ChunkFactory {
        ChunkFactory::new()
    }

    pub fn rows() -> RowCollectionFactory {
        RowCollectionFactory::new()
    }

    pub fn database() -> DatabaseFactory {
        DatabaseFactory::new()
    }
}
