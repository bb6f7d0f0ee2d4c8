pub mod data_chunk;
pub mod native_type;
pub mod selection_vector;
pub mod validity_mask;
pub mod vector;

pub use data_chunk::DataChunk;
pub use native_type::NativeType;
pub use selection_vector::SelectionVector;
pub use validity_mask::ValidityMask;
pub use vector::{ListData, ListEntry, Vector, VectorData};

/// Default number of rows per chunk.
pub const STANDARD_VECTOR_SIZE: usize = 2048;

#[cfg(test)]
mod data_chunk_test;
#[cfg(test)]
mod vector_test;
