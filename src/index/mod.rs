//! Vector indexes keyed by vector id.

mod vector_index;

pub use vector_index::VectorIndex;
