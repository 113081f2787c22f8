//! Vector storage adapters.
//!
//! [`MemoryStore`] is a brute-force cosine index for tests and small corpora;
//! [`LanceStore`] persists chunks in a LanceDB table on disk.

pub mod lance;
pub mod memory;

pub use lance::LanceStore;
pub use memory::{cosine_similarity, MemoryStore};
