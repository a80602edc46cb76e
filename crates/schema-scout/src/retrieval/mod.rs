pub mod embedder;
pub mod index;

pub use embedder::Embedder;
pub use index::RelevanceIndex;
