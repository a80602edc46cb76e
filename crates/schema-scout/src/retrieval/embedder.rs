use crate::error::AppResult;

/// Turns a piece of text into a fixed-length vector.
///
/// Vector computation is an external concern; the index only needs this one
/// function. Running without an embedder is a valid configuration and
/// degrades ranking to lexical matching only.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> AppResult<Vec<f32>>;
}
