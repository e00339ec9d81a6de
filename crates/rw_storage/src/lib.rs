pub mod cache;
pub mod index;

pub use cache::{CacheDir, FRESHNESS_THRESHOLD};
pub use index::{to_document, IndexManifest, ScoredDocument, VectorIndex};

pub mod prelude {
    pub use super::cache::CacheDir;
    pub use super::index::VectorIndex;
}
