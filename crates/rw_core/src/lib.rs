pub mod error;
pub mod models;
pub mod normalize;
pub mod similarity;
pub mod types;
pub mod years;

pub use error::{Error, Result};
pub use models::EmbeddingModel;
pub use normalize::{normalize, normalize_all};
pub use similarity::{cosine_similarity, normalize_vector};
pub use types::{
    DocumentContent, DocumentMetadata, IndexedDocument, NormalizedArticle, RawArticle,
    ResultArticle, SearchFilter, SearchQuery, DEFAULT_SEARCH_LIMIT,
};
pub use years::{extract_years, extract_years_from_text, MAX_YEAR, MIN_YEAR};
