use async_trait::async_trait;
use std::fmt;

use crate::Result;

/// A text embedding provider.
///
/// The name identifies the model; vectors from different models are not
/// comparable, so an index is only meaningful with the model that built it.
#[async_trait]
pub trait EmbeddingModel: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Embed a batch of documents, one vector per input, in input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a search query
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}
