//! Flat similarity index over article documents.
//!
//! Every document is scored against the query on each search, so results are
//! exact. The index is persisted as two JSON files in a directory:
//! `manifest.json` describing how it was built and `index.json` holding the
//! documents and their vectors.

use chrono::{DateTime, Utc};
use rw_core::{
    cosine_similarity, extract_years, DocumentContent, DocumentMetadata, EmbeddingModel, Error,
    IndexedDocument, NormalizedArticle, Result, SearchFilter, MAX_YEAR, MIN_YEAR,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const INDEX_FILE: &str = "index.json";

/// Documents sent to the embedding model per request.
pub const EMBEDDING_BATCH_SIZE: usize = 1000;

/// Build the embeddable document for an article.
pub fn to_document(article: &NormalizedArticle) -> Result<IndexedDocument> {
    let content = serde_json::to_string(&DocumentContent {
        title: article.title.clone(),
        author: article.author.clone(),
        site_name: article.site_name.clone(),
        summary: article.summary.clone(),
    })?;

    Ok(IndexedDocument {
        content,
        metadata: DocumentMetadata {
            title: article.title.clone(),
            author: article.author.clone(),
            site_name: article.site_name.clone(),
            link: article.link.clone(),
            tags: article.tags.clone(),
            years: extract_years(article, MIN_YEAR, MAX_YEAR)?,
        },
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexManifest {
    pub embedding_model: String,
    pub dimension: usize,
    pub documents: usize,
    pub created_at: DateTime<Utc>,
}

impl IndexManifest {
    /// Read the manifest of a saved index, `None` if nothing was saved yet.
    pub fn read(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&fs::read(path)?)?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    document: IndexedDocument,
    vector: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: IndexedDocument,
    pub score: f32,
}

pub struct VectorIndex {
    embedder: Arc<dyn EmbeddingModel>,
    entries: Vec<IndexEntry>,
    dimension: usize,
}

impl fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorIndex")
            .field("embedder", &self.embedder.name())
            .field("documents", &self.entries.len())
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl VectorIndex {
    /// An index with no documents. Every search against it returns nothing.
    pub fn empty(embedder: Arc<dyn EmbeddingModel>) -> Self {
        Self {
            embedder,
            entries: Vec::new(),
            dimension: 0,
        }
    }

    pub async fn from_articles(
        articles: &[NormalizedArticle],
        embedder: Arc<dyn EmbeddingModel>,
    ) -> Result<Self> {
        let documents = articles.iter().map(to_document).collect::<Result<Vec<_>>>()?;
        Self::from_documents(documents, embedder).await
    }

    pub async fn from_documents(
        documents: Vec<IndexedDocument>,
        embedder: Arc<dyn EmbeddingModel>,
    ) -> Result<Self> {
        let mut vectors = Vec::with_capacity(documents.len());
        for (i, batch) in documents.chunks(EMBEDDING_BATCH_SIZE).enumerate() {
            let texts: Vec<String> = batch.iter().map(|d| d.content.clone()).collect();
            debug!("Embedding batch {} ({} documents)", i + 1, texts.len());
            let embedded = embedder.embed_documents(&texts).await?;
            if embedded.len() != texts.len() {
                return Err(Error::Index(format!(
                    "Embedding model {} returned {} vectors for {} documents",
                    embedder.name(),
                    embedded.len(),
                    texts.len()
                )));
            }
            vectors.extend(embedded);
        }

        let dimension = vectors.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(Error::Index(format!(
                "Inconsistent embedding dimensions: {} and {}",
                dimension,
                bad.len()
            )));
        }

        let entries = documents
            .into_iter()
            .zip(vectors)
            .map(|(document, vector)| IndexEntry { document, vector })
            .collect::<Vec<_>>();

        info!("🗂️ Built index with {} documents using {}", entries.len(), embedder.name());
        Ok(Self {
            embedder,
            entries,
            dimension,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingModel> {
        &self.embedder
    }

    pub async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<IndexedDocument>> {
        Ok(self
            .similarity_search_with_score(query, k, filter)
            .await?
            .into_iter()
            .map(|scored| scored.document)
            .collect())
    }

    /// Top `k` documents passing `filter`, best match first.
    pub async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<ScoredDocument>> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let query_vector = self.embedder.embed_query(query).await?;
        self.search_by_vector(&query_vector, k, filter)
    }

    pub fn search_by_vector(
        &self,
        query_vector: &[f32],
        k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<ScoredDocument>> {
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }
        if query_vector.len() != self.dimension {
            return Err(Error::Index(format!(
                "Query has dimension {} but the index has {}",
                query_vector.len(),
                self.dimension
            )));
        }

        let mut scored: Vec<ScoredDocument> = self
            .entries
            .iter()
            .filter(|entry| filter.matches(&entry.document.metadata))
            .map(|entry| ScoredDocument {
                document: entry.document.clone(),
                score: cosine_similarity(query_vector, &entry.vector),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        let manifest = IndexManifest {
            embedding_model: self.embedder.name().to_string(),
            dimension: self.dimension,
            documents: self.entries.len(),
            created_at: Utc::now(),
        };
        fs::write(dir.join(INDEX_FILE), serde_json::to_vec(&self.entries)?)?;
        fs::write(dir.join(MANIFEST_FILE), serde_json::to_vec_pretty(&manifest)?)?;
        debug!("Saved index with {} documents to {}", self.entries.len(), dir.display());
        Ok(())
    }

    /// Load a saved index. Queries are embedded with `embedder`, which has to
    /// be the model the index was built with for scores to mean anything.
    pub fn load(dir: &Path, embedder: Arc<dyn EmbeddingModel>) -> Result<Self> {
        let manifest: IndexManifest = serde_json::from_slice(&fs::read(dir.join(MANIFEST_FILE))?)?;
        let entries: Vec<IndexEntry> = serde_json::from_slice(&fs::read(dir.join(INDEX_FILE))?)?;

        if manifest.embedding_model != embedder.name() {
            warn!(
                "Index at {} was built with {} but is being queried with {}",
                dir.display(),
                manifest.embedding_model,
                embedder.name()
            );
        }

        debug!("Loaded index with {} documents from {}", entries.len(), dir.display());
        Ok(Self {
            embedder,
            entries,
            dimension: manifest.dimension,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rw_inference::models::hashing::HashingEmbedder;
    use tempfile::tempdir;

    fn article(title: &str, summary: &str, tags: &[&str], link: &str) -> NormalizedArticle {
        NormalizedArticle {
            title: title.to_string(),
            author: "Some Author".to_string(),
            site_name: "example.com".to_string(),
            link: link.to_string(),
            summary: summary.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn corpus() -> Vec<NormalizedArticle> {
        vec![
            article(
                "Neural networks in 2020",
                "How machine learning models learn representations",
                &["ai"],
                "https://example.com/nn",
            ),
            article(
                "The fall of the Berlin wall",
                "A history of 1990 reunification and machine politics",
                &["history"],
                "https://example.com/berlin",
            ),
            article(
                "Sourdough basics",
                "Flour water salt and patience",
                &["cooking"],
                "https://example.com/bread",
            ),
        ]
    }

    fn embedder() -> Arc<dyn EmbeddingModel> {
        Arc::new(HashingEmbedder::default())
    }

    fn titles(docs: &[IndexedDocument]) -> Vec<String> {
        docs.iter().map(|d| d.metadata.title.clone()).collect()
    }

    #[test]
    fn test_to_document() {
        let doc = to_document(&article(
            "Notes from 1995",
            "Revisited",
            &["ai"],
            "https://blog.example/2019/05/notes",
        ))
        .unwrap();

        assert_eq!(
            doc.content,
            r#"{"title":"Notes from 1995","author":"Some Author","site_name":"example.com","summary":"Revisited"}"#
        );
        assert_eq!(doc.metadata.link, "https://blog.example/2019/05/notes");
        assert_eq!(doc.metadata.tags, vec!["ai"]);
        assert_eq!(doc.metadata.years, vec![1995, 2019]);

        let no_years = to_document(&article("Plain", "text", &[], "x")).unwrap();
        assert!(no_years.metadata.years.is_empty());
    }

    #[tokio::test]
    async fn test_search_ranks_relevant_first() {
        let index = VectorIndex::from_articles(&corpus(), embedder()).await.unwrap();
        assert_eq!(index.len(), 3);

        let results = index
            .similarity_search("sourdough flour", 1, &SearchFilter::default())
            .await
            .unwrap();
        assert_eq!(titles(&results), vec!["Sourdough basics"]);

        let all = index
            .similarity_search("anything", 10, &SearchFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_tag_and_year_filters_are_hard() {
        let index = VectorIndex::from_articles(&corpus(), embedder()).await.unwrap();

        let by_tag = SearchFilter {
            tag_equals: Some("ai".to_string()),
            year_equals: None,
        };
        let results = index
            .similarity_search("Berlin wall history reunification", 10, &by_tag)
            .await
            .unwrap();
        assert_eq!(titles(&results), vec!["Neural networks in 2020"]);

        let by_year = SearchFilter {
            tag_equals: None,
            year_equals: Some(1990),
        };
        let results = index
            .similarity_search("neural networks machine learning", 10, &by_year)
            .await
            .unwrap();
        assert_eq!(titles(&results), vec!["The fall of the Berlin wall"]);

        let nothing = SearchFilter {
            tag_equals: Some("ai".to_string()),
            year_equals: Some(1990),
        };
        assert!(index.similarity_search("machine", 10, &nothing).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load_returns_same_matches() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::from_articles(&corpus(), embedder()).await.unwrap();
        index.save(dir.path()).unwrap();

        let loaded = VectorIndex::load(dir.path(), embedder()).unwrap();
        assert_eq!(loaded.len(), index.len());
        assert_eq!(loaded.dimension(), index.dimension());

        for query in ["machine learning", "bread", "history of Berlin"] {
            let before = index.similarity_search(query, 2, &SearchFilter::default()).await.unwrap();
            let after = loaded.similarity_search(query, 2, &SearchFilter::default()).await.unwrap();
            assert_eq!(titles(&before), titles(&after), "query {query}");
        }
    }

    #[tokio::test]
    async fn test_manifest_read() {
        let dir = tempdir().unwrap();
        assert!(IndexManifest::read(dir.path()).unwrap().is_none());

        let articles = vec![article("Rust", "Ownership and borrowing", &["rust"], "https://a")];
        let index = VectorIndex::from_articles(&articles, embedder()).await.unwrap();
        index.save(dir.path()).unwrap();

        let manifest = IndexManifest::read(dir.path()).unwrap().unwrap();
        assert_eq!(manifest.embedding_model, "hashing-384");
        assert_eq!(manifest.dimension, 384);
        assert_eq!(manifest.documents, 1);
    }

    #[tokio::test]
    async fn test_load_with_different_model_still_loads() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::from_articles(&corpus(), embedder()).await.unwrap();
        index.save(dir.path()).unwrap();

        let other: Arc<dyn EmbeddingModel> = Arc::new(HashingEmbedder::new(64));
        let loaded = VectorIndex::load(dir.path(), other).unwrap();
        assert_eq!(loaded.len(), 3);
        // vectors of a different size cannot be compared
        assert!(loaded
            .similarity_search("bread", 1, &SearchFilter::default())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_empty_index() {
        let index = VectorIndex::from_articles(&[], embedder()).await.unwrap();
        assert!(index.is_empty());
        assert!(index
            .similarity_search("anything", 5, &SearchFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_load_missing_directory_fails() {
        let dir = tempdir().unwrap();
        assert!(VectorIndex::load(&dir.path().join("missing"), embedder()).is_err());
    }
}
