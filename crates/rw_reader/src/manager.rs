use rw_core::{
    normalize_all, EmbeddingModel, IndexedDocument, NormalizedArticle, Result, ResultArticle,
    SearchQuery,
};
use rw_storage::{CacheDir, VectorIndex};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::client::ReadwiseClient;
use crate::logging::Logger;

/// Articles plus the index built over them.
#[derive(Debug)]
pub struct LibrarySnapshot {
    pub articles: Vec<NormalizedArticle>,
    pub index: VectorIndex,
    /// The snapshot file backing this data, if one was written or reused.
    pub path: Option<PathBuf>,
}

/// Ties the Readwise client, the disk cache and the index together.
pub struct ArticleLibrary {
    client: ReadwiseClient,
    cache: CacheDir,
    embedder: Arc<dyn EmbeddingModel>,
    logger: Logger,
}

impl fmt::Debug for ArticleLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArticleLibrary")
            .field("client", &self.client)
            .field("cache", &self.cache)
            .field("embedder", &self.embedder.name())
            .finish()
    }
}

impl ArticleLibrary {
    pub fn new(client: ReadwiseClient, cache: CacheDir, embedder: Arc<dyn EmbeddingModel>) -> Self {
        Self {
            client,
            cache,
            embedder,
            logger: Logger::new().with_prefix("🗄️").with_prefix("library"),
        }
    }

    pub fn cache(&self) -> &CacheDir {
        &self.cache
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingModel> {
        &self.embedder
    }

    /// Reuse a fresh snapshot and its index, or fetch and rebuild everything.
    pub async fn load_or_build(&self) -> Result<LibrarySnapshot> {
        match self.cache.locate()? {
            Some(path) => {
                self.logger.debug(&format!("Loading cached snapshot {}", path.display()));
                let articles = CacheDir::read_snapshot(&path)?;
                let index = VectorIndex::load(&self.cache.index_dir(), self.embedder.clone())?;
                Ok(LibrarySnapshot {
                    articles,
                    index,
                    path: Some(path),
                })
            }
            None => {
                self.logger.info("No fresh cache, fetching archive");
                self.refresh().await
            }
        }
    }

    /// Fetch the whole archive and rebuild regardless of cache freshness.
    pub async fn refresh(&self) -> Result<LibrarySnapshot> {
        let raw = self.client.fetch_all_archived().await?;
        self.index_articles(normalize_all(raw)).await
    }

    /// Build and persist the index for `articles`, then write the snapshot.
    ///
    /// The snapshot goes last so a fresh snapshot always has a matching index
    /// on disk. Nothing is written when there are no articles.
    pub async fn index_articles(&self, articles: Vec<NormalizedArticle>) -> Result<LibrarySnapshot> {
        if articles.is_empty() {
            self.logger.warn("No articles to index");
            return Ok(LibrarySnapshot {
                articles,
                index: VectorIndex::empty(self.embedder.clone()),
                path: None,
            });
        }

        let index = VectorIndex::from_articles(&articles, self.embedder.clone()).await?;
        index.save(&self.cache.index_dir())?;
        let path = self.cache.write_snapshot(&articles)?;
        self.logger.info(&format!("Cached {} articles to {}", articles.len(), path.display()));

        Ok(LibrarySnapshot {
            articles,
            index,
            path: Some(path),
        })
    }

    pub async fn articles(&self) -> Result<Vec<NormalizedArticle>> {
        Ok(self.load_or_build().await?.articles)
    }

    /// Search the archive. Failures are logged and come back as no results,
    /// so an empty list means either "no match" or "something went wrong".
    pub async fn search(&self, query: &SearchQuery) -> Vec<ResultArticle> {
        match self.try_search(query).await {
            Ok(results) => results,
            Err(e) => {
                self.logger.error(&format!("Error querying index: {}", e));
                Vec::new()
            }
        }
    }

    pub async fn try_search(&self, query: &SearchQuery) -> Result<Vec<ResultArticle>> {
        let snapshot = self.load_or_build().await?;
        let effective = query.effective_query();
        self.logger.debug(&format!("Searching for {:?} with {:?}", effective, query.filter()));

        let documents = snapshot
            .index
            .similarity_search(&effective, query.limit, &query.filter())
            .await?;
        documents.iter().map(to_result_article).collect()
    }
}

/// Rebuild the agent-facing article from an indexed document.
pub fn to_result_article(document: &IndexedDocument) -> Result<ResultArticle> {
    let content: Value = serde_json::from_str(&document.content)?;
    let field = |key: &str, fallback: &str| {
        content
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(fallback)
            .to_string()
    };

    Ok(ResultArticle {
        title: field("title", "No title"),
        author: field("author", "No author"),
        site_name: field("site_name", "No source"),
        link: document.metadata.link.clone(),
        tags: document.metadata.tags.clone(),
        summary: field("summary", "No summary"),
    })
}
