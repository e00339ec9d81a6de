use async_trait::async_trait;
use langchain_rust::embedding::embedder_trait::Embedder;
use langchain_rust::embedding::ollama::ollama_embedder::OllamaEmbedder;
use langchain_rust::llm::ollama::client::OllamaClient;
use rw_core::{EmbeddingModel, Error, Result};
use std::fmt;
use std::sync::Arc;
use url::Url;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/nomic-embed-text";
const DEFAULT_OLLAMA_MODEL: &str = "nomic-embed-text";

#[derive(Debug, Clone)]
pub struct OllamaEmbeddingConfig {
    ollama_host: String,
    ollama_port: u16,
    model_name: String,
}

impl Default for OllamaEmbeddingConfig {
    fn default() -> Self {
        Self {
            ollama_host: "http://localhost".to_string(),
            ollama_port: 11434,
            model_name: DEFAULT_OLLAMA_MODEL.to_string(),
        }
    }
}

impl OllamaEmbeddingConfig {
    /// Parse `http://host:port/model`. The path names the model.
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| Error::Config(format!("Invalid Ollama URL {}: {}", url, e)))?;
        let model_name = parsed.path().trim_start_matches('/').to_string();

        Ok(Self {
            ollama_host: format!("{}://{}", parsed.scheme(), parsed.host_str().unwrap_or("localhost")),
            ollama_port: parsed.port().unwrap_or(11434),
            model_name: if model_name.is_empty() {
                DEFAULT_OLLAMA_MODEL.to_string()
            } else {
                model_name
            },
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Embeddings served by a local Ollama instance through langchain-rust.
pub struct OllamaEmbeddings {
    embedder: OllamaEmbedder,
    config: OllamaEmbeddingConfig,
}

impl fmt::Debug for OllamaEmbeddings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaEmbeddings")
            .field("embedder", &"<OllamaEmbedder>")
            .field("config", &self.config)
            .finish()
    }
}

impl OllamaEmbeddings {
    pub fn new(config: OllamaEmbeddingConfig) -> Self {
        let client = Arc::new(OllamaClient::new(config.ollama_host.clone(), config.ollama_port));
        let embedder = OllamaEmbedder::new(client, config.model_name.clone(), None);
        Self { embedder, config }
    }
}

fn to_f32(vector: Vec<f64>) -> Vec<f32> {
    vector.into_iter().map(|x| x as f32).collect()
}

#[async_trait]
impl EmbeddingModel for OllamaEmbeddings {
    fn name(&self) -> &str {
        self.config.model_name()
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let vectors = self
            .embedder
            .embed_documents(texts)
            .await
            .map_err(|e| Error::Inference(format!("Ollama embedding failed: {}", e)))?;
        Ok(vectors.into_iter().map(to_f32).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self
            .embedder
            .embed_query(text)
            .await
            .map_err(|e| Error::Inference(format!("Ollama embedding failed: {}", e)))?;
        Ok(to_f32(vector))
    }
}
