use rw_core::{EmbeddingModel, Error, Result};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

pub mod hashing;
pub mod openai;

#[cfg(feature = "ollama")]
pub mod langchain;

pub use hashing::HashingEmbedder;
pub use openai::OpenAiEmbeddings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbeddingProvider {
    #[default]
    OpenAi,
    Hashing,
    Ollama,
}

impl FromStr for EmbeddingProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "hashing" | "offline" => Ok(Self::Hashing),
            "ollama" => Ok(Self::Ollama),
            other => Err(Error::Config(format!(
                "Unknown embedding model: {}. Available models: openai (default), hashing, ollama",
                other
            ))),
        }
    }
}

impl fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Hashing => write!(f, "hashing"),
            Self::Ollama => write!(f, "ollama"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    /// Base URL override; for Ollama this is `http://host:port/model`.
    pub url: Option<String>,
}

/// Build the embedding model once per run; the caller owns and shares it.
pub fn create_embedding_model(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingModel>> {
    let model: Arc<dyn EmbeddingModel> = match config.provider {
        EmbeddingProvider::OpenAi => {
            let mut model = OpenAiEmbeddings::new(config.api_key.clone());
            if let Some(url) = &config.url {
                model = model.with_base_url(url.as_str());
            }
            if let Some(name) = &config.model_name {
                model = model.with_model(name.as_str());
            }
            Arc::new(model)
        }
        EmbeddingProvider::Hashing => Arc::new(HashingEmbedder::default()),
        #[cfg(feature = "ollama")]
        EmbeddingProvider::Ollama => {
            let url = config.url.as_deref().unwrap_or(langchain::DEFAULT_OLLAMA_URL);
            Arc::new(langchain::OllamaEmbeddings::new(
                langchain::OllamaEmbeddingConfig::from_url(url)?,
            ))
        }
        #[cfg(not(feature = "ollama"))]
        EmbeddingProvider::Ollama => {
            return Err(Error::Config(
                "Ollama embeddings require building with the `ollama` feature".to_string(),
            ))
        }
    };
    info!("🔢 Embedding model ready: {}", model.name());
    Ok(model)
}
