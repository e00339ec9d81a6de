use std::env;

pub mod agent;
pub mod chat;
pub mod models;

pub use agent::{AgentExecutor, Tool};
pub use chat::{create_chat_model, ChatConfig, ChatModel, ChatProvider};
pub use models::{create_embedding_model, EmbeddingConfig, EmbeddingProvider};

/// Model configuration for one pipeline run. Built by the caller and passed
/// to the factories; nothing here is global.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub embedding: EmbeddingConfig,
    pub chat: ChatConfig,
}

impl Config {
    /// Pick up API keys from `OPENAI_API_KEY` and `DEEPSEEK_API_KEY`.
    pub fn from_env(embedding: EmbeddingProvider, chat: ChatProvider) -> Self {
        let openai_key = env::var("OPENAI_API_KEY").ok();
        let chat_key = match chat {
            ChatProvider::DeepSeek => env::var("DEEPSEEK_API_KEY").ok(),
            ChatProvider::OpenAi => openai_key.clone(),
        };

        Self {
            embedding: EmbeddingConfig {
                provider: embedding,
                api_key: openai_key,
                ..Default::default()
            },
            chat: ChatConfig {
                provider: chat,
                api_key: chat_key,
                ..Default::default()
            },
        }
    }
}

pub mod prelude {
    pub use super::agent::{AgentExecutor, Tool};
    pub use super::chat::{ChatMessage, ChatModel, ToolDefinition};
    pub use super::Config;
    pub use rw_core::{EmbeddingModel, Error, Result};
}
