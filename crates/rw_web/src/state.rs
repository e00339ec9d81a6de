use rw_inference::{AgentExecutor, Tool};
use rw_reader::{ArticleLibrary, SearchReadwiseTool};
use std::sync::Arc;

pub struct AppState {
    pub library: Arc<ArticleLibrary>,
    pub search_tool: Arc<SearchReadwiseTool>,
    /// `None` when no chat model is configured; `/api/ask` then answers 503.
    pub agent: Option<Arc<AgentExecutor>>,
}

impl AppState {
    pub fn new(library: Arc<ArticleLibrary>) -> Self {
        Self {
            search_tool: Arc::new(SearchReadwiseTool::new(library.clone())),
            library,
            agent: None,
        }
    }

    pub fn with_agent(mut self, agent: Arc<AgentExecutor>) -> Self {
        self.agent = Some(agent);
        self
    }

    pub fn tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![self.search_tool.clone() as Arc<dyn Tool>]
    }
}
