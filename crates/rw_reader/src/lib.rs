pub mod client;
pub mod logging;
pub mod manager;
pub mod tools;

pub use client::{ReaderConfig, ReadwiseClient};
pub use logging::{init_logging, Logger};
pub use manager::{to_result_article, ArticleLibrary, LibrarySnapshot};
pub use tools::{SearchArgs, SearchReadwiseTool, SEARCH_TOOL_NAME};

pub mod prelude {
    pub use super::client::ReadwiseClient;
    pub use super::manager::ArticleLibrary;
    pub use super::tools::SearchReadwiseTool;
    pub use rw_core::{Error, NormalizedArticle, Result, ResultArticle, SearchQuery};
}
