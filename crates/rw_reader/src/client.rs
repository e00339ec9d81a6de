use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use rw_core::{RawArticle, Result};
use serde::Deserialize;
use std::env;
use std::fmt;

use crate::logging::Logger;

pub const PAGE_SIZE: usize = 100;
pub const ARCHIVE_LOCATION: &str = "archive";

/// Where the Readwise Reader API lives and how to authenticate.
///
/// Values are not checked; an empty endpoint or token shows up later as a
/// request or authentication error.
#[derive(Clone, Default)]
pub struct ReaderConfig {
    pub endpoint: String,
    pub token: String,
}

impl ReaderConfig {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: token.into(),
        }
    }

    /// Read `READWISE_ENDPOINT` and `READWISE_API_TOKEN`.
    pub fn from_env() -> Self {
        Self {
            endpoint: env::var("READWISE_ENDPOINT").unwrap_or_default(),
            token: env::var("READWISE_API_TOKEN").unwrap_or_default(),
        }
    }
}

impl fmt::Debug for ReaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    results: Vec<RawArticle>,
    #[serde(default, rename = "nextPageCursor")]
    next_page_cursor: Option<String>,
}

pub struct ReadwiseClient {
    client: Client,
    config: ReaderConfig,
    logger: Logger,
}

impl fmt::Debug for ReadwiseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadwiseClient")
            .field("client", &"<reqwest::Client>")
            .field("config", &self.config)
            .finish()
    }
}

impl ReadwiseClient {
    pub fn new(config: ReaderConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            logger: Logger::new().with_prefix("📚").with_prefix("readwise"),
        }
    }

    fn list_url(&self) -> String {
        format!("{}/list/", self.config.endpoint.trim_end_matches('/'))
    }

    /// Page through every archived article, one request at a time.
    ///
    /// A non-200 page ends the walk and whatever was collected so far is
    /// returned. Paging continues for as long as the server hands out a
    /// cursor; there is no page cap.
    pub async fn fetch_all_archived(&self) -> Result<Vec<RawArticle>> {
        let mut articles = Vec::new();
        let mut cursor: Option<String> = None;
        let mut page = 0usize;

        loop {
            page += 1;
            let mut params = vec![
                ("limit", PAGE_SIZE.to_string()),
                ("location", ARCHIVE_LOCATION.to_string()),
            ];
            if let Some(cursor) = &cursor {
                params.push(("pageCursor", cursor.clone()));
            }

            let response = self
                .client
                .get(self.list_url())
                .header(AUTHORIZATION, format!("Token {}", self.config.token))
                .query(&params)
                .send()
                .await?;

            let status = response.status();
            if status != StatusCode::OK {
                let body = response.text().await.unwrap_or_default();
                self.logger.error(&format!("Error fetching articles: {}", status.as_u16()));
                self.logger.error(&body);
                break;
            }

            let data = response.json::<ListResponse>().await?;
            self.logger.debug(&format!("Page {}: {} articles", page, data.results.len()));
            articles.extend(data.results);

            match data.next_page_cursor.filter(|c| !c.is_empty()) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        self.logger.info(&format!("Fetched {} archived articles in {} requests", articles.len(), page));
        Ok(articles)
    }
}
