use async_trait::async_trait;
use rw_core::{Result, SearchQuery, DEFAULT_SEARCH_LIMIT};
use rw_inference::Tool;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::manager::ArticleLibrary;

pub const SEARCH_TOOL_NAME: &str = "search_readwise";

const SEARCH_TOOL_DESCRIPTION: &str = "Query the index of saved Readwise articles for articles matching the given keywords.

Args:
    - keywords (str): The keywords to search for.
    - author (str): A specific AUTHOR to filter the results (optional).
    - site (str): A specific site, newsletter, source, etc. to filter the results (optional).
    - tag (str): A specific TAG to filter the results (optional). Omit it rather than passing an empty string.
    - year (int): A specific YEAR to filter the results (optional).
    - num_of_results (int): The number of results to return (default is 100).

Returns:
    list: A list of articles matching the criteria, each with title, author, site_name, link, tags and summary.";

/// Arguments as the chat model sends them.
#[derive(Debug, Default, Deserialize)]
pub struct SearchArgs {
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default, deserialize_with = "lenient_year")]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub num_of_results: Option<i64>,
}

/// Models sometimes quote numbers; accept `2020` and `"2020"` alike.
fn lenient_int<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected an integer, got {}", n))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected an integer, got {:?}", s))),
        Some(other) => Err(D::Error::custom(format!("expected an integer, got {}", other))),
    }
}

fn lenient_year<'de, D>(deserializer: D) -> std::result::Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    lenient_int(deserializer)?
        .map(|year| i32::try_from(year).map_err(|_| D::Error::custom(format!("year {} is out of range", year))))
        .transpose()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<SearchArgs> for SearchQuery {
    fn from(args: SearchArgs) -> Self {
        SearchQuery {
            keywords: args.keywords.unwrap_or_default(),
            author: non_empty(args.author),
            site: non_empty(args.site),
            // an empty tag still filters, and matches nothing
            tag: args.tag,
            year: args.year,
            limit: args
                .num_of_results
                .map(|n| n.max(0) as usize)
                .unwrap_or(DEFAULT_SEARCH_LIMIT),
        }
    }
}

/// Exposes [`ArticleLibrary::search`] to the agent.
pub struct SearchReadwiseTool {
    library: Arc<ArticleLibrary>,
}

impl SearchReadwiseTool {
    pub fn new(library: Arc<ArticleLibrary>) -> Self {
        Self { library }
    }
}

#[async_trait]
impl Tool for SearchReadwiseTool {
    fn name(&self) -> &str {
        SEARCH_TOOL_NAME
    }

    fn description(&self) -> &str {
        SEARCH_TOOL_DESCRIPTION
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "keywords": {"type": "string", "description": "The keywords to search for."},
                "author": {"type": "string", "description": "A specific AUTHOR to filter the results."},
                "site": {"type": "string", "description": "A specific site, newsletter or source to filter the results."},
                "tag": {"type": "string", "description": "A specific TAG to filter the results."},
                "year": {"type": "integer", "description": "A specific YEAR to filter the results."},
                "num_of_results": {
                    "type": "integer",
                    "description": "The number of results to return.",
                    "default": DEFAULT_SEARCH_LIMIT
                }
            },
            "required": ["keywords"]
        })
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let args: SearchArgs = serde_json::from_value(args)?;
        let results = self.library.search(&args.into()).await;
        Ok(serde_json::to_value(results)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ReaderConfig, ReadwiseClient};
    use rw_core::NormalizedArticle;
    use rw_inference::models::HashingEmbedder;
    use rw_storage::CacheDir;
    use tempfile::tempdir;

    fn args(value: Value) -> SearchQuery {
        serde_json::from_value::<SearchArgs>(value).unwrap().into()
    }

    #[test]
    fn test_args_to_query() {
        let query = args(json!({
            "keywords": "ivy lee",
            "author": "Edu",
            "site": "",
            "tag": "productivity",
            "year": "2023",
            "num_of_results": 5
        }));
        assert_eq!(query.keywords, "ivy lee");
        assert_eq!(query.author.as_deref(), Some("Edu"));
        assert_eq!(query.site, None);
        assert_eq!(query.tag.as_deref(), Some("productivity"));
        assert_eq!(query.year, Some(2023));
        assert_eq!(query.limit, 5);

        let empty_tag = args(json!({"keywords": "x", "author": "", "tag": ""}));
        assert_eq!(empty_tag.author, None);
        assert_eq!(empty_tag.tag.as_deref(), Some(""));

        let defaults = args(json!({}));
        assert_eq!(defaults, SearchQuery::default());

        let nulls = args(json!({"keywords": "x", "year": null, "num_of_results": 10.0}));
        assert_eq!(nulls.year, None);
        assert_eq!(nulls.limit, 10);
    }

    #[test]
    fn test_bad_year_is_rejected() {
        assert!(serde_json::from_value::<SearchArgs>(json!({"year": "last year"})).is_err());
        assert!(serde_json::from_value::<SearchArgs>(json!({"year": [2020]})).is_err());
        assert!(serde_json::from_value::<SearchArgs>(json!({"keywords": "x", "year": 99999999999i64})).is_err());
        assert!(serde_json::from_value::<SearchArgs>(json!({"year": "-99999999999"})).is_err());
    }

    #[tokio::test]
    async fn test_tool_returns_json_results() {
        let dir = tempdir().unwrap();
        let library = Arc::new(ArticleLibrary::new(
            ReadwiseClient::new(ReaderConfig::default()),
            CacheDir::new(dir.path()),
            Arc::new(HashingEmbedder::default()),
        ));
        library
            .index_articles(vec![NormalizedArticle {
                title: "The Ivy Lee Method".to_string(),
                author: "Edu Klein".to_string(),
                site_name: "eduklein.com.br".to_string(),
                link: "https://eduklein.com.br/ivy-lee".to_string(),
                summary: "Pick six tasks for tomorrow".to_string(),
                tags: vec!["productivity".to_string()],
            }])
            .await
            .unwrap();

        let tool = SearchReadwiseTool::new(library);
        assert_eq!(tool.name(), "search_readwise");
        assert_eq!(tool.definition().function.parameters["required"], json!(["keywords"]));

        let output = tool
            .call(json!({"keywords": "ivy lee method", "site": "eduklein.com.br"}))
            .await
            .unwrap();
        assert_eq!(
            output,
            json!([{
                "title": "The Ivy Lee Method",
                "author": "Edu Klein",
                "site_name": "eduklein.com.br",
                "link": "https://eduklein.com.br/ivy-lee",
                "tags": ["productivity"],
                "summary": "Pick six tasks for tomorrow"
            }])
        );

        let filtered = tool.call(json!({"keywords": "ivy", "tag": "history"})).await.unwrap();
        assert_eq!(filtered, json!([]));

        let empty_tag = tool.call(json!({"keywords": "ivy", "tag": ""})).await.unwrap();
        assert_eq!(empty_tag, json!([]));

        // a year that cannot exist is an argument error, never an unfiltered search
        assert!(tool.call(json!({"keywords": "ivy", "year": 99999999999i64})).await.is_err());
    }
}
