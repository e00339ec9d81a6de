use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// An article as delivered by the Readwise Reader list endpoint.
///
/// Every field is optional; a JSON `null` decodes the same as a missing key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawArticle {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Option<Vec<String>>,
}

/// Readwise sends tags either as a list of names or as an object keyed by name.
fn deserialize_tags<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(name) => Some(name),
                    Value::Object(map) => map
                        .get("name")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    _ => None,
                })
                .collect(),
        ),
        Some(Value::Object(map)) => Some(map.into_iter().map(|(name, _)| name).collect()),
        _ => None,
    })
}

/// An article reduced to the fields the index cares about. This is the shape
/// written to the cache snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedArticle {
    pub title: String,
    pub author: String,
    pub site_name: String,
    pub link: String,
    pub summary: String,
    pub tags: Vec<String>,
}

/// The embedded part of an indexed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentContent {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub site_name: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub author: String,
    pub site_name: String,
    pub link: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub years: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    /// Serialized [`DocumentContent`]; this is the text that gets embedded.
    pub content: String,
    pub metadata: DocumentMetadata,
}

/// A search hit as handed back to the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultArticle {
    pub title: String,
    pub author: String,
    pub site_name: String,
    pub link: String,
    pub tags: Vec<String>,
    pub summary: String,
}

pub const DEFAULT_SEARCH_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub keywords: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            keywords: String::new(),
            author: None,
            site: None,
            tag: None,
            year: None,
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl SearchQuery {
    pub fn new(keywords: impl Into<String>) -> Self {
        Self {
            keywords: keywords.into(),
            ..Default::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = Some(site.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// The text sent to the embedding model. Author and site are appended as
    /// inline hints and only influence ranking, never filtering.
    pub fn effective_query(&self) -> String {
        let mut query = self.keywords.clone();
        if let Some(author) = self.author.as_deref().filter(|a| !a.is_empty()) {
            query.push_str(&format!(" author:{}", author));
        }
        if let Some(site) = self.site.as_deref().filter(|s| !s.is_empty()) {
            query.push_str(&format!(" site:{}", site));
        }
        query
    }

    pub fn filter(&self) -> SearchFilter {
        SearchFilter {
            tag_equals: self.tag.clone(),
            year_equals: self.year,
        }
    }
}

/// Hard constraints evaluated against document metadata during search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_equals: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_equals: Option<i32>,
}

impl SearchFilter {
    pub fn is_empty(&self) -> bool {
        self.tag_equals.is_none() && self.year_equals.is_none()
    }

    pub fn matches(&self, metadata: &DocumentMetadata) -> bool {
        let tag_ok = self
            .tag_equals
            .as_ref()
            .map_or(true, |tag| metadata.tags.iter().any(|t| t == tag));
        let year_ok = self
            .year_equals
            .map_or(true, |year| metadata.years.contains(&year));
        tag_ok && year_ok
    }
}
