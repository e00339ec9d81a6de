use crate::types::{NormalizedArticle, RawArticle};

pub const NO_TITLE: &str = "No title available";
pub const NO_AUTHOR: &str = "No author available";
pub const NO_SOURCE: &str = "No source available";
pub const NO_URL: &str = "No URL available";
pub const NO_SUMMARY: &str = "No summary available";

/// Project a raw API record onto the fixed article shape, filling in
/// placeholders for anything the service left out.
pub fn normalize(raw: RawArticle) -> NormalizedArticle {
    NormalizedArticle {
        title: raw.title.unwrap_or_else(|| NO_TITLE.to_string()),
        author: raw.author.unwrap_or_else(|| NO_AUTHOR.to_string()),
        site_name: raw.site_name.unwrap_or_else(|| NO_SOURCE.to_string()),
        link: raw.source_url.unwrap_or_else(|| NO_URL.to_string()),
        summary: raw.summary.unwrap_or_else(|| NO_SUMMARY.to_string()),
        tags: raw.tags.unwrap_or_default(),
    }
}

pub fn normalize_all(raw: Vec<RawArticle>) -> Vec<NormalizedArticle> {
    raw.into_iter().map(normalize).collect()
}

impl From<RawArticle> for NormalizedArticle {
    fn from(raw: RawArticle) -> Self {
        normalize(raw)
    }
}
