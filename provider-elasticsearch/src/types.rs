//! Elasticsearch request and response bodies

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// `_search` and `_search/scroll` response
#[derive(Debug, Deserialize)]
pub struct SearchResponse<S> {
    #[serde(rename = "_scroll_id", default)]
    pub scroll_id: Option<String>,
    pub hits: Hits<S>,
}

#[derive(Debug, Deserialize)]
pub struct Hits<S> {
    #[serde(default = "Vec::new")]
    pub hits: Vec<Hit<S>>,
}

#[derive(Debug, Deserialize)]
pub struct Hit<S> {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source")]
    pub source: S,
}

/// `_source` filtered to the modification timestamp
#[derive(Debug, Deserialize)]
pub struct ModifiedSource {
    #[serde(default)]
    pub modified: Option<String>,
}

/// `_source` filtered to the fields a search result shows
#[derive(Debug, Deserialize)]
pub struct HitSource {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ScrollRequest<'a> {
    pub scroll: &'a str,
    pub scroll_id: &'a str,
}

/// Field mappings applied when the index is created
pub fn index_mappings() -> Value {
    json!({
        "mappings": {
            "properties": {
                "file_name": {
                    "type": "text",
                    "fields": { "keyword": { "type": "keyword", "ignore_above": 1024 } }
                },
                "url": { "type": "keyword" },
                "content": { "type": "text" },
                "modified": { "type": "date" }
            }
        }
    })
}
