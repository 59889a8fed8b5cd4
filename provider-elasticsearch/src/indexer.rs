//! Elasticsearch-backed `IndexPort`

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
use bridge_traits::index::{Document, IndexPort, MetadataSnapshot, SearchHit};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{ElasticsearchError, Result};
use crate::types::{index_mappings, HitSource, ModifiedSource, ScrollRequest, SearchResponse};

/// Largest `size` a plain search may request without deep paging
pub const DEFAULT_SEARCH_LIMIT: usize = 10_000;

/// Hits per scroll page when reading the snapshot
const SCROLL_PAGE_SIZE: usize = 1000;

/// Scroll context keep-alive between pages
const SCROLL_KEEP_ALIVE: &str = "1m";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Elasticsearch index adapter
///
/// Talks to the REST API through an [`HttpClient`]. The snapshot is read with
/// the scroll API so it is not capped at the search window.
pub struct ElasticsearchIndexer {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    index: String,
    search_limit: usize,
}

impl ElasticsearchIndexer {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        index: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            index: index.into(),
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit.max(1);
        self
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }

    /// Create the index with explicit mappings unless it already exists
    #[instrument(skip(self), fields(index = %self.index))]
    pub async fn ensure_index(&self) -> Result<()> {
        let response = self
            .http_client
            .execute(self.request(HttpMethod::Head, self.index_url()))
            .await?;

        match response.status {
            200 => {
                debug!("Index already exists");
                Ok(())
            }
            404 => {
                let request = self
                    .request(HttpMethod::Put, self.index_url())
                    .json(&index_mappings())?;
                let response = self.http_client.execute(request).await?;
                if response.is_success() {
                    info!("Created index");
                    Ok(())
                } else if response.status == 400
                    && response.error_text().contains("resource_already_exists_exception")
                {
                    debug!("Index created concurrently");
                    Ok(())
                } else {
                    Err(api_error(&response))
                }
            }
            _ => Err(api_error(&response)),
        }
    }

    fn index_url(&self) -> String {
        format!("{}/{}", self.base_url, self.index)
    }

    fn doc_url(&self, id: &str) -> String {
        format!("{}/_doc/{}", self.index_url(), urlencoding::encode(id))
    }

    fn request(&self, method: HttpMethod, url: String) -> HttpRequest {
        HttpRequest::new(method, url)
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT)
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self.http_client.execute(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(api_error(&response))
        }
    }

    /// Document writes go out once; a failed write is retried by the next pass
    async fn write(&self, request: HttpRequest) -> Result<HttpResponse> {
        Ok(self
            .http_client
            .execute_with_retry(request, RetryPolicy::no_retry())
            .await?)
    }

    async fn search_page<S: DeserializeOwned>(
        &self,
        request: HttpRequest,
    ) -> Result<SearchResponse<S>> {
        let response = self.send(request).await?;
        serde_json::from_slice(&response.body)
            .map_err(|e| ElasticsearchError::ParseError(e.to_string()))
    }

    async fn clear_scroll(&self, scroll_id: &str) {
        let request = match self
            .request(HttpMethod::Delete, format!("{}/_search/scroll", self.base_url))
            .json(&json!({ "scroll_id": [scroll_id] }))
        {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Failed to build clear-scroll request");
                return;
            }
        };

        if let Err(e) = self.send(request).await {
            warn!(error = %e, "Failed to clear scroll context");
        }
    }

    async fn read_snapshot(&self) -> Result<MetadataSnapshot> {
        let request = self
            .request(
                HttpMethod::Post,
                format!("{}/_search?scroll={}", self.index_url(), SCROLL_KEEP_ALIVE),
            )
            .json(&json!({
                "size": SCROLL_PAGE_SIZE,
                "_source": ["modified"],
                "query": { "match_all": {} },
                "sort": ["_doc"]
            }))?;

        let mut page: SearchResponse<ModifiedSource> = match self.search_page(request).await {
            Ok(page) => page,
            Err(ElasticsearchError::ApiError {
                status_code: 404, ..
            }) => {
                warn!("Index missing while reading snapshot, treating as empty");
                return Ok(MetadataSnapshot::new());
            }
            Err(e) => return Err(e),
        };

        let mut snapshot = MetadataSnapshot::new();
        let mut scroll_id = page.scroll_id.take();
        let result = loop {
            if page.hits.hits.is_empty() {
                break Ok(());
            }
            for hit in page.hits.hits.drain(..) {
                let modified = parse_modified(&hit.id, hit.source.modified.as_deref());
                snapshot.insert(hit.id, modified);
            }

            let Some(id) = scroll_id.as_deref() else {
                break Ok(());
            };
            let next = self
                .request(HttpMethod::Post, format!("{}/_search/scroll", self.base_url))
                .json(&ScrollRequest {
                    scroll: SCROLL_KEEP_ALIVE,
                    scroll_id: id,
                })
                .map_err(ElasticsearchError::from);
            let next = match next {
                Ok(request) => self.search_page(request).await,
                Err(e) => Err(e),
            };
            match next {
                Ok(mut next_page) => {
                    if let Some(id) = next_page.scroll_id.take() {
                        scroll_id = Some(id);
                    }
                    page = next_page;
                }
                Err(e) => break Err(e),
            }
        };

        if let Some(id) = scroll_id {
            self.clear_scroll(&id).await;
        }

        result.map(|()| snapshot)
    }
}

#[async_trait]
impl IndexPort for ElasticsearchIndexer {
    #[instrument(skip(self), fields(index = %self.index))]
    async fn metadata_snapshot(&self) -> BridgeResult<MetadataSnapshot> {
        let snapshot = self.read_snapshot().await?;
        debug!(documents = snapshot.len(), "Read index snapshot");
        Ok(snapshot)
    }

    #[instrument(skip(self, document), fields(index = %self.index, id = %document.id))]
    async fn upsert(&self, document: &Document) -> BridgeResult<()> {
        let request = self
            .request(HttpMethod::Put, self.doc_url(&document.id))
            .json(document)?;
        let response = self.write(request).await?;
        if !response.is_success() {
            return Err(api_error(&response).into());
        }
        debug!(file_name = %document.file_name, "Upserted document");
        Ok(())
    }

    #[instrument(skip(self), fields(index = %self.index))]
    async fn delete(&self, id: &str) -> BridgeResult<()> {
        let response = self
            .write(self.request(HttpMethod::Delete, self.doc_url(id)))
            .await?;

        match response.status {
            404 => {
                debug!("Document already absent");
                Ok(())
            }
            _ if response.is_success() => Ok(()),
            _ => Err(api_error(&response).into()),
        }
    }

    #[instrument(skip(self), fields(index = %self.index))]
    async fn search(&self, query: &str) -> BridgeResult<Vec<SearchHit>> {
        let request = self
            .request(HttpMethod::Post, format!("{}/_search", self.index_url()))
            .json(&json!({
                "size": self.search_limit,
                "_source": ["file_name", "url"],
                "query": { "match": { "content": query } }
            }))?;

        let response: SearchResponse<HitSource> = self.search_page(request).await?;
        let hits: Vec<SearchHit> = response
            .hits
            .hits
            .into_iter()
            .map(|hit| SearchHit {
                id: hit.id,
                file_name: hit.source.file_name,
                url: hit.source.url,
                score: hit.score,
            })
            .collect();

        debug!(hits = hits.len(), "Search completed");
        Ok(hits)
    }
}

fn api_error(response: &HttpResponse) -> ElasticsearchError {
    ElasticsearchError::ApiError {
        status_code: response.status,
        message: response.error_text(),
    }
}

/// Stored `modified` value; unreadable values sort before any real timestamp
/// so the file is treated as changed and re-indexed.
fn parse_modified(id: &str, raw: Option<&str>) -> DateTime<Utc> {
    match raw.map(DateTime::parse_from_rfc3339) {
        Some(Ok(dt)) => dt.with_timezone(&Utc),
        Some(Err(e)) => {
            warn!(id, raw = ?raw, error = %e, "Unparsable modified timestamp in index");
            DateTime::<Utc>::MIN_UTC
        }
        None => {
            warn!(id, "Indexed document has no modified timestamp");
            DateTime::<Utc>::MIN_UTC
        }
    }
}
