//! Search collaborator: trait plus an Exa-compatible HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use demoforge_shared::{DemoForgeError, Result, USER_AGENT};

/// Default timeout in seconds for search requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Characters of page text requested per result.
const SNIPPET_CHARS: u32 = 1_000;

/// One search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub num_results: usize,
    /// Result category hint (e.g. `company`).
    pub category: String,
    /// Let the engine rewrite the query.
    pub use_autoprompt: bool,
}

/// One search hit, in collaborator order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub id: String,
    pub url: String,
    pub title: String,
    pub text: String,
}

/// Anything that can answer a [`SearchRequest`].
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>>;
}

// ---------------------------------------------------------------------------
// Exa client
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaSearchBody<'a> {
    query: &'a str,
    num_results: usize,
    category: &'a str,
    use_autoprompt: bool,
    contents: ExaContents,
}

#[derive(Debug, Serialize)]
struct ExaContents {
    text: ExaText,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaText {
    max_characters: u32,
}

#[derive(Debug, Deserialize)]
struct ExaSearchResponse {
    #[serde(default)]
    results: Vec<ExaResult>,
}

#[derive(Debug, Deserialize)]
struct ExaResult {
    #[serde(default)]
    id: Option<String>,
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

/// Search client for the Exa `/search` endpoint.
pub struct ExaSearchClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl ExaSearchClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| DemoForgeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl SearchProvider for ExaSearchClient {
    #[instrument(skip_all, fields(query = %request.query, num_results = request.num_results))]
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let url = format!("{}/search", self.base_url);
        let body = ExaSearchBody {
            query: &request.query,
            num_results: request.num_results,
            category: &request.category,
            use_autoprompt: request.use_autoprompt,
            contents: ExaContents {
                text: ExaText {
                    max_characters: SNIPPET_CHARS,
                },
            },
        };

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DemoForgeError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DemoForgeError::collaborator(
                "search",
                format!("{url}: HTTP {status}"),
            ));
        }

        let parsed: ExaSearchResponse = response
            .json()
            .await
            .map_err(|e| DemoForgeError::parse(format!("search response: {e}")))?;

        debug!(results = parsed.results.len(), "search returned");

        Ok(parsed
            .results
            .into_iter()
            .map(|r| SearchHit {
                id: r.id.unwrap_or_else(|| r.url.clone()),
                title: r.title.unwrap_or_default(),
                text: r.text.unwrap_or_default(),
                url: r.url,
            })
            .collect())
    }
}
