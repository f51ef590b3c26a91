//! Candidate discovery: search, then location/specialty/custom post-filters.
//!
//! The search collaborator is asked for twice as many results as needed
//! (capped at [`MAX_SEARCH_RESULTS`]) so that post-filtering still leaves
//! enough candidates. Filters run in a fixed order:
//!
//! 1. location, expanded through a synonym table ([`location`])
//! 2. specialty, as a case-insensitive substring
//! 3. custom natural-language filters ([`filters`])
//!
//! and the survivors are truncated to the requested count.

pub mod filters;
pub mod location;
mod search;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use demoforge_shared::{DemoForgeError, LeadCandidate, Result, WorkflowSpec, domain_of};

pub use filters::{FilterRule, parse_filters, passes};
pub use location::{matches_location, synonyms_for};
pub use search::{ExaSearchClient, SearchHit, SearchProvider, SearchRequest};

/// Upper bound on results requested from the search collaborator.
pub const MAX_SEARCH_RESULTS: usize = 20;

/// Search category sent with every discovery query.
const SEARCH_CATEGORY: &str = "company";

// ---------------------------------------------------------------------------
// DiscoveryRequest
// ---------------------------------------------------------------------------

/// Everything discovery needs for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryRequest {
    pub query: String,
    pub count: usize,
    pub location: Option<String>,
    pub specialty: Option<String>,
    pub filters: Vec<String>,
}

impl DiscoveryRequest {
    /// Build a request from a workflow spec, falling back to `default_query`
    /// when the workflow gives nothing to search for.
    pub fn from_spec(spec: &WorkflowSpec, default_query: &str) -> Self {
        Self {
            query: build_query(spec, default_query),
            count: spec.lead_count as usize,
            location: non_blank(spec.location.as_deref()),
            specialty: non_blank(spec.specialty.as_deref()),
            filters: spec.filters.clone(),
        }
    }
}

/// Search query for a spec.
///
/// An explicit `search_query` wins. Otherwise a specialty or location yields
/// `"{specialty or 'aesthetic'} clinic[ in {location}]"`, and a spec with
/// neither uses `default_query`.
pub fn build_query(spec: &WorkflowSpec, default_query: &str) -> String {
    if let Some(query) = non_blank(spec.search_query.as_deref()) {
        return query;
    }

    let specialty = non_blank(spec.specialty.as_deref());
    let location = non_blank(spec.location.as_deref());
    if specialty.is_none() && location.is_none() {
        return default_query.to_string();
    }

    let mut query = format!("{} clinic", specialty.as_deref().unwrap_or("aesthetic"));
    if let Some(location) = location {
        query.push_str(" in ");
        query.push_str(&location);
    }
    query
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Candidate discovery over a [`SearchProvider`].
#[derive(Clone)]
pub struct Discovery {
    search: Arc<dyn SearchProvider>,
}

impl Discovery {
    pub fn new(search: Arc<dyn SearchProvider>) -> Self {
        Self { search }
    }

    /// Find up to `request.count` candidates.
    ///
    /// Fails with [`DemoForgeError::NoCandidatesFound`] when the search returns
    /// nothing or every result is filtered out.
    #[instrument(skip_all, fields(query = %request.query, count = request.count))]
    pub async fn discover(&self, request: &DiscoveryRequest) -> Result<Vec<LeadCandidate>> {
        if request.count == 0 {
            return Err(DemoForgeError::validation("lead count must be at least 1"));
        }

        let search_request = SearchRequest {
            query: request.query.clone(),
            num_results: (request.count * 2).min(MAX_SEARCH_RESULTS),
            category: SEARCH_CATEGORY.to_string(),
            use_autoprompt: true,
        };
        let hits = self.search.search(&search_request).await?;

        if hits.is_empty() {
            warn!("search returned no results");
            return Err(self.no_candidates(request));
        }

        let mut candidates = to_candidates(hits);
        debug!(candidates = candidates.len(), "search results deduplicated");

        if let Some(location) = &request.location {
            let synonyms = synonyms_for(location);
            candidates.retain(|c| matches_location(c, &synonyms));
            debug!(%location, remaining = candidates.len(), "location filter applied");
        }

        if let Some(specialty) = &request.specialty {
            let needle = specialty.to_lowercase();
            candidates.retain(|c| {
                c.title.to_lowercase().contains(&needle) || c.snippet.to_lowercase().contains(&needle)
            });
            debug!(%specialty, remaining = candidates.len(), "specialty filter applied");
        }

        let rules = parse_filters(&request.filters);
        if !rules.is_empty() {
            candidates.retain(|c| passes(c, &rules));
            debug!(rules = rules.len(), remaining = candidates.len(), "custom filters applied");
        }

        if candidates.is_empty() {
            warn!("every search result was filtered out");
            return Err(self.no_candidates(request));
        }

        candidates.truncate(request.count);
        info!(found = candidates.len(), "discovery complete");
        Ok(candidates)
    }

    fn no_candidates(&self, request: &DiscoveryRequest) -> DemoForgeError {
        DemoForgeError::NoCandidatesFound {
            query: request.query.clone(),
        }
    }
}

/// Convert hits into candidates, dropping blank URLs and repeated domains.
fn to_candidates(hits: Vec<SearchHit>) -> Vec<LeadCandidate> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|hit| !hit.url.trim().is_empty())
        .filter(|hit| {
            let key = domain_of(&hit.url)
                .map(|d| d.trim_start_matches("www.").to_string())
                .unwrap_or_else(|| hit.url.clone());
            seen.insert(key)
        })
        .map(|hit| LeadCandidate {
            url: hit.url,
            title: hit.title,
            snippet: hit.text,
            external_id: hit.id,
        })
        .collect()
}
