//! Notion-compatible database client and property mapping.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, instrument};

use demoforge_shared::{DemoForgeError, LeadRecord, PracticeProfile, Result, USER_AGENT};

use crate::{LeadStore, SortOrder};

/// API version header sent with every request.
const NOTION_VERSION: &str = "2022-06-28";

/// Notion rejects rich text longer than this.
const MAX_RICH_TEXT: usize = 2_000;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

// Property names in the lead database.
pub const PROP_COMPANY: &str = "Company";
pub const PROP_WEBSITE: &str = "Website";
pub const PROP_CONTACT: &str = "Contact";
pub const PROP_EMAIL: &str = "Email";
pub const PROP_PHONE: &str = "Phone";
pub const PROP_LOCATION: &str = "Location";
pub const PROP_SERVICES: &str = "Services";
pub const PROP_PRACTICE_TYPE: &str = "Practice Type";
pub const PROP_LEAD_SCORE: &str = "Lead Score";
pub const PROP_LEAD_SOURCE: &str = "Lead Source";
pub const PROP_STABLE_ID: &str = "Practice ID";
pub const PROP_STATUS: &str = "Status";
pub const PROP_DEMO_URL: &str = "Demo URL";
pub const PROP_AGENT_ID: &str = "Agent ID";

pub const STATUS_NEW: &str = "New";
pub const STATUS_DEMO_READY: &str = "Demo Ready";

/// Agent id a record carries until the voice assistant exists.
pub const PENDING_AGENT_ID: &str = "pending";

// ---------------------------------------------------------------------------
// Property builders
// ---------------------------------------------------------------------------

fn title(text: &str) -> Value {
    json!({ "title": [{ "text": { "content": clip(text) } }] })
}

fn rich_text(text: &str) -> Value {
    json!({ "rich_text": [{ "text": { "content": clip(text) } }] })
}

fn select(name: &str) -> Value {
    json!({ "select": { "name": name } })
}

fn url_prop(url: &str) -> Value {
    json!({ "url": url })
}

fn clip(text: &str) -> String {
    text.chars().take(MAX_RICH_TEXT).collect()
}

/// Properties for a brand-new lead record.
pub fn properties_for_profile(profile: &PracticeProfile, url: &str) -> Map<String, Value> {
    let mut props = Map::new();
    props.insert(PROP_COMPANY.into(), title(&profile.company_name));
    props.insert(PROP_WEBSITE.into(), url_prop(url));
    props.insert(PROP_CONTACT.into(), rich_text(&profile.contact_label));
    props.insert(PROP_EMAIL.into(), json!({ "email": profile.email }));
    props.insert(PROP_PHONE.into(), json!({ "phone_number": profile.phone }));
    props.insert(PROP_LOCATION.into(), rich_text(&profile.location));
    props.insert(PROP_SERVICES.into(), rich_text(&profile.services.join(", ")));
    props.insert(PROP_PRACTICE_TYPE.into(), select(&profile.practice_type_tag));
    props.insert(PROP_LEAD_SCORE.into(), json!({ "number": profile.lead_score }));
    props.insert(PROP_LEAD_SOURCE.into(), select(profile.lead_source.as_str()));
    props.insert(PROP_STABLE_ID.into(), rich_text(&profile.stable_id));
    props.insert(PROP_AGENT_ID.into(), rich_text(PENDING_AGENT_ID));
    props.insert(PROP_STATUS.into(), select(STATUS_NEW));
    props
}

/// Properties written once the demo is live.
pub fn properties_for_demo(demo_url: &str, agent_id: &str) -> Map<String, Value> {
    let mut props = Map::new();
    props.insert(PROP_DEMO_URL.into(), url_prop(demo_url));
    props.insert(PROP_AGENT_ID.into(), rich_text(agent_id));
    props.insert(PROP_STATUS.into(), select(STATUS_DEMO_READY));
    props
}

// ---------------------------------------------------------------------------
// Property readers
// ---------------------------------------------------------------------------

/// Concatenated `plain_text` of a title or rich-text property.
fn read_text(props: &Value, name: &str, kind: &str) -> Option<String> {
    let parts = props.get(name)?.get(kind)?.as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| {
            p.get("plain_text")
                .or_else(|| p.get("text").and_then(|t| t.get("content")))
                .and_then(Value::as_str)
        })
        .collect();
    (!text.is_empty()).then_some(text)
}

fn read_url(props: &Value, name: &str) -> Option<String> {
    props
        .get(name)?
        .get("url")?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn record_from_page(page: &PageObject) -> LeadRecord {
    let props = &page.properties;
    LeadRecord {
        store_id: page.id.clone(),
        company: read_text(props, PROP_COMPANY, "title"),
        website: read_url(props, PROP_WEBSITE),
        demo_url: read_url(props, PROP_DEMO_URL),
        agent_id: read_text(props, PROP_AGENT_ID, "rich_text"),
    }
}

// ---------------------------------------------------------------------------
// NotionStore
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PageObject {
    id: String,
    #[serde(default)]
    properties: Value,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<PageObject>,
}

/// Lead store backed by a Notion database.
pub struct NotionStore {
    http: Client,
    base_url: String,
    api_key: String,
    database_id: String,
}

impl NotionStore {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        database_id: impl Into<String>,
    ) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| DemoForgeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            database_id: database_id.into(),
        })
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let response = self
            .authed(builder)
            .send()
            .await
            .map_err(|e| DemoForgeError::Network(format!("crm {what}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DemoForgeError::collaborator(
                "crm",
                format!("{what}: HTTP {status}: {}", body.chars().take(200).collect::<String>()),
            ));
        }
        Ok(response)
    }
}

#[async_trait]
impl LeadStore for NotionStore {
    #[instrument(skip_all)]
    async fn create(&self, properties: Map<String, Value>) -> Result<String> {
        let body = json!({
            "parent": { "database_id": self.database_id },
            "properties": properties,
        });
        let response = self
            .send(self.http.post(format!("{}/pages", self.base_url)).json(&body), "create")
            .await?;

        let page: PageObject = response
            .json()
            .await
            .map_err(|e| DemoForgeError::parse(format!("crm create response: {e}")))?;
        debug!(store_id = %page.id, "crm page created");
        Ok(page.id)
    }

    #[instrument(skip_all, fields(store_id = %id))]
    async fn update(&self, id: &str, properties: Map<String, Value>) -> Result<()> {
        let body = json!({ "properties": properties });
        self.send(
            self.http
                .patch(format!("{}/pages/{id}", self.base_url))
                .json(&body),
            "update",
        )
        .await?;
        Ok(())
    }

    #[instrument(skip_all, fields(page_size = page_size))]
    async fn query(&self, sort: SortOrder, page_size: usize) -> Result<Vec<LeadRecord>> {
        let direction = match sort {
            SortOrder::NewestFirst => "descending",
            SortOrder::OldestFirst => "ascending",
        };
        let body = json!({
            "sorts": [{ "timestamp": "created_time", "direction": direction }],
            "page_size": page_size.clamp(1, 100),
        });
        let response = self
            .send(
                self.http
                    .post(format!("{}/databases/{}/query", self.base_url, self.database_id))
                    .json(&body),
                "query",
            )
            .await?;

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| DemoForgeError::parse(format!("crm query response: {e}")))?;
        Ok(parsed.results.iter().map(record_from_page).collect())
    }
}
