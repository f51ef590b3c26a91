//! Lead record storage in an external CRM database.
//!
//! The [`LeadStore`] trait is the collaborator boundary (create, update,
//! query over raw properties). [`LeadRecordStore`] sits on top and applies
//! the pipeline's rules: creating a record must succeed, updating it is
//! best-effort.

mod notion;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use demoforge_shared::{DemoForgeError, LeadRecord, PracticeProfile, Result};

pub use notion::{
    NotionStore, PROP_AGENT_ID, PROP_COMPANY, PROP_DEMO_URL, PROP_STATUS, PROP_WEBSITE,
    PENDING_AGENT_ID, STATUS_DEMO_READY, STATUS_NEW, properties_for_demo, properties_for_profile,
};

/// Ordering for [`LeadStore::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    NewestFirst,
    OldestFirst,
}

/// External record store.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Create a record, returning its store id.
    async fn create(&self, properties: Map<String, Value>) -> Result<String>;
    async fn update(&self, id: &str, properties: Map<String, Value>) -> Result<()>;
    async fn query(&self, sort: SortOrder, page_size: usize) -> Result<Vec<LeadRecord>>;
}

// ---------------------------------------------------------------------------
// LeadRecordStore
// ---------------------------------------------------------------------------

/// Pipeline-facing adapter over a [`LeadStore`].
#[derive(Clone)]
pub struct LeadRecordStore {
    store: Arc<dyn LeadStore>,
}

impl LeadRecordStore {
    pub fn new(store: Arc<dyn LeadStore>) -> Self {
        Self { store }
    }

    /// Create the tracking record for a lead.
    ///
    /// Any failure becomes [`DemoForgeError::StoreWriteFailed`].
    #[instrument(skip_all, fields(company = %profile.company_name))]
    pub async fn create(&self, profile: &PracticeProfile, url: &str) -> Result<String> {
        let id = self
            .store
            .create(properties_for_profile(profile, url))
            .await
            .map_err(|e| DemoForgeError::StoreWriteFailed(e.to_string()))?;
        info!(store_id = %id, "lead record created");
        Ok(id)
    }

    /// Record the demo URL and agent id. Failures are logged and swallowed.
    #[instrument(skip_all, fields(store_id = %store_id))]
    pub async fn update(&self, store_id: &str, demo_url: &str, agent_id: &str) {
        match self
            .store
            .update(store_id, properties_for_demo(demo_url, agent_id))
            .await
        {
            Ok(()) => info!(%demo_url, "lead record updated"),
            Err(e) => warn!(error = %e, "lead record update failed"),
        }
    }

    /// Most recently created records.
    pub async fn recent(&self, limit: usize) -> Result<Vec<LeadRecord>> {
        self.store.query(SortOrder::NewestFirst, limit).await
    }
}
