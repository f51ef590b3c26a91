//! Deployment platform boundary.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use demoforge_shared::{Repository, Result};

/// A platform environment (e.g. `production`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub id: String,
    pub name: String,
}

/// The ids that address one deployed service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployTarget {
    pub project_id: String,
    pub environment_id: String,
    pub service_id: String,
}

/// Environment variables set on a service. Sorted for stable requests.
pub type Variables = BTreeMap<String, String>;

/// Operations on an existing service.
#[async_trait]
pub trait ServiceApi: Send + Sync {
    async fn set_variables(&self, target: &DeployTarget, variables: &Variables) -> Result<()>;

    /// Create a public domain, returning its host name.
    async fn create_domain(&self, target: &DeployTarget) -> Result<String>;
}

/// Full project lifecycle, from an empty account to a running service.
#[async_trait]
pub trait ProjectPlatform: ServiceApi {
    /// Create a project, returning its id.
    async fn create_project(&self, name: &str) -> Result<String>;
    async fn list_environments(&self, project_id: &str) -> Result<Vec<Environment>>;

    /// Create a service that builds from `repository`, returning its id.
    async fn create_service(
        &self,
        project_id: &str,
        environment_id: &str,
        repository: &Repository,
    ) -> Result<String>;
}

/// Prefer the environment named `production`, else the first one listed.
pub fn choose_environment(environments: &[Environment]) -> Option<&Environment> {
    environments
        .iter()
        .find(|e| e.name.eq_ignore_ascii_case("production"))
        .or_else(|| environments.first())
}

/// `x.up.railway.app` → `https://x.up.railway.app`.
pub fn domain_url(domain: &str) -> String {
    let domain = domain.trim().trim_end_matches('/');
    if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    }
}
