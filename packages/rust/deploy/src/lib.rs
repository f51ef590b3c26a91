//! Tiered deployment of a demo repository.
//!
//! Tiers run in order. Each declares which [`Escalation`] it accepts:
//!
//! | tier            | accepts                  | on failure              |
//! |-----------------|--------------------------|-------------------------|
//! | primary (CLI)   | `Start`                  | `DomainCreationFailed` or `OrchestrationFailed` |
//! | secondary (API) | `DomainCreationFailed`   | `OrchestrationFailed`   |
//! | static fallback | `OrchestrationFailed`    | never fails             |
//!
//! [`DeploymentOrchestrator::deploy`] therefore always returns a URL.

mod cli;
mod graphql;
mod platform;
mod tiers;

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use demoforge_shared::{
    DeployMethod, DeploymentResult, DeploymentStatus, PracticeProfile, Repository,
};

pub use cli::{CommandRunner, ProcessRunner, RailwayCli};
pub use graphql::RailwayGraphql;
pub use platform::{
    DeployTarget, Environment, ProjectPlatform, ServiceApi, Variables, choose_environment,
    domain_url,
};
pub use tiers::{
    DeployTier, Escalation, PrimaryTier, SecondaryTier, StaticFallbackTier, TierOutcome,
    demo_variables, static_fallback_url,
};

/// Runs the tier chain for one repository.
#[derive(Clone)]
pub struct DeploymentOrchestrator {
    tiers: Vec<Arc<dyn DeployTier>>,
}

impl DeploymentOrchestrator {
    /// Chain with explicit tiers, tried in order.
    pub fn new(tiers: Vec<Arc<dyn DeployTier>>) -> Self {
        Self { tiers }
    }

    /// The standard CLI → API → static chain.
    pub fn standard(platform: Arc<dyn ProjectPlatform>, api: Arc<dyn ServiceApi>) -> Self {
        Self::new(vec![
            Arc::new(PrimaryTier::new(platform)),
            Arc::new(SecondaryTier::new(api)),
            Arc::new(StaticFallbackTier),
        ])
    }

    /// Deploy `repository`. Never fails; the last resort is the static URL.
    #[instrument(skip_all, fields(repo = %repository.full_name))]
    pub async fn deploy(&self, profile: &PracticeProfile, repository: &Repository) -> DeploymentResult {
        let mut escalation = Escalation::Start;

        for tier in &self.tiers {
            if !tier.accepts(&escalation) {
                debug!(tier = %tier.method(), ?escalation, "tier skipped");
                continue;
            }

            match tier.attempt(profile, repository, &escalation).await {
                TierOutcome::Deployed(result) => {
                    info!(url = %result.url, method = %result.method, "deployment finished");
                    return result;
                }
                TierOutcome::Escalate(next) => {
                    debug!(tier = %tier.method(), escalation = ?next, "tier escalated");
                    escalation = next;
                }
            }
        }

        warn!(?escalation, "no tier produced a deployment, using static fallback");
        DeploymentResult {
            url: static_fallback_url(repository),
            status: DeploymentStatus::Fallback,
            method: DeployMethod::StaticFallback,
        }
    }
}
