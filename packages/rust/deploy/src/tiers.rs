//! Deployment tiers and the escalations that link them.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use demoforge_shared::{
    DemoForgeError, DeployMethod, DeploymentResult, DeploymentStatus, PracticeProfile,
    Repository, Result,
};

use crate::platform::{
    DeployTarget, ProjectPlatform, ServiceApi, Variables, choose_environment, domain_url,
};

/// Why the chain moved on from a tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Escalation {
    /// Nothing attempted yet.
    Start,
    /// The service exists but no domain could be attached.
    DomainCreationFailed(DeployTarget),
    /// Orchestration broke down before a usable service existed.
    OrchestrationFailed(String),
}

/// What a tier produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierOutcome {
    Deployed(DeploymentResult),
    Escalate(Escalation),
}

/// One deployment strategy.
#[async_trait]
pub trait DeployTier: Send + Sync {
    fn method(&self) -> DeployMethod;

    /// Can this tier act on `escalation`?
    fn accepts(&self, escalation: &Escalation) -> bool;

    async fn attempt(
        &self,
        profile: &PracticeProfile,
        repository: &Repository,
        escalation: &Escalation,
    ) -> TierOutcome;
}

/// Variables every demo service gets.
pub fn demo_variables(profile: &PracticeProfile) -> Variables {
    let mut vars = Variables::new();
    vars.insert("PRACTICE_ID".into(), profile.stable_id.clone());
    vars.insert("COMPANY_NAME".into(), profile.company_name.clone());
    vars.insert("DEMO_MODE".into(), "true".into());
    vars
}

fn deployed(domain: &str, method: DeployMethod) -> TierOutcome {
    TierOutcome::Deployed(DeploymentResult {
        url: domain_url(domain),
        status: DeploymentStatus::Deployed,
        method,
    })
}

// ---------------------------------------------------------------------------
// Primary: full project lifecycle through the CLI
// ---------------------------------------------------------------------------

pub struct PrimaryTier {
    platform: Arc<dyn ProjectPlatform>,
}

impl PrimaryTier {
    pub fn new(platform: Arc<dyn ProjectPlatform>) -> Self {
        Self { platform }
    }

    /// Everything up to a service with variables set.
    async fn provision(
        &self,
        profile: &PracticeProfile,
        repository: &Repository,
    ) -> Result<DeployTarget> {
        let project_id = self.platform.create_project(&repository.name).await?;
        let environments = self.platform.list_environments(&project_id).await?;
        let environment = choose_environment(&environments).ok_or_else(|| {
            DemoForgeError::Deployment(format!(
                "project {project_id} has no environments"
            ))
        })?;
        let environment_id = environment.id.clone();
        let service_id = self
            .platform
            .create_service(&project_id, &environment_id, repository)
            .await?;

        let target = DeployTarget {
            project_id,
            environment_id,
            service_id,
        };

        if let Err(e) = self
            .platform
            .set_variables(&target, &demo_variables(profile))
            .await
        {
            warn!(error = %e, "setting service variables failed, continuing");
        }
        Ok(target)
    }
}

#[async_trait]
impl DeployTier for PrimaryTier {
    fn method(&self) -> DeployMethod {
        DeployMethod::Primary
    }

    fn accepts(&self, escalation: &Escalation) -> bool {
        matches!(escalation, Escalation::Start)
    }

    async fn attempt(
        &self,
        profile: &PracticeProfile,
        repository: &Repository,
        _escalation: &Escalation,
    ) -> TierOutcome {
        let target = match self.provision(profile, repository).await {
            Ok(target) => target,
            Err(e) => {
                warn!(error = %e, "primary deployment failed");
                return TierOutcome::Escalate(Escalation::OrchestrationFailed(e.to_string()));
            }
        };

        match self.platform.create_domain(&target).await {
            Ok(domain) => deployed(&domain, DeployMethod::Primary),
            Err(e) => {
                warn!(error = %e, service_id = %target.service_id, "domain creation failed");
                TierOutcome::Escalate(Escalation::DomainCreationFailed(target))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Secondary: structured API against the carried ids
// ---------------------------------------------------------------------------

pub struct SecondaryTier {
    api: Arc<dyn ServiceApi>,
}

impl SecondaryTier {
    pub fn new(api: Arc<dyn ServiceApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DeployTier for SecondaryTier {
    fn method(&self) -> DeployMethod {
        DeployMethod::Secondary
    }

    fn accepts(&self, escalation: &Escalation) -> bool {
        matches!(escalation, Escalation::DomainCreationFailed(_))
    }

    async fn attempt(
        &self,
        profile: &PracticeProfile,
        _repository: &Repository,
        escalation: &Escalation,
    ) -> TierOutcome {
        let Escalation::DomainCreationFailed(target) = escalation else {
            return TierOutcome::Escalate(escalation.clone());
        };

        if let Err(e) = self.api.set_variables(target, &demo_variables(profile)).await {
            warn!(error = %e, "re-setting variables through the API failed, continuing");
        }

        match self.api.create_domain(target).await {
            Ok(domain) => deployed(&domain, DeployMethod::Secondary),
            Err(e) => {
                warn!(error = %e, "secondary domain creation failed");
                TierOutcome::Escalate(Escalation::OrchestrationFailed(e.to_string()))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Static fallback: predicted Pages URL
// ---------------------------------------------------------------------------

pub struct StaticFallbackTier;

/// `https://<owner>.github.io/<repo>`.
pub fn static_fallback_url(repository: &Repository) -> String {
    format!(
        "https://{}.github.io/{}",
        repository.owner.to_ascii_lowercase(),
        repository.name
    )
}

#[async_trait]
impl DeployTier for StaticFallbackTier {
    fn method(&self) -> DeployMethod {
        DeployMethod::StaticFallback
    }

    fn accepts(&self, escalation: &Escalation) -> bool {
        matches!(escalation, Escalation::OrchestrationFailed(_))
    }

    async fn attempt(
        &self,
        _profile: &PracticeProfile,
        repository: &Repository,
        _escalation: &Escalation,
    ) -> TierOutcome {
        let url = static_fallback_url(repository);
        info!(%url, "using static fallback URL");
        TierOutcome::Deployed(DeploymentResult {
            url,
            status: DeploymentStatus::Fallback,
            method: DeployMethod::StaticFallback,
        })
    }
}
