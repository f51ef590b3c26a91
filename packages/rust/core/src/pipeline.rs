//! End-to-end lead pipeline: discovery → per-lead phases → run summary.
//!
//! Leads run strictly one after another with a pause in between. A lead that
//! fails is recorded and the batch moves on.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use demoforge_deploy::{DeploymentOrchestrator, ProcessRunner, RailwayCli, RailwayGraphql};
use demoforge_discovery::{Discovery, DiscoveryRequest, ExaSearchClient};
use demoforge_extractor::{HttpFetcher, SiteExtractor};
use demoforge_llm::{CompletionClient, OpenRouterClient};
use demoforge_shared::{
    AppConfig, Credentials, DemoForgeError, DeploymentResult, DeploymentStatus, LeadCandidate,
    LeadId, LeadSource, Result, WorkflowSpec, domain_of,
};
use demoforge_storage::{LeadRecordStore, NotionStore, PENDING_AGENT_ID};

use crate::agent::{VapiClient, VoiceAgentProvisioner};
use crate::phase::{LeadPhase, LeadRun};
use crate::repository::{GitCli, GithubHost, RepositoryMaterializer};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    Success,
    Failed,
}

/// Outcome of one lead.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub lead_id: LeadId,
    pub url: String,
    pub status: LeadStatus,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub phases: Vec<LeadPhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment: Option<DeploymentResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        self.status == LeadStatus::Success
    }
}

/// Aggregate of one batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: Uuid,
    pub results: Vec<PipelineResult>,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called once discovery has settled the batch size.
    fn batch_started(&self, total: usize);
    /// Called before each lead.
    fn lead_started(&self, url: &str, current: usize, total: usize);
    /// Called when a lead enters a new phase.
    fn phase(&self, phase: LeadPhase);
    fn lead_finished(&self, result: &PipelineResult);
    /// Called when the batch completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn batch_started(&self, _total: usize) {}
    fn lead_started(&self, _url: &str, _current: usize, _total: usize) {}
    fn phase(&self, _phase: LeadPhase) {}
    fn lead_finished(&self, _result: &PipelineResult) {}
    fn done(&self, _summary: &RunSummary) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Pipeline behaviour knobs.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub inter_lead_delay: Duration,
    pub fallback_counts_as_success: bool,
    /// Query used when a workflow names neither query, specialty nor location.
    pub default_query: String,
}

impl PipelineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            inter_lead_delay: config.pipeline.inter_lead_delay(),
            fallback_counts_as_success: config.pipeline.fallback_counts_as_success,
            default_query: config.defaults.search_query.clone(),
        }
    }
}

/// Every collaborator a lead passes through.
pub struct Collaborators {
    pub discovery: Discovery,
    pub extractor: SiteExtractor,
    pub store: LeadRecordStore,
    pub agents: VoiceAgentProvisioner,
    pub repositories: RepositoryMaterializer,
    pub deployer: DeploymentOrchestrator,
}

impl Collaborators {
    /// Wire the production clients from config and resolved credentials.
    pub fn connect(
        config: &AppConfig,
        creds: &Credentials,
        llm: Arc<dyn CompletionClient>,
    ) -> Result<Self> {
        let search = ExaSearchClient::new(&config.search.base_url, &creds.search_api_key)?;
        let fetcher = HttpFetcher::new(Duration::from_secs(config.pipeline.fetch_timeout_secs))?;
        let notion = NotionStore::new(
            &config.crm.base_url,
            &creds.crm_api_key,
            &creds.crm_database_id,
        )?;
        let vapi = VapiClient::new(&config.voice.base_url, &creds.voice_api_key)?;
        let github = GithubHost::new(&config.github.base_url, &creds.github_token)?;
        let git = GitCli::new(
            Arc::new(ProcessRunner),
            &creds.github_token,
            &config.github.commit_author,
            &config.github.commit_email,
        );
        let railway_cli = RailwayCli::new(
            Arc::new(ProcessRunner),
            &config.railway.cli_bin,
            &creds.railway_token,
        );
        let railway_api = RailwayGraphql::new(&config.railway.graphql_url, &creds.railway_token)?;

        Ok(Self {
            discovery: Discovery::new(Arc::new(search)),
            extractor: SiteExtractor::new(Arc::new(fetcher), llm),
            store: LeadRecordStore::new(Arc::new(notion)),
            agents: VoiceAgentProvisioner::new(Arc::new(vapi), &creds.default_agent_id),
            repositories: RepositoryMaterializer::new(
                Arc::new(github),
                Arc::new(git),
                config.pipeline.private_repos,
            ),
            deployer: DeploymentOrchestrator::standard(
                Arc::new(railway_cli),
                Arc::new(railway_api),
            ),
        })
    }
}

/// Build the completion client every LLM-backed component shares.
pub fn completion_client(config: &AppConfig, creds: &Credentials) -> Result<Arc<dyn CompletionClient>> {
    let client = OpenRouterClient::new(
        &config.openrouter.base_url,
        &creds.openrouter_api_key,
        &config.openrouter.default_model,
    )?;
    Ok(Arc::new(client))
}

pub struct Pipeline {
    collaborators: Collaborators,
    options: PipelineOptions,
}

/// What a lead has produced so far; survives into the result on failure.
#[derive(Default)]
struct LeadOutputs {
    company: Option<String>,
    contact: Option<String>,
    store_id: Option<String>,
    agent_id: Option<String>,
    repository_url: Option<String>,
    deployment: Option<DeploymentResult>,
}

impl Pipeline {
    pub fn new(collaborators: Collaborators, options: PipelineOptions) -> Self {
        Self {
            collaborators,
            options,
        }
    }

    pub fn store(&self) -> &LeadRecordStore {
        &self.collaborators.store
    }

    /// Discover candidates for `spec` and process them as a batch.
    ///
    /// Fails only when discovery does; lead failures land in the summary.
    #[instrument(skip_all, fields(lead_count = spec.lead_count))]
    pub async fn run_workflow(
        &self,
        spec: &WorkflowSpec,
        progress: &dyn ProgressReporter,
    ) -> Result<RunSummary> {
        let request = DiscoveryRequest::from_spec(spec, &self.options.default_query);
        info!(query = %request.query, count = request.count, "starting workflow");

        let candidates = self.collaborators.discovery.discover(&request).await?;
        Ok(self
            .run_batch(&candidates, LeadSource::Search, progress)
            .await)
    }

    /// Process explicit URLs as manual leads.
    #[instrument(skip_all, fields(count = urls.len()))]
    pub async fn process_urls(
        &self,
        urls: &[String],
        progress: &dyn ProgressReporter,
    ) -> Result<RunSummary> {
        if urls.is_empty() {
            return Err(DemoForgeError::validation("no URLs given"));
        }
        let candidates = urls
            .iter()
            .map(|u| validate_url(u).map(LeadCandidate::from_url))
            .collect::<Result<Vec<_>>>()?;

        Ok(self
            .run_batch(&candidates, LeadSource::Manual, progress)
            .await)
    }

    /// Process a single manual lead.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn process_url(
        &self,
        url: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<PipelineResult> {
        let candidate = LeadCandidate::from_url(validate_url(url)?);
        progress.batch_started(1);
        progress.lead_started(&candidate.url, 1, 1);
        let result = self
            .process_lead(&candidate, LeadSource::Manual, progress)
            .await;
        progress.lead_finished(&result);
        Ok(result)
    }

    async fn run_batch(
        &self,
        candidates: &[LeadCandidate],
        source: LeadSource,
        progress: &dyn ProgressReporter,
    ) -> RunSummary {
        let start = Instant::now();
        let run_id = Uuid::now_v7();
        let total = candidates.len();
        progress.batch_started(total);

        let mut results = Vec::with_capacity(total);
        for (i, candidate) in candidates.iter().enumerate() {
            progress.lead_started(&candidate.url, i + 1, total);
            let result = self.process_lead(candidate, source, progress).await;
            progress.lead_finished(&result);
            results.push(result);

            if i + 1 < total && !self.options.inter_lead_delay.is_zero() {
                tokio::time::sleep(self.options.inter_lead_delay).await;
            }
        }

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        let summary = RunSummary {
            run_id,
            failed: results.len() - succeeded,
            succeeded,
            results,
            elapsed_ms: elapsed_ms(start),
        };

        info!(
            %run_id,
            succeeded = summary.succeeded,
            failed = summary.failed,
            elapsed_ms = summary.elapsed_ms,
            "batch complete"
        );
        progress.done(&summary);
        summary
    }

    #[instrument(skip_all, fields(url = %candidate.url))]
    async fn process_lead(
        &self,
        candidate: &LeadCandidate,
        source: LeadSource,
        progress: &dyn ProgressReporter,
    ) -> PipelineResult {
        let lead_id = LeadId::new();
        let started_at = Utc::now();
        let start = Instant::now();
        let mut run = LeadRun::new();
        let mut outputs = LeadOutputs::default();

        let outcome = self
            .drive(&candidate.url, source, &mut run, &mut outputs, progress)
            .await;

        let error = match outcome {
            Ok(()) => None,
            Err(e) => {
                warn!(%lead_id, phase = %run.current(), error = %e, "lead failed");
                run.fail();
                progress.phase(LeadPhase::Failed);
                Some(e.to_string())
            }
        };

        PipelineResult {
            lead_id,
            url: candidate.url.clone(),
            status: if error.is_none() {
                LeadStatus::Success
            } else {
                LeadStatus::Failed
            },
            started_at,
            elapsed_ms: elapsed_ms(start),
            phases: run.phases(),
            company: outputs.company,
            contact: outputs.contact,
            store_id: outputs.store_id,
            agent_id: outputs.agent_id,
            repository_url: outputs.repository_url,
            demo_url: outputs.deployment.as_ref().map(|d| d.url.clone()),
            deployment: outputs.deployment,
            error,
        }
    }

    async fn drive(
        &self,
        url: &str,
        source: LeadSource,
        run: &mut LeadRun,
        outputs: &mut LeadOutputs,
        progress: &dyn ProgressReporter,
    ) -> Result<()> {
        let c = &self.collaborators;
        let enter = |run: &mut LeadRun, phase: LeadPhase| -> Result<()> {
            run.advance(phase)?;
            progress.phase(phase);
            Ok(())
        };

        enter(run, LeadPhase::Extracting)?;
        let profile = c.extractor.extract(url, source).await;
        outputs.company = Some(profile.company_name.clone());
        outputs.contact = Some(profile.contact_label.clone());

        enter(run, LeadPhase::Storing)?;
        let store_id = c.store.create(&profile, url).await?;
        outputs.store_id = Some(store_id.clone());
        outputs.agent_id = Some(PENDING_AGENT_ID.to_string());

        enter(run, LeadPhase::Provisioning)?;
        let agent_id = c.agents.provision(&profile).await;
        outputs.agent_id = Some(agent_id.clone());

        enter(run, LeadPhase::Materializing)?;
        let repository = c.repositories.materialize(&profile, &agent_id).await?;
        outputs.repository_url = Some(repository.html_url.clone());

        enter(run, LeadPhase::Deploying)?;
        let deployment = c.deployer.deploy(&profile, &repository).await;
        outputs.deployment = Some(deployment.clone());

        enter(run, LeadPhase::Finalizing)?;
        c.store.update(&store_id, &deployment.url, &agent_id).await;

        if deployment.status == DeploymentStatus::Fallback && !self.options.fallback_counts_as_success
        {
            return Err(DemoForgeError::Deployment(format!(
                "deployment fell back to {}",
                deployment.url
            )));
        }

        enter(run, LeadPhase::Succeeded)?;
        info!(
            company = %profile.company_name,
            demo_url = %deployment.url,
            method = %deployment.method,
            "lead complete"
        );
        Ok(())
    }
}

fn validate_url(url: &str) -> Result<String> {
    let trimmed = url.trim();
    let has_scheme = trimmed.starts_with("http://") || trimmed.starts_with("https://");
    if !has_scheme || domain_of(trimmed).is_none() {
        return Err(DemoForgeError::validation(format!("not an http(s) URL: {url}")));
    }
    Ok(trimmed.to_string())
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
