//! In-memory collaborators shared by the core tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use demoforge_artifacts::GeneratedFile;
use demoforge_deploy::{DeployTarget, Environment, ProjectPlatform, ServiceApi, Variables};
use demoforge_discovery::{SearchHit, SearchProvider, SearchRequest};
use demoforge_extractor::{FetchedPage, PageFetcher};
use demoforge_llm::{CompletionClient, CompletionRequest};
use demoforge_shared::{
    BrandColors, DemoForgeError, LeadRecord, LeadSource, PracticeProfile, Repository, Result,
};
use demoforge_storage::{LeadStore, SortOrder};

use crate::agent::{AssistantSpec, VoiceAgentPlatform};
use crate::repository::{GitPublisher, RepositoryHost};

pub fn sample_profile() -> PracticeProfile {
    PracticeProfile {
        company_name: "Glow Aesthetics".into(),
        contact_label: "Dr. Anna Weber".into(),
        phone: "+1 (555) 123-4567".into(),
        email: "hello@glow.at".into(),
        location: "Vienna, Austria".into(),
        services: vec!["Botox".into(), "Dermal Fillers".into()],
        practice_type_tag: "aesthetic".into(),
        stable_id: "glow".into(),
        lead_source: LeadSource::Search,
        lead_score: 90,
        brand_colors: BrandColors::default(),
        source_url: "https://glow.at".into(),
        is_generalized: false,
    }
}

// ---------------------------------------------------------------------------
// Search, fetch, completion
// ---------------------------------------------------------------------------

pub struct FakeSearch {
    pub hits: Vec<SearchHit>,
}

impl FakeSearch {
    pub fn with_urls(urls: &[&str]) -> Self {
        Self {
            hits: urls
                .iter()
                .map(|u| SearchHit {
                    id: u.to_string(),
                    url: u.to_string(),
                    title: "Aesthetic clinic".into(),
                    text: "Botox and fillers in Vienna".into(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(&self, _request: &SearchRequest) -> Result<Vec<SearchHit>> {
        Ok(self.hits.clone())
    }
}

/// Serves the same small practice page for every URL.
pub struct StaticSite;

#[async_trait]
impl PageFetcher for StaticSite {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        Ok(FetchedPage {
            final_url: url.to_string(),
            html: "<html><head><title>Glow Aesthetics | Vienna</title></head>\
                   <body><h1>Welcome</h1><p>Botox and fillers.</p></body></html>"
                .into(),
        })
    }
}

/// Replies from a script, then repeats the fallback forever.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String>>>,
    fallback: String,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn always(reply: &str) -> Self {
        Self::scripted(Vec::new(), reply)
    }

    pub fn scripted(replies: Vec<Result<String>>, fallback: &str) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: fallback.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CompletionClient for ScriptedLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(reply) => reply,
            None => Ok(self.fallback.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Store, voice platform, repository host
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    pub fail_create: bool,
    pub created: Mutex<Vec<Map<String, Value>>>,
    pub updated: Mutex<Vec<(String, Map<String, Value>)>>,
}

#[async_trait]
impl LeadStore for MemoryStore {
    async fn create(&self, properties: Map<String, Value>) -> Result<String> {
        if self.fail_create {
            return Err(DemoForgeError::collaborator("crm", "HTTP 500"));
        }
        let mut created = self.created.lock().unwrap();
        created.push(properties);
        Ok(format!("page-{}", created.len()))
    }

    async fn update(&self, id: &str, properties: Map<String, Value>) -> Result<()> {
        self.updated.lock().unwrap().push((id.to_string(), properties));
        Ok(())
    }

    async fn query(&self, _sort: SortOrder, page_size: usize) -> Result<Vec<LeadRecord>> {
        let count = self.created.lock().unwrap().len();
        Ok((1..=count)
            .rev()
            .take(page_size)
            .map(|n| LeadRecord {
                store_id: format!("page-{n}"),
                company: None,
                website: None,
                demo_url: None,
                agent_id: None,
            })
            .collect())
    }
}

#[derive(Default)]
pub struct FakeVoice {
    pub fail: bool,
    pub created: AtomicUsize,
}

#[async_trait]
impl VoiceAgentPlatform for FakeVoice {
    async fn create_assistant(&self, _spec: &AssistantSpec) -> Result<String> {
        if self.fail {
            return Err(DemoForgeError::collaborator("voice platform", "HTTP 402"));
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("asst-{n}"))
    }
}

/// Hands out repositories under the `acme` account.
///
/// `fail` rejects every call; `fail_calls` rejects only the listed 1-based calls.
#[derive(Default)]
pub struct FakeHost {
    pub fail: bool,
    pub fail_calls: Vec<usize>,
    pub calls: AtomicUsize,
    pub names: Mutex<Vec<String>>,
}

#[async_trait]
impl RepositoryHost for FakeHost {
    async fn create_repository(&self, name: &str, _description: &str, _private: bool) -> Result<Repository> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail || self.fail_calls.contains(&call) {
            return Err(DemoForgeError::collaborator("github", "HTTP 422: name already exists"));
        }
        self.names.lock().unwrap().push(name.to_string());
        Ok(Repository {
            name: name.to_string(),
            html_url: format!("https://github.com/acme/{name}"),
            clone_url: format!("https://github.com/acme/{name}.git"),
            full_name: format!("acme/{name}"),
            owner: "acme".into(),
        })
    }
}

#[derive(Default)]
pub struct FakeGit {
    pub pushed: Mutex<Vec<(String, usize)>>,
}

#[async_trait]
impl GitPublisher for FakeGit {
    async fn publish(&self, repository: &Repository, files: &[GeneratedFile], _message: &str) -> Result<()> {
        self.pushed
            .lock()
            .unwrap()
            .push((repository.full_name.clone(), files.len()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Deployment platform
// ---------------------------------------------------------------------------

/// Succeeds at everything, or fails domain creation when `fail_domain` is set.
#[derive(Default)]
pub struct FakeRailway {
    pub fail_domain: bool,
}

#[async_trait]
impl ServiceApi for FakeRailway {
    async fn set_variables(&self, _target: &DeployTarget, _variables: &Variables) -> Result<()> {
        Ok(())
    }

    async fn create_domain(&self, target: &DeployTarget) -> Result<String> {
        if self.fail_domain {
            return Err(DemoForgeError::Deployment("domain quota".into()));
        }
        Ok(format!("{}.up.railway.app", target.service_id))
    }
}

#[async_trait]
impl ProjectPlatform for FakeRailway {
    async fn create_project(&self, name: &str) -> Result<String> {
        Ok(format!("proj-{name}"))
    }

    async fn list_environments(&self, _project_id: &str) -> Result<Vec<Environment>> {
        Ok(vec![Environment {
            id: "env-prod".into(),
            name: "production".into(),
        }])
    }

    async fn create_service(&self, _project_id: &str, _environment_id: &str, repository: &Repository) -> Result<String> {
        Ok(repository.name.clone())
    }
}
