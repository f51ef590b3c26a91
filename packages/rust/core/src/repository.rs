//! Repository materialization: create the remote repository, fill it with
//! the generated demo, push.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use demoforge_artifacts::{GeneratedFile, render_template};
use demoforge_deploy::CommandRunner;
use demoforge_shared::{DemoForgeError, PracticeProfile, Repository, Result, USER_AGENT};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const BRANCH: &str = "main";

/// Remote repository host.
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    async fn create_repository(&self, name: &str, description: &str, private: bool)
    -> Result<Repository>;
}

/// Pushes a file set as one commit onto a freshly created repository.
#[async_trait]
pub trait GitPublisher: Send + Sync {
    async fn publish(&self, repository: &Repository, files: &[GeneratedFile], message: &str)
    -> Result<()>;
}

// ---------------------------------------------------------------------------
// GitHub
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CreateRepoBody<'a> {
    name: &'a str,
    description: &'a str,
    private: bool,
    auto_init: bool,
}

#[derive(Deserialize)]
struct CreatedRepo {
    name: String,
    html_url: String,
    clone_url: String,
    full_name: String,
    owner: RepoOwner,
}

#[derive(Deserialize)]
struct RepoOwner {
    login: String,
}

/// GitHub REST client for the authenticated user's repositories.
pub struct GithubHost {
    http: Client,
    base_url: String,
    token: String,
}

impl GithubHost {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| DemoForgeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }
}

#[async_trait]
impl RepositoryHost for GithubHost {
    #[instrument(skip_all, fields(name = %name, private = private))]
    async fn create_repository(
        &self,
        name: &str,
        description: &str,
        private: bool,
    ) -> Result<Repository> {
        let response = self
            .http
            .post(format!("{}/user/repos", self.base_url))
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, GITHUB_ACCEPT)
            .json(&CreateRepoBody {
                name,
                description,
                private,
                auto_init: false,
            })
            .send()
            .await
            .map_err(|e| DemoForgeError::Network(format!("github: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(200).collect();
            return Err(DemoForgeError::collaborator(
                "github",
                format!("HTTP {status}: {snippet}"),
            ));
        }

        let created: CreatedRepo = response
            .json()
            .await
            .map_err(|e| DemoForgeError::parse(format!("github response: {e}")))?;

        Ok(Repository {
            name: created.name,
            html_url: created.html_url,
            clone_url: created.clone_url,
            full_name: created.full_name,
            owner: created.owner.login,
        })
    }
}

// ---------------------------------------------------------------------------
// git CLI
// ---------------------------------------------------------------------------

/// Publishes through the `git` binary in a scratch directory.
pub struct GitCli {
    runner: Arc<dyn CommandRunner>,
    token: String,
    author: String,
    email: String,
}

impl GitCli {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        token: impl Into<String>,
        author: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            token: token.into(),
            author: author.into(),
            email: email.into(),
        }
    }

    async fn git(&self, dir: &Path, args: &[&str]) -> Result<String> {
        let mut full = vec![
            "-C".to_string(),
            dir.display().to_string(),
            "-c".to_string(),
            format!("user.name={}", self.author),
            "-c".to_string(),
            format!("user.email={}", self.email),
        ];
        full.extend(args.iter().map(|a| a.to_string()));
        debug!(command = %args.join(" "), "running git");
        self.runner.run("git", &full, &[]).await
    }
}

/// `https://host/path` → `https://x-access-token:<token>@host/path`.
pub fn authenticated_url(clone_url: &str, token: &str) -> String {
    match clone_url.strip_prefix("https://") {
        Some(rest) => format!("https://x-access-token:{token}@{rest}"),
        None => clone_url.to_string(),
    }
}

/// Write `files` below `root`, creating parent directories.
pub async fn write_files(root: &Path, files: &[GeneratedFile]) -> Result<()> {
    for file in files {
        let path = root.join(&file.path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DemoForgeError::io(parent, e))?;
        }
        tokio::fs::write(&path, &file.contents)
            .await
            .map_err(|e| DemoForgeError::io(&path, e))?;
    }
    Ok(())
}

#[async_trait]
impl GitPublisher for GitCli {
    #[instrument(skip_all, fields(repo = %repository.full_name, files = files.len()))]
    async fn publish(
        &self,
        repository: &Repository,
        files: &[GeneratedFile],
        message: &str,
    ) -> Result<()> {
        let scratch = tempfile::tempdir()
            .map_err(|e| DemoForgeError::io(std::env::temp_dir(), e))?;
        let checkout = scratch.path().join(&repository.name);
        let remote = authenticated_url(&repository.clone_url, &self.token);

        let target = checkout.display().to_string();
        self.git(scratch.path(), &["clone", remote.as_str(), target.as_str()])
            .await?;

        write_files(&checkout, files).await?;

        self.git(&checkout, &["add", "--all"]).await?;
        self.git(&checkout, &["commit", "-m", message]).await?;
        self.git(&checkout, &["branch", "-M", BRANCH]).await?;
        self.git(&checkout, &["push", "-u", "origin", BRANCH]).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Materializer
// ---------------------------------------------------------------------------

/// `<stableId>-demo-<MMDDHHMM>`, unique enough across reruns for one practice.
pub fn repository_name(profile: &PracticeProfile, now: DateTime<Utc>) -> String {
    format!("{}-demo-{}", profile.stable_id, now.format("%m%d%H%M"))
}

pub fn commit_message(profile: &PracticeProfile) -> String {
    format!(
        "Personalize voice demo for {} ({})",
        profile.company_name, profile.location
    )
}

pub struct RepositoryMaterializer {
    host: Arc<dyn RepositoryHost>,
    git: Arc<dyn GitPublisher>,
    private: bool,
}

impl RepositoryMaterializer {
    pub fn new(host: Arc<dyn RepositoryHost>, git: Arc<dyn GitPublisher>, private: bool) -> Self {
        Self { host, git, private }
    }

    /// Every failure is [`DemoForgeError::RepositoryPersonalizationFailed`].
    #[instrument(skip_all, fields(practice = %profile.stable_id))]
    pub async fn materialize(&self, profile: &PracticeProfile, agent_id: &str) -> Result<Repository> {
        self.try_materialize(profile, agent_id)
            .await
            .map_err(|e| match e {
                DemoForgeError::RepositoryPersonalizationFailed(_) => e,
                other => DemoForgeError::RepositoryPersonalizationFailed(other.to_string()),
            })
    }

    async fn try_materialize(&self, profile: &PracticeProfile, agent_id: &str) -> Result<Repository> {
        let files = render_template(profile, agent_id)?;
        let name = repository_name(profile, Utc::now());
        let description = format!("AI voice receptionist demo for {}", profile.company_name);

        let repository = self
            .host
            .create_repository(&name, &description, self.private)
            .await?;
        self.git
            .publish(&repository, &files, &commit_message(profile))
            .await?;

        info!(repo = %repository.full_name, files = files.len(), "repository pushed");
        Ok(repository)
    }
}
