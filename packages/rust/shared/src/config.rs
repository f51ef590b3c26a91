//! Application configuration for DemoForge.
//!
//! User config lives at `~/.demoforge/demoforge.toml`.
//! CLI flags override config file values, which override defaults.
//! Secrets never live in the file: each section names the environment
//! variable that holds them, and [`resolve_credentials`] reads them all at
//! startup, failing fast on the first run if anything is absent.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DemoForgeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "demoforge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".demoforge";

// ---------------------------------------------------------------------------
// Config structs (matching demoforge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default workflow parameters.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Pipeline behaviour.
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// OpenRouter (completion endpoint) settings.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Search engine settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// CRM store settings.
    #[serde(default)]
    pub crm: CrmConfig,

    /// Voice agent platform settings.
    #[serde(default)]
    pub voice: VoiceConfig,

    /// Repository host settings.
    #[serde(default)]
    pub github: GithubConfig,

    /// Deployment platform settings.
    #[serde(default)]
    pub railway: RailwayConfig,

    /// Conversational surface settings.
    #[serde(default)]
    pub chat: ChatConfig,
}

/// `[defaults]` section, the fixed default workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Leads per batch when no count is given.
    #[serde(default = "default_lead_count")]
    pub lead_count: u32,

    /// Search query used when neither query nor specialty is given.
    #[serde(default = "default_search_query")]
    pub search_query: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            lead_count: default_lead_count(),
            search_query: default_search_query(),
        }
    }
}

fn default_lead_count() -> u32 {
    3
}
fn default_search_query() -> String {
    "aesthetic clinic botox dermal fillers".into()
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Pause between leads, in milliseconds.
    #[serde(default = "default_inter_lead_delay")]
    pub inter_lead_delay_ms: u64,

    /// Whether a lead whose deployment fell back to a static URL counts as a success.
    #[serde(default = "default_true")]
    pub fallback_counts_as_success: bool,

    /// Whether generated repositories are private.
    #[serde(default = "default_true")]
    pub private_repos: bool,

    /// Timeout for fetching a practice website, in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            inter_lead_delay_ms: default_inter_lead_delay(),
            fallback_counts_as_success: true,
            private_repos: true,
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

impl PipelineSettings {
    /// Inter-lead delay as a [`Duration`].
    pub fn inter_lead_delay(&self) -> Duration {
        Duration::from_millis(self.inter_lead_delay_ms)
    }
}

fn default_true() -> bool {
    true
}
fn default_inter_lead_delay() -> u64 {
    3_000
}
fn default_fetch_timeout() -> u64 {
    10
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_openrouter_key_env")]
    pub api_key_env: String,

    /// Model used for extraction and conversation.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// API base URL.
    #[serde(default = "default_openrouter_url")]
    pub base_url: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_openrouter_key_env(),
            default_model: default_model(),
            base_url: default_openrouter_url(),
        }
    }
}

fn default_openrouter_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn default_openrouter_url() -> String {
    "https://openrouter.ai/api/v1".into()
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_search_url")]
    pub base_url: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_search_key_env(),
            base_url: default_search_url(),
        }
    }
}

fn default_search_key_env() -> String {
    "EXA_API_KEY".into()
}
fn default_search_url() -> String {
    "https://api.exa.ai".into()
}

/// `[crm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmConfig {
    #[serde(default = "default_crm_key_env")]
    pub api_key_env: String,
    /// Env var naming the database that holds lead records.
    #[serde(default = "default_crm_db_env")]
    pub database_id_env: String,
    #[serde(default = "default_crm_url")]
    pub base_url: String,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_crm_key_env(),
            database_id_env: default_crm_db_env(),
            base_url: default_crm_url(),
        }
    }
}

fn default_crm_key_env() -> String {
    "NOTION_API_KEY".into()
}
fn default_crm_db_env() -> String {
    "NOTION_DATABASE_ID".into()
}
fn default_crm_url() -> String {
    "https://api.notion.com/v1".into()
}

/// `[voice]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    #[serde(default = "default_voice_key_env")]
    pub api_key_env: String,
    /// Env var naming the shared assistant used when per-lead provisioning fails.
    #[serde(default = "default_voice_agent_env")]
    pub default_agent_id_env: String,
    #[serde(default = "default_voice_url")]
    pub base_url: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_voice_key_env(),
            default_agent_id_env: default_voice_agent_env(),
            base_url: default_voice_url(),
        }
    }
}

fn default_voice_key_env() -> String {
    "VAPI_API_KEY".into()
}
fn default_voice_agent_env() -> String {
    "VAPI_DEFAULT_ASSISTANT_ID".into()
}
fn default_voice_url() -> String {
    "https://api.vapi.ai".into()
}

/// `[github]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "default_github_token_env")]
    pub token_env: String,
    #[serde(default = "default_github_url")]
    pub base_url: String,
    /// Commit author written into generated repositories.
    #[serde(default = "default_commit_author")]
    pub commit_author: String,
    #[serde(default = "default_commit_email")]
    pub commit_email: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token_env: default_github_token_env(),
            base_url: default_github_url(),
            commit_author: default_commit_author(),
            commit_email: default_commit_email(),
        }
    }
}

fn default_github_token_env() -> String {
    "GITHUB_TOKEN".into()
}
fn default_github_url() -> String {
    "https://api.github.com".into()
}
fn default_commit_author() -> String {
    "DemoForge".into()
}
fn default_commit_email() -> String {
    "demoforge@users.noreply.github.com".into()
}

/// `[railway]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RailwayConfig {
    #[serde(default = "default_railway_token_env")]
    pub token_env: String,
    /// CLI binary used by the primary deployment tier.
    #[serde(default = "default_railway_bin")]
    pub cli_bin: String,
    /// GraphQL endpoint used by the secondary deployment tier.
    #[serde(default = "default_railway_graphql")]
    pub graphql_url: String,
}

impl Default for RailwayConfig {
    fn default() -> Self {
        Self {
            token_env: default_railway_token_env(),
            cli_bin: default_railway_bin(),
            graphql_url: default_railway_graphql(),
        }
    }
}

fn default_railway_token_env() -> String {
    "RAILWAY_TOKEN".into()
}
fn default_railway_bin() -> String {
    "railway".into()
}
fn default_railway_graphql() -> String {
    "https://backboard.railway.app/graphql/v2".into()
}

/// `[chat]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Idle time after which a channel's conversation is forgotten.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_session_ttl(),
        }
    }
}

fn default_session_ttl() -> u64 {
    24 * 60 * 60
}

// ---------------------------------------------------------------------------
// Credentials (resolved from the environment at startup)
// ---------------------------------------------------------------------------

/// Every secret and identifier a run needs, resolved once at startup.
#[derive(Clone)]
pub struct Credentials {
    pub openrouter_api_key: String,
    pub search_api_key: String,
    pub crm_api_key: String,
    pub crm_database_id: String,
    pub voice_api_key: String,
    pub default_agent_id: String,
    pub github_token: String,
    pub railway_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("crm_database_id", &self.crm_database_id)
            .field("default_agent_id", &self.default_agent_id)
            .finish_non_exhaustive()
    }
}

/// Resolve all credentials from the process environment.
pub fn resolve_credentials(config: &AppConfig) -> Result<Credentials> {
    resolve_credentials_with(config, |name| std::env::var(name).ok())
}

/// Resolve all credentials through `lookup`, reporting every missing variable at once.
pub fn resolve_credentials_with<F>(config: &AppConfig, lookup: F) -> Result<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    let mut missing: Vec<String> = Vec::new();
    let mut take = |name: &str| -> String {
        match lookup(name) {
            Some(value) if !value.trim().is_empty() => value,
            _ => {
                missing.push(name.to_string());
                String::new()
            }
        }
    };

    let creds = Credentials {
        openrouter_api_key: take(&config.openrouter.api_key_env),
        search_api_key: take(&config.search.api_key_env),
        crm_api_key: take(&config.crm.api_key_env),
        crm_database_id: take(&config.crm.database_id_env),
        voice_api_key: take(&config.voice.api_key_env),
        default_agent_id: take(&config.voice.default_agent_id_env),
        github_token: take(&config.github.token_env),
        railway_token: take(&config.railway.token_env),
    };

    if missing.is_empty() {
        tracing::debug!("all credentials resolved");
        Ok(creds)
    } else {
        Err(DemoForgeError::config(format!(
            "missing required environment variables: {}",
            missing.join(", ")
        )))
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.demoforge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DemoForgeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.demoforge/demoforge.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DemoForgeError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DemoForgeError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DemoForgeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DemoForgeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DemoForgeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
