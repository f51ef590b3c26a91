//! Shared types, error model, and configuration for DemoForge.
//!
//! This crate is the foundation depended on by all other DemoForge crates.
//! It provides:
//! - [`DemoForgeError`]: the unified error type
//! - Domain types ([`LeadCandidate`], [`PracticeProfile`], [`WorkflowSpec`], ...)
//! - Configuration ([`AppConfig`], config loading, credential resolution)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ChatConfig, CrmConfig, Credentials, DefaultsConfig, GithubConfig,
    OpenRouterConfig, PipelineSettings, RailwayConfig, SearchConfig, VoiceConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, resolve_credentials,
    resolve_credentials_with,
};
pub use error::{DemoForgeError, Result};
pub use types::{
    BrandColors, DeployMethod, DeploymentResult, DeploymentStatus, LeadCandidate, LeadId,
    LeadRecord, LeadSource, PracticeProfile, Repository, STABLE_ID_MAX_LEN, WorkflowSpec,
    domain_of, stable_id,
};

/// User-Agent sent by every DemoForge HTTP client.
pub const USER_AGENT: &str = concat!("DemoForge/", env!("CARGO_PKG_VERSION"));
