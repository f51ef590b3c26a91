//! Voice agent provisioning.
//!
//! Every lead gets its own assistant on the voice platform, configured with
//! the practice's prompt and opening line. When the platform refuses, the
//! lead shares the configured default assistant instead.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use demoforge_artifacts::{ASSISTANT_NAME, opening_line, system_prompt};
use demoforge_shared::{DemoForgeError, PracticeProfile, Result, USER_AGENT};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Model the assistant converses with.
const ASSISTANT_PROVIDER: &str = "openai";
const ASSISTANT_MODEL: &str = "gpt-4o-mini";

/// What the voice platform needs to create an assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantSpec {
    pub name: String,
    pub first_message: String,
    pub system_prompt: String,
}

impl AssistantSpec {
    pub fn for_profile(profile: &PracticeProfile) -> Self {
        Self {
            name: format!("{ASSISTANT_NAME} - {}", profile.company_name),
            first_message: opening_line(profile),
            system_prompt: system_prompt(profile),
        }
    }
}

/// Voice platform boundary.
#[async_trait]
pub trait VoiceAgentPlatform: Send + Sync {
    /// Create an assistant, returning its id.
    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Vapi client
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateAssistantBody<'a> {
    name: &'a str,
    first_message: &'a str,
    model: AssistantModel<'a>,
}

#[derive(Serialize)]
struct AssistantModel<'a> {
    provider: &'a str,
    model: &'a str,
    messages: Vec<AssistantMessage<'a>>,
}

#[derive(Serialize)]
struct AssistantMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CreatedAssistant {
    id: String,
}

/// Vapi REST client.
pub struct VapiClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl VapiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| DemoForgeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl VoiceAgentPlatform for VapiClient {
    #[instrument(skip_all, fields(name = %spec.name))]
    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<String> {
        let body = CreateAssistantBody {
            name: &spec.name,
            first_message: &spec.first_message,
            model: AssistantModel {
                provider: ASSISTANT_PROVIDER,
                model: ASSISTANT_MODEL,
                messages: vec![AssistantMessage {
                    role: "system",
                    content: &spec.system_prompt,
                }],
            },
        };

        let response = self
            .http
            .post(format!("{}/assistant", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DemoForgeError::Network(format!("voice platform: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(200).collect();
            return Err(DemoForgeError::collaborator(
                "voice platform",
                format!("HTTP {status}: {snippet}"),
            ));
        }

        let created: CreatedAssistant = response
            .json()
            .await
            .map_err(|e| DemoForgeError::parse(format!("voice platform response: {e}")))?;
        Ok(created.id)
    }
}

// ---------------------------------------------------------------------------
// Provisioner
// ---------------------------------------------------------------------------

/// Creates a per-lead assistant, falling back to a shared one.
pub struct VoiceAgentProvisioner {
    platform: Arc<dyn VoiceAgentPlatform>,
    default_agent_id: String,
}

impl VoiceAgentProvisioner {
    pub fn new(platform: Arc<dyn VoiceAgentPlatform>, default_agent_id: impl Into<String>) -> Self {
        Self {
            platform,
            default_agent_id: default_agent_id.into(),
        }
    }

    /// Never fails: any platform error yields the default agent id.
    #[instrument(skip_all, fields(practice = %profile.stable_id))]
    pub async fn provision(&self, profile: &PracticeProfile) -> String {
        let spec = AssistantSpec::for_profile(profile);
        match self.platform.create_assistant(&spec).await {
            Ok(id) => {
                info!(agent_id = %id, "assistant created");
                id
            }
            Err(e) => {
                warn!(error = %e, "assistant creation failed, using default agent");
                self.default_agent_id.clone()
            }
        }
    }
}
