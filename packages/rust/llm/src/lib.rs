//! Language-model completion collaborator.
//!
//! Every structured ask in DemoForge (site extraction, conversational
//! configuration) goes through the [`CompletionClient`] trait. The production
//! implementation talks to an OpenRouter-compatible chat completions endpoint;
//! tests substitute scripted fakes.

mod json;
mod openrouter;

use async_trait::async_trait;

use demoforge_shared::Result;

pub use json::{parse_json_reply, strip_code_fence};
pub use openrouter::OpenRouterClient;

/// A single-turn completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            max_tokens: 500,
            temperature: 0.1,
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Returns the text of a single completion.
///
/// Implementations return `Err` for transport failures, non-success statuses,
/// and responses without any text. Callers decide whether that is fatal.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}
