//! Conversational configurator: operator free text → workflow decision.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use demoforge_llm::{CompletionClient, CompletionRequest, strip_code_fence};
use demoforge_shared::{DemoForgeError, Result, WorkflowSpec};

use crate::session::{ChatRole, ChatTurn};

pub const MIN_LEADS: u32 = 1;
pub const MAX_LEADS: u32 = 20;

const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 800;

const SYSTEM_PROMPT: &str = r#"You are the assistant of DemoForge, a tool that finds cosmetic and aesthetic medical practices (botox, fillers, plastic surgery, dermatology, med spas) and builds each one a personalised AI voice receptionist demo.

You only handle cosmetic and aesthetic practices. Politely decline anything else.

Decide whether the operator wants to start a lead generation run.
If they do, reply with JSON only:
{"executeWorkflow": true, "response": "<short confirmation>", "workflowConfig": {"leadCount": <1-20>, "specialty": "<specialty or null>", "location": "<city/country or null>", "searchQuery": "<search query or null>", "filters": ["<filter phrases such as 'exclude chains' or 'must offer botox'>"]}}
Otherwise reply with JSON only:
{"executeWorkflow": false, "response": "<helpful answer>"}"#;

/// What the configurator decided for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfiguratorReply {
    pub response: String,
    /// Present exactly when a run should start.
    pub workflow: Option<WorkflowSpec>,
}

impl ConfiguratorReply {
    fn chat(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            workflow: None,
        }
    }

    pub fn executes(&self) -> bool {
        self.workflow.is_some()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReply {
    #[serde(default)]
    execute_workflow: bool,
    #[serde(default)]
    response: String,
    #[serde(default)]
    workflow_config: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWorkflowConfig {
    #[serde(default)]
    lead_count: Option<Value>,
    #[serde(default)]
    specialty: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    search_query: Option<String>,
    #[serde(default)]
    filters: Vec<String>,
}

pub struct Configurator {
    llm: Arc<dyn CompletionClient>,
    default_lead_count: u32,
}

impl Configurator {
    pub fn new(llm: Arc<dyn CompletionClient>, default_lead_count: u32) -> Self {
        Self {
            llm,
            default_lead_count,
        }
    }

    /// Interpret `message` in the context of `history`.
    ///
    /// Only a transport failure is an error ([`DemoForgeError::AiUnavailable`]);
    /// anything the model says is turned into some reply.
    #[instrument(skip_all, fields(history = history.len()))]
    pub async fn configure(&self, message: &str, history: &[ChatTurn]) -> Result<ConfiguratorReply> {
        let request = CompletionRequest::new(SYSTEM_PROMPT, user_prompt(message, history))
            .max_tokens(MAX_TOKENS)
            .temperature(TEMPERATURE);

        let raw = self
            .llm
            .complete(request)
            .await
            .map_err(|e| DemoForgeError::AiUnavailable(e.to_string()))?;

        Ok(interpret(&raw, self.default_lead_count))
    }
}

fn user_prompt(message: &str, history: &[ChatTurn]) -> String {
    let mut prompt = String::new();
    if !history.is_empty() {
        prompt.push_str("Conversation so far:\n");
        for turn in history {
            let who = match turn.role {
                ChatRole::User => "Operator",
                ChatRole::Assistant => "Assistant",
            };
            prompt.push_str(&format!("{who}: {}\n", turn.content));
        }
        prompt.push('\n');
    }
    prompt.push_str(&format!("Operator: {message}"));
    prompt
}

/// Turn a raw completion into a reply, degrading to plain chat whenever the
/// structure is not usable.
pub fn interpret(raw: &str, default_lead_count: u32) -> ConfiguratorReply {
    let text = strip_code_fence(raw).trim();
    let reply: RawReply = match serde_json::from_str(text) {
        Ok(reply) => reply,
        Err(e) => {
            debug!(error = %e, "reply is not JSON, treating as chat");
            return ConfiguratorReply::chat(raw.trim());
        }
    };

    if !reply.execute_workflow {
        return ConfiguratorReply::chat(reply.response);
    }

    let Some(config) = reply
        .workflow_config
        .filter(Value::is_object)
        .and_then(|v| serde_json::from_value::<RawWorkflowConfig>(v).ok())
    else {
        warn!("executeWorkflow without a usable workflowConfig");
        return ConfiguratorReply::chat(reply.response);
    };

    let spec = WorkflowSpec {
        lead_count: lead_count(config.lead_count.as_ref(), default_lead_count),
        specialty: non_empty(config.specialty),
        location: non_empty(config.location),
        search_query: non_empty(config.search_query),
        filters: config
            .filters
            .into_iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect(),
    };

    let response = if reply.response.trim().is_empty() {
        describe(&spec)
    } else {
        reply.response
    };

    ConfiguratorReply {
        response,
        workflow: Some(spec),
    }
}

/// Accepts numbers and numeric strings; clamps into `MIN_LEADS..=MAX_LEADS`.
fn lead_count(value: Option<&Value>, default: u32) -> u32 {
    let requested = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .unwrap_or(i64::from(default));

    requested.clamp(i64::from(MIN_LEADS), i64::from(MAX_LEADS)) as u32
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
}

/// One-line human description of a workflow.
pub fn describe(spec: &WorkflowSpec) -> String {
    let mut text = format!(
        "Starting a run for {} {}",
        spec.lead_count,
        if spec.lead_count == 1 { "lead" } else { "leads" }
    );
    if let Some(specialty) = &spec.specialty {
        text.push_str(&format!(" ({specialty})"));
    }
    if let Some(location) = &spec.location {
        text.push_str(&format!(" in {location}"));
    }
    text.push('.');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedLlm;
    use chrono::Utc;

    #[test]
    fn chat_reply() {
        let reply = interpret(
            r#"{"executeWorkflow": false, "response": "I find aesthetic clinics."}"#,
            3,
        );
        assert!(!reply.executes());
        assert_eq!(reply.response, "I find aesthetic clinics.");
    }

    #[test]
    fn workflow_reply_inside_code_fence() {
        let raw = "```json\n{\"executeWorkflow\": true, \"response\": \"On it\", \
                   \"workflowConfig\": {\"leadCount\": 3, \"specialty\": \"botox\", \
                   \"location\": \"Berlin\", \"searchQuery\": null, \
                   \"filters\": [\"exclude generic\"]}}\n```";
        let reply = interpret(raw, 5);
        let spec = reply.workflow.unwrap();
        assert_eq!(spec.lead_count, 3);
        assert_eq!(spec.specialty.as_deref(), Some("botox"));
        assert_eq!(spec.location.as_deref(), Some("Berlin"));
        assert_eq!(spec.search_query, None);
        assert_eq!(spec.filters, vec!["exclude generic".to_string()]);
    }

    #[test]
    fn lead_count_is_clamped() {
        let spec = |count: &str| {
            interpret(
                &format!(r#"{{"executeWorkflow": true, "response": "", "workflowConfig": {{"leadCount": {count}}}}}"#),
                3,
            )
            .workflow
            .unwrap()
        };
        assert_eq!(spec("50").lead_count, 20);
        assert_eq!(spec("0").lead_count, 1);
        assert_eq!(spec("-4").lead_count, 1);
        assert_eq!(spec("\"7\"").lead_count, 7);
        assert_eq!(spec("null").lead_count, 3);
        assert_eq!(spec("2").lead_count, 2);
    }

    #[test]
    fn execute_without_config_degrades_to_chat() {
        let reply = interpret(r#"{"executeWorkflow": true, "response": "Sure!"}"#, 3);
        assert!(!reply.executes());
        assert_eq!(reply.response, "Sure!");

        let reply = interpret(
            r#"{"executeWorkflow": true, "response": "Sure!", "workflowConfig": "ten leads"}"#,
            3,
        );
        assert!(!reply.executes());
    }

    #[test]
    fn non_json_is_passed_through() {
        let reply = interpret("Hello! How can I help?", 3);
        assert!(!reply.executes());
        assert_eq!(reply.response, "Hello! How can I help?");
    }

    #[test]
    fn empty_response_is_described() {
        let reply = interpret(
            r#"{"executeWorkflow": true, "workflowConfig": {"leadCount": 1, "location": "Vienna"}}"#,
            3,
        );
        assert_eq!(reply.response, "Starting a run for 1 lead in Vienna.");
    }

    #[tokio::test]
    async fn request_embeds_history_and_temperature() {
        let llm = Arc::new(ScriptedLlm::always(r#"{"executeWorkflow": false, "response": "ok"}"#));
        let configurator = Configurator::new(llm.clone(), 3);
        let history = vec![ChatTurn {
            role: ChatRole::User,
            content: "hi there".into(),
            timestamp: Utc::now(),
        }];

        configurator.configure("what can you do?", &history).await.unwrap();

        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests[0].temperature, TEMPERATURE);
        assert!(requests[0].user_prompt.contains("Operator: hi there"));
        assert!(requests[0].user_prompt.ends_with("Operator: what can you do?"));
    }

    #[tokio::test]
    async fn transport_failure_is_ai_unavailable() {
        let llm = Arc::new(ScriptedLlm::scripted(
            vec![Err(DemoForgeError::Network("connection refused".into()))],
            "",
        ));
        let err = Configurator::new(llm, 3).configure("hi", &[]).await.unwrap_err();
        assert!(matches!(err, DemoForgeError::AiUnavailable(_)));
    }
}
