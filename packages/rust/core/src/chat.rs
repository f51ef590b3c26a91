//! One operator turn: session → configurator → optional job.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::conversation::Configurator;
use crate::jobs::{JobHandle, JobQueue};
use crate::session::SessionStore;

pub const AI_UNAVAILABLE_REPLY: &str =
    "Sorry, I can't reach the AI service right now. Please try again in a minute.";

/// What the operator sees after a turn.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub text: String,
    /// The run this turn started, if any.
    pub job: Option<JobHandle>,
}

pub struct ChatService {
    sessions: Arc<SessionStore>,
    configurator: Configurator,
    jobs: JobQueue,
}

impl ChatService {
    pub fn new(sessions: Arc<SessionStore>, configurator: Configurator, jobs: JobQueue) -> Self {
        Self {
            sessions,
            configurator,
            jobs,
        }
    }

    pub fn jobs(&self) -> &JobQueue {
        &self.jobs
    }

    #[instrument(skip_all, fields(channel = %channel))]
    pub async fn handle_message(&self, channel: &str, text: &str) -> ChatReply {
        let context = self.sessions.context(channel).await;

        let reply = match self.configurator.configure(text, &context.history()).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "configurator unavailable");
                return ChatReply {
                    text: AI_UNAVAILABLE_REPLY.to_string(),
                    job: None,
                };
            }
        };

        let job = reply.workflow.clone().map(|spec| self.jobs.submit(spec));
        if let Some(handle) = &job {
            info!(job_id = %handle.id, lead_count = handle.spec.lead_count, "run started from chat");
        }

        self.sessions
            .record_exchange(channel, text, &reply.response, reply.workflow)
            .await;

        ChatReply {
            text: reply.response,
            job,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedLlm;
    use crate::jobs::tests::RecordingRunner;
    use demoforge_shared::DemoForgeError;
    use std::time::Duration;

    fn service(llm: ScriptedLlm, runner: Arc<RecordingRunner>) -> (ChatService, Arc<SessionStore>) {
        let sessions = Arc::new(SessionStore::new(Duration::from_secs(3600)));
        let chat = ChatService::new(
            sessions.clone(),
            Configurator::new(Arc::new(llm), 3),
            JobQueue::new(runner),
        );
        (chat, sessions)
    }

    #[tokio::test]
    async fn question_gets_answer_without_job() {
        let runner = Arc::new(RecordingRunner::default());
        let llm = ScriptedLlm::always(
            r#"{"executeWorkflow": false, "response": "I find aesthetic clinics and build voice demos for them."}"#,
        );
        let (chat, sessions) = service(llm, runner.clone());

        let reply = chat.handle_message("ops", "What can you do?").await;
        assert!(reply.job.is_none());
        assert!(reply.text.contains("voice demos"));
        assert!(runner.specs.lock().unwrap().is_empty());
        assert_eq!(sessions.context("ops").await.history().len(), 2);
    }

    #[tokio::test]
    async fn run_request_submits_exactly_one_job() {
        let runner = Arc::new(RecordingRunner::default());
        let llm = ScriptedLlm::always(
            r#"{"executeWorkflow": true, "response": "Finding 3 botox clinics in Berlin.",
                "workflowConfig": {"leadCount": 3, "specialty": "botox", "location": "Berlin",
                "searchQuery": null, "filters": ["exclude generic"]}}"#,
        );
        let (chat, sessions) = service(llm, runner.clone());

        let reply = chat
            .handle_message("ops", "Find 3 botox clinics in Berlin, exclude generic")
            .await;
        let handle = reply.job.expect("job started");
        handle.wait().await;

        let specs = runner.specs.lock().unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].lead_count, 3);
        assert_eq!(specs[0].location.as_deref(), Some("Berlin"));
        assert_eq!(specs[0].filters, vec!["exclude generic".to_string()]);
        drop(specs);

        let ctx = sessions.context("ops").await;
        assert_eq!(ctx.last_workflow_spec.map(|s| s.lead_count), Some(3));
    }

    #[tokio::test]
    async fn ai_outage_apologises_and_leaves_session_alone() {
        let runner = Arc::new(RecordingRunner::default());
        let llm = ScriptedLlm::scripted(
            vec![Err(DemoForgeError::Network("timeout".into()))],
            r#"{"executeWorkflow": false, "response": "back"}"#,
        );
        let (chat, sessions) = service(llm, runner);

        let reply = chat.handle_message("ops", "hello?").await;
        assert_eq!(reply.text, AI_UNAVAILABLE_REPLY);
        assert!(reply.job.is_none());
        assert!(sessions.context("ops").await.history().is_empty());

        let reply = chat.handle_message("ops", "hello?").await;
        assert_eq!(reply.text, "back");
    }
}
