//! Background workflow runs.
//!
//! [`JobQueue::submit`] returns immediately with a [`JobHandle`]; the run
//! happens on its own tokio task. Status is observable through the handle and
//! every lifecycle change is broadcast as a [`JobEvent`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};
use tracing::{error, info, instrument};
use uuid::Uuid;

use demoforge_shared::{Result, WorkflowSpec};

use crate::pipeline::{Pipeline, RunSummary, SilentProgress};

const EVENT_CAPACITY: usize = 64;

/// Runs one workflow to completion.
#[async_trait]
pub trait WorkflowRunner: Send + Sync {
    async fn run(&self, spec: &WorkflowSpec) -> Result<RunSummary>;
}

#[async_trait]
impl WorkflowRunner for Pipeline {
    async fn run(&self, spec: &WorkflowSpec) -> Result<RunSummary> {
        self.run_workflow(spec, &SilentProgress).await
    }
}

#[derive(Debug, Clone)]
pub enum JobStatus {
    Queued,
    Running,
    Completed(RunSummary),
    Failed(String),
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }
}

#[derive(Debug, Clone)]
pub enum JobEvent {
    Started { job_id: Uuid },
    Finished { job_id: Uuid, summary: RunSummary },
    Failed { job_id: Uuid, error: String },
}

impl JobEvent {
    pub fn job_id(&self) -> Uuid {
        match self {
            Self::Started { job_id }
            | Self::Finished { job_id, .. }
            | Self::Failed { job_id, .. } => *job_id,
        }
    }
}

/// Observable handle to a submitted job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    pub id: Uuid,
    pub spec: WorkflowSpec,
    status: watch::Receiver<JobStatus>,
}

impl JobHandle {
    pub fn status(&self) -> JobStatus {
        self.status.borrow().clone()
    }

    /// Wait until the job has finished and return its final status.
    pub async fn wait(&self) -> JobStatus {
        let mut rx = self.status.clone();
        let finished = rx
            .wait_for(JobStatus::is_finished)
            .await
            .map(|status| status.clone());
        // On error the task is gone; report the last status it published.
        finished.unwrap_or_else(|_| rx.borrow().clone())
    }
}

#[derive(Clone)]
pub struct JobQueue {
    runner: Arc<dyn WorkflowRunner>,
    events: broadcast::Sender<JobEvent>,
}

impl JobQueue {
    pub fn new(runner: Arc<dyn WorkflowRunner>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { runner, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    /// Start `spec` in the background.
    #[instrument(skip_all, fields(lead_count = spec.lead_count))]
    pub fn submit(&self, spec: WorkflowSpec) -> JobHandle {
        let id = Uuid::now_v7();
        let (status_tx, status_rx) = watch::channel(JobStatus::Queued);
        let runner = Arc::clone(&self.runner);
        let events = self.events.clone();
        let task_spec = spec.clone();

        tokio::spawn(async move {
            status_tx.send_replace(JobStatus::Running);
            let _ = events.send(JobEvent::Started { job_id: id });

            match runner.run(&task_spec).await {
                Ok(summary) => {
                    info!(job_id = %id, succeeded = summary.succeeded, failed = summary.failed, "job finished");
                    status_tx.send_replace(JobStatus::Completed(summary.clone()));
                    let _ = events.send(JobEvent::Finished {
                        job_id: id,
                        summary,
                    });
                }
                Err(e) => {
                    error!(job_id = %id, error = %e, "job failed");
                    let message = e.to_string();
                    status_tx.send_replace(JobStatus::Failed(message.clone()));
                    let _ = events.send(JobEvent::Failed {
                        job_id: id,
                        error: message,
                    });
                }
            }
        });

        info!(job_id = %id, "job submitted");
        JobHandle {
            id,
            spec,
            status: status_rx,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use demoforge_shared::DemoForgeError;
    use std::sync::Mutex;

    /// Records submitted specs and answers with an empty summary.
    #[derive(Default)]
    pub struct RecordingRunner {
        pub specs: Mutex<Vec<WorkflowSpec>>,
        pub fail: bool,
    }

    #[async_trait]
    impl WorkflowRunner for RecordingRunner {
        async fn run(&self, spec: &WorkflowSpec) -> Result<RunSummary> {
            self.specs.lock().unwrap().push(spec.clone());
            if self.fail {
                return Err(DemoForgeError::NoCandidatesFound {
                    query: "botox".into(),
                });
            }
            Ok(RunSummary {
                run_id: Uuid::now_v7(),
                results: Vec::new(),
                succeeded: spec.lead_count as usize,
                failed: 0,
                elapsed_ms: 1,
            })
        }
    }

    #[tokio::test]
    async fn completed_job_reports_summary_and_event() {
        let runner = Arc::new(RecordingRunner::default());
        let queue = JobQueue::new(runner.clone());
        let mut events = queue.subscribe();

        let handle = queue.submit(WorkflowSpec::with_count(2));
        let JobStatus::Completed(summary) = handle.wait().await else {
            panic!("expected completion, got {:?}", handle.status());
        };
        assert_eq!(summary.succeeded, 2);
        assert!(handle.status().is_finished());

        let started = events.recv().await.unwrap();
        assert!(matches!(started, JobEvent::Started { .. }));
        let finished = events.recv().await.unwrap();
        assert_eq!(finished.job_id(), handle.id);
        assert!(matches!(finished, JobEvent::Finished { .. }));
    }

    #[tokio::test]
    async fn failed_job_reports_error() {
        let runner = Arc::new(RecordingRunner {
            fail: true,
            ..Default::default()
        });
        let queue = JobQueue::new(runner);
        let mut events = queue.subscribe();

        let handle = queue.submit(WorkflowSpec::with_count(1));
        let JobStatus::Failed(message) = handle.wait().await else {
            panic!("expected failure");
        };
        assert!(message.contains("no candidates"));

        let _started = events.recv().await.unwrap();
        assert!(matches!(events.recv().await.unwrap(), JobEvent::Failed { .. }));
    }

    #[tokio::test]
    async fn pipeline_runs_as_job() {
        use crate::pipeline::tests::{Fakes, options};
        use std::time::Duration;

        let fakes = Fakes::new(&["https://glow.at"]);
        let queue = JobQueue::new(Arc::new(fakes.pipeline(options(Duration::ZERO))));
        let handle = queue.submit(WorkflowSpec::with_count(1));
        let JobStatus::Completed(summary) = handle.wait().await else {
            panic!("pipeline job did not complete");
        };
        assert_eq!(summary.succeeded, 1);
    }
}
