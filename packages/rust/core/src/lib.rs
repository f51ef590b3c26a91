//! Core orchestration and domain logic for DemoForge.
//!
//! This crate ties together discovery, extraction, storage, agent
//! provisioning, repository materialization and deployment into the per-lead
//! pipeline, and layers the conversational surface (sessions, configurator,
//! background jobs) on top.

pub mod agent;
pub mod chat;
pub mod conversation;
pub mod jobs;
pub mod phase;
pub mod pipeline;
pub mod repository;
pub mod session;

#[cfg(test)]
pub(crate) mod fakes;

pub use chat::{ChatReply, ChatService};
pub use conversation::{Configurator, ConfiguratorReply};
pub use jobs::{JobEvent, JobHandle, JobQueue, JobStatus, WorkflowRunner};
pub use phase::{LeadPhase, LeadRun};
pub use pipeline::{
    Collaborators, LeadStatus, Pipeline, PipelineOptions, PipelineResult, ProgressReporter,
    RunSummary, SilentProgress, completion_client,
};
pub use session::{ChatRole, ChatTurn, ConversationContext, SessionStore};
