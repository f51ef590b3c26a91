//! Per-channel chat sessions with bounded history and idle expiry.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use demoforge_shared::WorkflowSpec;

/// Turns kept per channel.
pub const MAX_HISTORY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Everything remembered about one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    history: VecDeque<ChatTurn>,
    pub last_workflow_spec: Option<WorkflowSpec>,
    pub last_active: DateTime<Utc>,
}

impl ConversationContext {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            history: VecDeque::with_capacity(MAX_HISTORY),
            last_workflow_spec: None,
            last_active: now,
        }
    }

    /// Append a turn, dropping the oldest beyond [`MAX_HISTORY`].
    pub fn push(&mut self, turn: ChatTurn) {
        self.last_active = turn.timestamp;
        self.history.push_back(turn);
        while self.history.len() > MAX_HISTORY {
            self.history.pop_front();
        }
    }

    pub fn history(&self) -> Vec<ChatTurn> {
        self.history.iter().cloned().collect()
    }

    fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        (now - self.last_active)
            .to_std()
            .map(|idle| idle > ttl)
            .unwrap_or(false)
    }
}

/// Sessions keyed by channel id.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, ConversationContext>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Current context for `channel`, created on first contact.
    pub async fn context(&self, channel: &str) -> ConversationContext {
        self.context_at(channel, Utc::now()).await
    }

    pub async fn context_at(&self, channel: &str, now: DateTime<Utc>) -> ConversationContext {
        let mut sessions = self.sessions.lock().await;
        if sessions
            .get(channel)
            .is_some_and(|ctx| ctx.is_expired(now, self.ttl))
        {
            debug!(channel, "session expired, starting fresh");
            sessions.remove(channel);
        }
        sessions
            .entry(channel.to_string())
            .or_insert_with(|| ConversationContext::new(now))
            .clone()
    }

    /// Record one completed exchange.
    pub async fn record_exchange(
        &self,
        channel: &str,
        user: &str,
        assistant: &str,
        spec: Option<WorkflowSpec>,
    ) {
        self.record_exchange_at(channel, user, assistant, spec, Utc::now())
            .await;
    }

    pub async fn record_exchange_at(
        &self,
        channel: &str,
        user: &str,
        assistant: &str,
        spec: Option<WorkflowSpec>,
        now: DateTime<Utc>,
    ) {
        let mut sessions = self.sessions.lock().await;
        let ctx = sessions
            .entry(channel.to_string())
            .or_insert_with(|| ConversationContext::new(now));
        ctx.push(ChatTurn {
            role: ChatRole::User,
            content: user.to_string(),
            timestamp: now,
        });
        ctx.push(ChatTurn {
            role: ChatRole::Assistant,
            content: assistant.to_string(),
            timestamp: now,
        });
        if spec.is_some() {
            ctx.last_workflow_spec = spec;
        }
    }

    /// Drop every idle session. Returns how many were removed.
    pub async fn evict_expired(&self) -> usize {
        self.evict_expired_at(Utc::now()).await
    }

    pub async fn evict_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, ctx| !ctx.is_expired(now, self.ttl));
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, "expired sessions evicted");
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
