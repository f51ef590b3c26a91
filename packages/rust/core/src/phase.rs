//! Per-lead processing state machine.
//!
//! ```text
//! Discovering → Extracting → Storing → Provisioning → Materializing
//!             → Deploying → Finalizing → Succeeded
//! ```
//!
//! `Failed` is reachable from every non-terminal phase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use demoforge_shared::{DemoForgeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeadPhase {
    Discovering,
    Extracting,
    Storing,
    Provisioning,
    Materializing,
    Deploying,
    Finalizing,
    Succeeded,
    Failed,
}

impl LeadPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// The single forward successor, if any.
    pub fn next(self) -> Option<Self> {
        use LeadPhase::*;
        match self {
            Discovering => Some(Extracting),
            Extracting => Some(Storing),
            Storing => Some(Provisioning),
            Provisioning => Some(Materializing),
            Materializing => Some(Deploying),
            Deploying => Some(Finalizing),
            Finalizing => Some(Succeeded),
            Succeeded | Failed => None,
        }
    }

    pub fn can_transition_to(self, to: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == Self::Failed || self.next() == Some(to)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Discovering => "discovering",
            Self::Extracting => "extracting",
            Self::Storing => "storing",
            Self::Provisioning => "provisioning",
            Self::Materializing => "materializing",
            Self::Deploying => "deploying",
            Self::Finalizing => "finalizing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for LeadPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a lead's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseRecord {
    pub phase: LeadPhase,
    pub entered_at: DateTime<Utc>,
}

/// The ordered phase history of one lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRun {
    history: Vec<PhaseRecord>,
}

impl Default for LeadRun {
    fn default() -> Self {
        Self::new()
    }
}

impl LeadRun {
    /// A run that starts in [`LeadPhase::Discovering`].
    pub fn new() -> Self {
        Self {
            history: vec![PhaseRecord {
                phase: LeadPhase::Discovering,
                entered_at: Utc::now(),
            }],
        }
    }

    pub fn current(&self) -> LeadPhase {
        self.history
            .last()
            .map(|r| r.phase)
            .unwrap_or(LeadPhase::Discovering)
    }

    /// Move to `to`, rejecting anything the transition table forbids.
    pub fn advance(&mut self, to: LeadPhase) -> Result<()> {
        let from = self.current();
        if !from.can_transition_to(to) {
            return Err(DemoForgeError::validation(format!(
                "illegal lead transition {from} → {to}"
            )));
        }
        self.history.push(PhaseRecord {
            phase: to,
            entered_at: Utc::now(),
        });
        Ok(())
    }

    /// Mark the lead failed. No-op once terminal.
    pub fn fail(&mut self) {
        if !self.current().is_terminal() {
            self.history.push(PhaseRecord {
                phase: LeadPhase::Failed,
                entered_at: Utc::now(),
            });
        }
    }

    pub fn phases(&self) -> Vec<LeadPhase> {
        self.history.iter().map(|r| r.phase).collect()
    }

    pub fn history(&self) -> &[PhaseRecord] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LeadPhase::*;

    #[test]
    fn happy_path_walks_every_phase() {
        let mut run = LeadRun::new();
        let mut phase = run.current();
        while let Some(next) = phase.next() {
            run.advance(next).unwrap();
            phase = next;
        }
        assert_eq!(
            run.phases(),
            vec![
                Discovering,
                Extracting,
                Storing,
                Provisioning,
                Materializing,
                Deploying,
                Finalizing,
                Succeeded
            ]
        );
    }

    #[test]
    fn skipping_a_phase_is_rejected() {
        let mut run = LeadRun::new();
        run.advance(Extracting).unwrap();
        let err = run.advance(Deploying).unwrap_err();
        assert!(matches!(err, DemoForgeError::Validation { .. }));
        assert_eq!(run.current(), Extracting);
    }

    #[test]
    fn failed_reachable_from_any_non_terminal() {
        for phase in [
            Discovering,
            Extracting,
            Storing,
            Provisioning,
            Materializing,
            Deploying,
            Finalizing,
        ] {
            assert!(phase.can_transition_to(Failed), "{phase}");
        }
        assert!(!Succeeded.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Extracting));
    }

    #[test]
    fn fail_is_idempotent() {
        let mut run = LeadRun::new();
        run.advance(Extracting).unwrap();
        run.fail();
        run.fail();
        assert_eq!(run.phases(), vec![Discovering, Extracting, Failed]);
    }
}
