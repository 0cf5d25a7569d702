//! Flow lifecycle: which status an instance is in and which step it is on.

use serde::{Deserialize, Serialize};

use crate::error::FlowError;

use super::step::StepId;

/// Lifecycle of a single flow instance.
///
/// Idle → Active → Submitting → Completed, with Submitting falling back to
/// Active when a save fails and Active → Skipped when the user opts out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStatus {
    #[default]
    Idle,
    Active,
    Submitting,
    Completed,
    Skipped,
}

impl FlowStatus {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: FlowStatus) -> bool {
        use FlowStatus::*;
        matches!(
            (self, target),
            (Idle, Active)
                | (Active, Submitting)
                | (Active, Skipped)
                | (Submitting, Active)
                | (Submitting, Completed)
        )
    }

    /// Whether the instance is finished and accepts nothing more.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

impl std::fmt::Display for FlowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Submitting => "submitting",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
        };
        write!(f, "{s}")
    }
}

/// Status plus step pointer, owned by one engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowState {
    pub status: FlowStatus,
    pub current_step: Option<StepId>,
}

impl FlowState {
    /// Move to `target`, refusing transitions the lifecycle does not allow.
    pub fn transition(&mut self, target: FlowStatus) -> Result<(), FlowError> {
        if !self.status.can_transition_to(target) {
            return Err(FlowError::InvalidTransition {
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }
        self.status = target;
        Ok(())
    }

    /// Fail with `NotActive` unless the flow is taking input.
    pub fn ensure_active(&self) -> Result<(), FlowError> {
        if self.status != FlowStatus::Active {
            return Err(FlowError::NotActive {
                status: self.status.to_string(),
            });
        }
        Ok(())
    }
}

/// Read-only view handed to renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowSnapshot {
    pub flow: String,
    pub status: FlowStatus,
    pub current_step: Option<String>,
    pub waiting_for_assistant: bool,
    pub submitting: bool,
    pub message_count: usize,
}
