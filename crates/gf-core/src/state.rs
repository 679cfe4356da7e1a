//! Engine readiness and job lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Readiness of the process-wide transcoding engine.
///
/// Transitions only move forward, except `LoadFailed -> Loading` on an
/// explicit retry. Once loading has begun the state never returns to
/// `Unloaded`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EngineState {
    Unloaded,
    Loading,
    Ready,
    LoadFailed { reason: String },
}

impl EngineState {
    pub fn is_ready(&self) -> bool {
        matches!(self, EngineState::Ready)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: &EngineState) -> bool {
        use EngineState::*;
        matches!(
            (self, next),
            (Unloaded, Loading)
                | (Loading, Ready)
                | (Loading, LoadFailed { .. })
                | (LoadFailed { .. }, Loading)
        )
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unloaded => write!(f, "unloaded"),
            Self::Loading => write!(f, "loading"),
            Self::Ready => write!(f, "ready"),
            Self::LoadFailed { reason } => write!(f, "load_failed ({reason})"),
        }
    }
}

/// Lifecycle of the single conversion job slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Preparing,
    Running,
    Succeeded,
    Failed { reason: String },
}

impl JobState {
    /// `Preparing` or `Running`.
    pub fn is_active(&self) -> bool {
        matches!(self, JobState::Preparing | JobState::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed { .. })
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Preparing => write!(f, "preparing"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed { reason } => write!(f, "failed ({reason})"),
        }
    }
}
