//! Human-readable status line: a read-only projection of engine and job
//! state for whatever surface renders it.

use std::fmt;

use gf_core::{EngineState, JobState};

use crate::conversion::Job;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Initializing,
    LoadFailed { reason: String },
    AwaitingSource,
    Ready,
    Converting,
    Progress(u8),
    Done,
    Failed { reason: String },
}

impl Status {
    pub fn project(engine: &EngineState, job: &Job, has_source: bool) -> Self {
        match engine {
            EngineState::Unloaded | EngineState::Loading => Status::Initializing,
            EngineState::LoadFailed { reason } => Status::LoadFailed {
                reason: reason.clone(),
            },
            EngineState::Ready => match job.state() {
                JobState::Preparing => Status::Converting,
                JobState::Running if job.progress() == 0 => Status::Converting,
                JobState::Running => Status::Progress(job.progress()),
                JobState::Succeeded => Status::Done,
                JobState::Failed { reason } => Status::Failed {
                    reason: reason.clone(),
                },
                JobState::Idle if has_source => Status::Ready,
                JobState::Idle => Status::AwaitingSource,
            },
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Initializing => write!(f, "Initializing engine..."),
            Status::LoadFailed { reason } => {
                write!(f, "Failed to load engine. Please retry. ({reason})")
            }
            Status::AwaitingSource => write!(f, "Select a video file"),
            Status::Ready => write!(f, "Ready"),
            Status::Converting => write!(f, "Converting..."),
            Status::Progress(percent) => write!(f, "{percent}%"),
            Status::Done => write!(f, "Done"),
            Status::Failed { reason } => write!(f, "Conversion failed: {reason}"),
        }
    }
}
