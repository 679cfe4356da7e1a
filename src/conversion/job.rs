//! The conversion job record and its output artifact.

use bytes::Bytes;

use gf_core::{ConversionParameters, JobId, JobState, SourceId};

use crate::handles::ResourceHandle;

/// The produced image plus the handle it is published under.
#[derive(Debug, Clone)]
pub struct OutputArtifact {
    job_id: JobId,
    source_id: SourceId,
    bytes: Bytes,
    handle: ResourceHandle,
}

impl OutputArtifact {
    pub(crate) fn new(job_id: JobId, source_id: SourceId, bytes: Bytes, handle: ResourceHandle) -> Self {
        Self {
            job_id,
            source_id,
            bytes,
            handle,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// The source this artifact was converted from.
    pub fn source_id(&self) -> SourceId {
        self.source_id
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn handle(&self) -> &ResourceHandle {
        &self.handle
    }

    pub fn mime(&self) -> &str {
        self.handle.mime()
    }
}

/// Snapshot of the current (or most recent) conversion job.
#[derive(Debug, Clone)]
pub struct Job {
    id: JobId,
    state: JobState,
    progress: u8,
    parameters: Option<ConversionParameters>,
    artifact: Option<OutputArtifact>,
}

impl Job {
    pub(crate) fn idle() -> Self {
        Self {
            id: JobId::new(),
            state: JobState::Idle,
            progress: 0,
            parameters: None,
            artifact: None,
        }
    }

    pub(crate) fn preparing(parameters: ConversionParameters) -> Self {
        Self {
            id: JobId::new(),
            state: JobState::Preparing,
            progress: 0,
            parameters: Some(parameters),
            artifact: None,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    /// Progress in percent, `0..=100`.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn parameters(&self) -> Option<&ConversionParameters> {
        self.parameters.as_ref()
    }

    pub fn artifact(&self) -> Option<&OutputArtifact> {
        self.artifact.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub(crate) fn set_running(&mut self) {
        self.state = JobState::Running;
    }

    /// Raise progress to `percent`. Returns the new value if it moved.
    ///
    /// Only a running job advances, and never backwards.
    pub(crate) fn advance(&mut self, percent: u8) -> Option<u8> {
        let percent = percent.min(100);
        if self.state != JobState::Running || percent <= self.progress {
            return None;
        }
        self.progress = percent;
        Some(percent)
    }

    pub(crate) fn succeed(&mut self, artifact: OutputArtifact) {
        self.state = JobState::Succeeded;
        self.artifact = Some(artifact);
    }

    pub(crate) fn fail(&mut self, reason: impl Into<String>) {
        self.state = JobState::Failed {
            reason: reason.into(),
        };
        self.artifact = None;
    }
}

impl Default for Job {
    fn default() -> Self {
        Self::idle()
    }
}

/// Convert an engine-reported fraction to a whole percentage.
///
/// Out-of-range fractions are clamped into `[0, 1]` first and the result is
/// rounded to the nearest whole percent. NaN maps to 0.
pub fn percent_from_fraction(fraction: f64) -> u8 {
    if fraction.is_nan() {
        return 0;
    }
    (fraction.clamp(0.0, 1.0) * 100.0).round() as u8
}
