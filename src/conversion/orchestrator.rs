//! Conversion job orchestration.
//!
//! [`ConversionOrchestrator::run_job`] drives one source through the engine:
//! stage the payload in the engine's virtual filesystem, run the transcode
//! with a job-scoped progress listener, read back the output, and publish it.
//! The staged entries are deleted on every exit path.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;

use gf_av::{ProgressListener, ProgressSubscription};
use gf_core::events::{EventBus, EventPayload};
use gf_core::{ConversionParameters, Error, JobId, Result, SourceMedia, OUTPUT_MIME};

use super::job::{percent_from_fraction, Job, OutputArtifact};
use crate::engine::EngineManager;
use crate::handles::{HandleRegistry, HandleSlot};

/// Virtual file names used by one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedNames {
    pub input: String,
    pub output: String,
}

impl StagedNames {
    /// Names derived from the job id, so concurrent or repeated jobs never
    /// collide. The input keeps the source extension when it is a plain
    /// short alphanumeric one.
    pub fn for_job(job_id: JobId, source_name: &str) -> Self {
        let ext = Path::new(source_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "bin".to_string());
        let short = job_id.short();
        Self {
            input: format!("input-{short}.{ext}"),
            output: format!("output-{short}.gif"),
        }
    }
}

/// The exclusive right to run one job on a [`ConversionOrchestrator`].
///
/// Released when dropped, so a claim that never reaches
/// [`ConversionOrchestrator::run_claimed`] frees the slot again.
#[must_use = "the job slot is released as soon as the claim is dropped"]
pub struct JobClaim<'a> {
    flag: &'a AtomicBool,
}

impl<'a> JobClaim<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for JobClaim<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for JobClaim<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobClaim").finish_non_exhaustive()
    }
}

pub struct ConversionOrchestrator {
    engine: Arc<EngineManager>,
    events: Arc<EventBus>,
    artifact: HandleSlot,
    output_mime: String,
    active: AtomicBool,
    job: Arc<RwLock<Job>>,
}

impl ConversionOrchestrator {
    pub fn new(
        engine: Arc<EngineManager>,
        handles: Arc<HandleRegistry>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            engine,
            events,
            artifact: HandleSlot::new("artifact", handles),
            output_mime: OUTPUT_MIME.to_string(),
            active: AtomicBool::new(false),
            job: Arc::new(RwLock::new(Job::idle())),
        }
    }

    /// MIME type artifacts are published under.
    pub fn with_output_mime(mut self, mime: impl Into<String>) -> Self {
        self.output_mime = mime.into();
        self
    }

    /// Snapshot of the current job.
    pub fn job(&self) -> Job {
        self.job.read().clone()
    }

    /// `true` while a job is preparing or running.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// The artifact of the last successful job, unless superseded.
    pub fn artifact(&self) -> Option<OutputArtifact> {
        self.job.read().artifact().cloned()
    }

    /// Discard the last job and its artifact, returning to `Idle` with zero
    /// progress.
    ///
    /// # Errors
    ///
    /// [`Error::JobAlreadyRunning`] while a job is active.
    pub fn reset(&self) -> Result<()> {
        let Some(_claim) = JobClaim::acquire(&self.active) else {
            return Err(Error::JobAlreadyRunning);
        };
        self.artifact.clear();
        *self.job.write() = Job::idle();
        Ok(())
    }

    /// Claim the single job slot without starting a job.
    ///
    /// # Errors
    ///
    /// [`Error::EngineNotReady`] unless the engine is loaded,
    /// [`Error::JobAlreadyRunning`] while another claim is held.
    pub fn claim(&self) -> Result<JobClaim<'_>> {
        if !self.engine.is_ready() {
            tracing::debug!(state = %self.engine.state(), "Rejecting job: engine not ready");
            return Err(Error::EngineNotReady);
        }
        JobClaim::acquire(&self.active).ok_or_else(|| {
            tracing::debug!("Rejecting job: another job is active");
            Error::JobAlreadyRunning
        })
    }

    /// Convert `source` with `params`.
    ///
    /// Rejects with [`Error::EngineNotReady`] or [`Error::JobAlreadyRunning`]
    /// before touching the engine. Engine failures end the job as `Failed`
    /// and surface as [`Error::Conversion`]. Either way the staged virtual
    /// files are deleted before this returns.
    pub async fn run_job(
        &self,
        source: &SourceMedia,
        params: ConversionParameters,
    ) -> Result<OutputArtifact> {
        let claim = self.claim()?;
        self.run_claimed(claim, source, params).await
    }

    /// Run a job under a claim taken earlier with [`Self::claim`].
    pub async fn run_claimed(
        &self,
        claim: JobClaim<'_>,
        source: &SourceMedia,
        params: ConversionParameters,
    ) -> Result<OutputArtifact> {
        debug_assert!(std::ptr::eq(claim.flag, &self.active));
        let _claim = claim;

        // A new job supersedes the previous artifact.
        self.artifact.clear();

        let job = Job::preparing(params.clone());
        let job_id = job.id();
        *self.job.write() = job;
        self.events.broadcast(EventPayload::JobPreparing { job_id });

        let names = StagedNames::for_job(job_id, source.name());
        tracing::info!(
            job_id = %job_id,
            source = source.name(),
            bytes = source.size(),
            fps = %params.frame_rate,
            "Starting conversion"
        );

        let outcome = self.transcode(job_id, source, &params, &names).await;
        self.cleanup(job_id, &names).await;

        match outcome {
            Ok(bytes) => {
                let handle = self.artifact.replace(bytes.clone(), &self.output_mime);
                let artifact = OutputArtifact::new(job_id, source.id(), bytes, handle);
                self.job.write().succeed(artifact.clone());
                tracing::info!(job_id = %job_id, bytes = artifact.len(), "Conversion succeeded");
                self.events.broadcast(EventPayload::JobSucceeded {
                    job_id,
                    bytes: artifact.len() as u64,
                });
                Ok(artifact)
            }
            Err(e) => {
                let kind = e.kind();
                let reason = match e {
                    Error::Conversion { reason } => reason,
                    other => other.to_string(),
                };
                self.job.write().fail(reason.clone());
                tracing::warn!(job_id = %job_id, kind, error = %reason, "Conversion failed");
                self.events.broadcast(EventPayload::JobFailed {
                    job_id,
                    kind: kind.to_string(),
                    error: reason.clone(),
                });
                Err(Error::conversion(reason))
            }
        }
    }

    async fn transcode(
        &self,
        job_id: JobId,
        source: &SourceMedia,
        params: &ConversionParameters,
        names: &StagedNames,
    ) -> Result<Bytes> {
        let engine = self.engine.engine();

        engine.write_file(&names.input, source.data()).await?;

        let subscription =
            ProgressSubscription::register(Arc::clone(engine), self.progress_listener(job_id));
        self.job.write().set_running();
        self.events.broadcast(EventPayload::JobStarted { job_id });

        let args = params.transcode_args(&names.input, &names.output);
        tracing::debug!(job_id = %job_id, ?args, "Invoking engine");
        engine.exec(&args).await?;
        drop(subscription);

        let bytes = engine.read_file(&names.output).await?;
        if bytes.is_empty() {
            return Err(Error::conversion("engine produced an empty output"));
        }
        Ok(bytes)
    }

    fn progress_listener(&self, job_id: JobId) -> ProgressListener {
        let job = Arc::clone(&self.job);
        let events = Arc::clone(&self.events);
        Arc::new(move |fraction| {
            let advanced = {
                let mut job = job.write();
                if job.id() != job_id {
                    return;
                }
                job.advance(percent_from_fraction(fraction))
            };
            if let Some(percent) = advanced {
                tracing::trace!(job_id = %job_id, percent, "Progress");
                events.broadcast(EventPayload::JobProgress { job_id, percent });
            }
        })
    }

    async fn cleanup(&self, job_id: JobId, names: &StagedNames) {
        let engine = self.engine.engine();
        for name in [&names.input, &names.output] {
            if let Err(e) = engine.delete_file(name).await {
                tracing::warn!(job_id = %job_id, file = %name, error = %e, "Failed to delete staged file");
            }
        }
    }
}

impl std::fmt::Debug for ConversionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionOrchestrator")
            .field("active", &self.is_active())
            .field("job", &*self.job.read())
            .finish()
    }
}
