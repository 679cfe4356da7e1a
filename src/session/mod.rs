//! The conversion session: the surface a UI drives.
//!
//! A [`Session`] wires the engine manager, handle registry and orchestrator
//! together and adds the pieces a front end needs: source selection with a
//! preview handle, the frame-rate setting, the conversion trigger, download,
//! control enablement and a status line.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, watch};

use gf_av::Engine;
use gf_core::config::{Config, ConversionConfig};
use gf_core::events::{Event, EventBus, EventPayload};
use gf_core::{EngineState, Error, FrameRate, Result, SourceId, SourceMedia};

use crate::conversion::{ConversionOrchestrator, Job, OutputArtifact};
use crate::engine::EngineManager;
use crate::handles::{HandleRegistry, HandleSlot, ResourceHandle};
use crate::status::Status;

/// Parse the frame-rate field as typed by a user.
///
/// Non-numeric text falls back to the default rate; numbers are clamped to
/// the supported range.
pub fn parse_frame_rate(raw: &str) -> FrameRate {
    FrameRate::parse_lenient(raw)
}

pub struct Session {
    conversion: ConversionConfig,
    events: Arc<EventBus>,
    engine: Arc<EngineManager>,
    handles: Arc<HandleRegistry>,
    orchestrator: ConversionOrchestrator,
    source: RwLock<Option<SourceMedia>>,
    /// Serializes source replacement against claiming a job, so a job
    /// always converts the source that is current when it starts.
    selection: Mutex<()>,
    preview: HandleSlot,
    frame_rate: RwLock<FrameRate>,
}

impl Session {
    /// Build a session around `engine` using `config`.
    pub fn new(engine: Arc<dyn Engine>, config: &Config) -> Self {
        let events = Arc::new(EventBus::new(config.events.capacity));
        let engine = Arc::new(EngineManager::new(engine, Arc::clone(&events)));
        let handles = Arc::new(HandleRegistry::new(Arc::clone(&events)));
        let orchestrator = ConversionOrchestrator::new(
            Arc::clone(&engine),
            Arc::clone(&handles),
            Arc::clone(&events),
        )
        .with_output_mime(config.conversion.output_mime.clone());

        Self {
            conversion: config.conversion.clone(),
            preview: HandleSlot::new("preview", Arc::clone(&handles)),
            frame_rate: RwLock::new(config.conversion.default_frame_rate()),
            events,
            engine,
            handles,
            orchestrator,
            source: RwLock::new(None),
            selection: Mutex::new(()),
        }
    }

    // -- Engine --------------------------------------------------------------

    /// Load the engine, or retry after a failed load.
    pub async fn start(&self) -> Result<()> {
        self.engine.ensure_loaded().await
    }

    pub fn engine(&self) -> &Arc<EngineManager> {
        &self.engine
    }

    pub fn engine_state(&self) -> EngineState {
        self.engine.state()
    }

    pub fn watch_engine(&self) -> watch::Receiver<EngineState> {
        self.engine.subscribe()
    }

    // -- Source selection ----------------------------------------------------

    /// Select an in-memory payload as the source.
    ///
    /// A non-video declaration is rejected with [`Error::InvalidInput`] and
    /// leaves the session untouched. Selection is refused with
    /// [`Error::JobAlreadyRunning`] while a job is active. On success the
    /// previous source, its preview handle and any produced artifact are
    /// discarded and progress returns to zero.
    pub fn select_source(
        &self,
        name: impl Into<String>,
        mime: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Result<SourceId> {
        let candidate = SourceMedia::new(name, mime, data);
        self.adopt(candidate)
    }

    /// Select a file from disk. `mime` overrides the extension-based guess.
    pub async fn select_path(&self, path: &Path, mime: Option<&str>) -> Result<SourceId> {
        let candidate = SourceMedia::from_path(path, mime).await;
        self.adopt(candidate)
    }

    fn adopt(&self, candidate: Result<SourceMedia>) -> Result<SourceId> {
        let _selection = self.selection.lock();
        if self.orchestrator.is_active() {
            return Err(Error::JobAlreadyRunning);
        }

        let source = match candidate {
            Ok(source) => source,
            Err(e) => {
                tracing::info!(kind = e.kind(), error = %e, "Rejected source");
                self.events.broadcast(EventPayload::SourceRejected {
                    kind: e.kind().to_string(),
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };

        self.orchestrator.reset()?;
        self.preview.replace(source.data(), source.mime());

        let id = source.id();
        tracing::info!(source_id = %id, name = source.name(), bytes = source.size(), "Selected source");
        self.events.broadcast(EventPayload::SourceSelected {
            source_id: id,
            name: source.name().to_string(),
            size: source.size(),
        });
        *self.source.write() = Some(source);
        Ok(id)
    }

    pub fn source(&self) -> Option<SourceMedia> {
        self.source.read().clone()
    }

    /// Handle of the selected source's payload, for preview playback.
    pub fn preview(&self) -> Option<ResourceHandle> {
        self.preview.current()
    }

    // -- Settings ------------------------------------------------------------

    /// Apply a new frame rate, clamped to the supported range. Affects jobs
    /// started afterwards only.
    pub fn apply_settings(&self, raw: i64) -> FrameRate {
        let fps = FrameRate::clamped(raw);
        *self.frame_rate.write() = fps;
        tracing::debug!(fps = %fps, "Applied settings");
        fps
    }

    pub fn frame_rate(&self) -> FrameRate {
        *self.frame_rate.read()
    }

    // -- Conversion ----------------------------------------------------------

    /// Convert the selected source at the current frame rate.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] when no source is selected, otherwise whatever
    /// [`ConversionOrchestrator::run_job`] reports.
    pub async fn convert(&self) -> Result<OutputArtifact> {
        let (claim, source) = {
            let _selection = self.selection.lock();
            let source = self
                .source()
                .ok_or_else(|| Error::Validation("no source selected".into()))?;
            (self.orchestrator.claim()?, source)
        };
        let params = self.conversion.parameters(self.frame_rate());
        self.orchestrator.run_claimed(claim, &source, params).await
    }

    pub fn job(&self) -> Job {
        self.orchestrator.job()
    }

    pub fn artifact(&self) -> Option<OutputArtifact> {
        self.orchestrator.artifact()
    }

    /// Save the current artifact as `<dest_dir>/<output file name>`.
    ///
    /// The artifact's handle stays valid for the duration of the save even
    /// if a new selection revokes it meanwhile.
    pub async fn download(&self, dest_dir: &Path) -> Result<PathBuf> {
        let artifact = self
            .artifact()
            .ok_or_else(|| Error::not_found("artifact", "current"))?;
        let lease = self.handles.open(artifact.handle().id())?;
        lease
            .save_to(&dest_dir.join(&self.conversion.output_file_name))
            .await
    }

    // -- Presentation --------------------------------------------------------

    /// `true` when a source is selected, the engine is ready and no job is
    /// active.
    pub fn can_convert(&self) -> bool {
        self.source.read().is_some() && self.engine.is_ready() && !self.orchestrator.is_active()
    }

    /// `false` while a job is preparing or running.
    pub fn can_select_source(&self) -> bool {
        !self.orchestrator.is_active()
    }

    pub fn status(&self) -> Status {
        Status::project(
            &self.engine.state(),
            &self.orchestrator.job(),
            self.source.read().is_some(),
        )
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn handles(&self) -> &Arc<HandleRegistry> {
        &self.handles
    }
}
