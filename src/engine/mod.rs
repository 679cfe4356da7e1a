//! Engine lifecycle management.
//!
//! [`EngineManager`] owns the single [`EngineState`] for the process and
//! serializes bootstrap attempts: concurrent callers of
//! [`EngineManager::ensure_loaded`] share one in-flight attempt, a ready
//! engine is never re-initialized, and a failed load stays failed until a
//! caller asks again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use gf_av::Engine;
use gf_core::events::{EventBus, EventPayload};
use gf_core::{EngineState, Error, Result};

pub struct EngineManager {
    engine: Arc<dyn Engine>,
    events: Arc<EventBus>,
    state_tx: watch::Sender<EngineState>,
    load_lock: Mutex<()>,
    /// Number of completed load attempts.
    attempts: AtomicU64,
}

impl EngineManager {
    pub fn new(engine: Arc<dyn Engine>, events: Arc<EventBus>) -> Self {
        let (state_tx, _) = watch::channel(EngineState::Unloaded);
        Self {
            engine,
            events,
            state_tx,
            load_lock: Mutex::new(()),
            attempts: AtomicU64::new(0),
        }
    }

    /// The managed engine.
    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state_tx.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.state_tx.borrow().is_ready()
    }

    /// Watch the lifecycle state. The receiver always holds the latest value.
    pub fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.state_tx.subscribe()
    }

    /// Number of bootstrap attempts that have run to completion.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Acquire)
    }

    /// Make sure the engine is loaded.
    ///
    /// Returns immediately when ready. Otherwise runs one bootstrap attempt;
    /// callers arriving while an attempt is in flight wait for it and receive
    /// its outcome instead of starting another. After a failure the next call
    /// is a fresh attempt.
    ///
    /// # Errors
    ///
    /// [`Error::EngineLoad`] carrying the bootstrap failure reason.
    pub async fn ensure_loaded(&self) -> Result<()> {
        if self.is_ready() {
            return Ok(());
        }

        let seen = self.attempts.load(Ordering::Acquire);
        let _guard = self.load_lock.lock().await;

        // An attempt finished while we were queued: share its outcome.
        if self.attempts.load(Ordering::Acquire) != seen {
            return match self.state() {
                EngineState::Ready => Ok(()),
                EngineState::LoadFailed { reason } => Err(Error::engine_load(reason)),
                other => Err(Error::Internal(format!(
                    "engine in state {other} after a completed load attempt"
                ))),
            };
        }
        if self.is_ready() {
            return Ok(());
        }

        self.transition(EngineState::Loading);
        tracing::info!("Loading transcoding engine");

        let outcome = self.engine.load().await;
        let result = match outcome {
            Ok(()) => {
                self.transition(EngineState::Ready);
                tracing::info!("Transcoding engine ready");
                Ok(())
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::error!(error = %reason, "Transcoding engine failed to load");
                self.transition(EngineState::LoadFailed {
                    reason: reason.clone(),
                });
                Err(Error::engine_load(reason))
            }
        };

        self.attempts.fetch_add(1, Ordering::AcqRel);
        result
    }

    fn transition(&self, next: EngineState) {
        let current = self.state();
        if !current.can_transition_to(&next) {
            tracing::warn!(from = %current, to = %next, "Unexpected engine state transition");
        }
        self.state_tx.send_replace(next.clone());
        self.events
            .broadcast(EventPayload::EngineStateChanged { state: next });
    }
}

impl std::fmt::Debug for EngineManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineManager")
            .field("state", &self.state())
            .field("attempts", &self.attempts())
            .finish()
    }
}
