//! The [`Engine`] trait: the capability set the orchestrator needs from a
//! transcoding engine.
//!
//! An engine owns a private, flat virtual filesystem used to stage inputs and
//! collect outputs, runs transcode invocations against it, and reports
//! progress to whichever listeners are registered at the time. The
//! production implementation is [`crate::FfmpegEngine`]; tests substitute a
//! stub implementing the same trait.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

/// Callback receiving progress as a fraction. Engines may report values
/// outside `[0, 1]`; consumers clamp.
pub type ProgressListener = Arc<dyn Fn(f64) + Send + Sync>;

/// Registration token returned by [`Engine::on_progress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A sandboxed transcoding engine.
///
/// All filesystem operations address the engine's own namespace, never the
/// host filesystem. Names are flat (no directories).
#[async_trait]
pub trait Engine: Send + Sync {
    /// Bootstrap the engine. May be slow; callers serialize invocations.
    async fn load(&self) -> gf_core::Result<()>;

    /// Write `data` to virtual file `name`, replacing any existing entry.
    async fn write_file(&self, name: &str, data: Bytes) -> gf_core::Result<()>;

    /// Run one transcode invocation with ffmpeg-style arguments.
    async fn exec(&self, args: &[String]) -> gf_core::Result<()>;

    /// Read virtual file `name`.
    async fn read_file(&self, name: &str) -> gf_core::Result<Bytes>;

    /// Delete virtual file `name`. Deleting a missing entry is not an error.
    async fn delete_file(&self, name: &str) -> gf_core::Result<()>;

    /// Names currently resident in the virtual filesystem, sorted.
    async fn list_files(&self) -> gf_core::Result<Vec<String>>;

    /// Register a progress listener.
    fn on_progress(&self, listener: ProgressListener) -> ListenerId;

    /// Remove a listener. Returns `false` if it was not registered.
    fn off_progress(&self, id: ListenerId) -> bool;
}

/// A listener registration that is removed when dropped.
///
/// Holding one for the duration of a job keeps the listener scoped to that
/// job on every exit path.
pub struct ProgressSubscription {
    engine: Arc<dyn Engine>,
    id: ListenerId,
}

impl ProgressSubscription {
    pub fn register(engine: Arc<dyn Engine>, listener: ProgressListener) -> Self {
        let id = engine.on_progress(listener);
        Self { engine, id }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl Drop for ProgressSubscription {
    fn drop(&mut self) {
        self.engine.off_progress(self.id);
    }
}

/// Registry of progress listeners shared by engine implementations.
#[derive(Default)]
pub struct ProgressListeners {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, ProgressListener)>>,
}

impl ProgressListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: ProgressListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() < before
    }

    /// Deliver `fraction` to every registered listener.
    ///
    /// Listeners run outside the registry lock so they may (de)register.
    pub fn emit(&self, fraction: f64) {
        let snapshot: Vec<ProgressListener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in snapshot {
            listener(fraction);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
