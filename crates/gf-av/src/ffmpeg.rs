//! [`Engine`] implementation backed by the `ffmpeg` CLI.
//!
//! Loading resolves the executable, verifies it runs, and creates a private
//! [`Sandbox`]. Every invocation runs with the sandbox as its working
//! directory, so the flat virtual names the orchestrator uses resolve inside
//! it.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use gf_core::config::{EngineConfig, ToolsConfig};

use crate::command::ToolCommand;
use crate::engine::{Engine, ListenerId, ProgressListener, ProgressListeners};
use crate::progress::ProgressParser;
use crate::sandbox::Sandbox;
use crate::tools::ToolRegistry;

/// Arguments prepended to every invocation: quiet banner, no stdin, always
/// overwrite, machine-readable progress on stderr.
const EXEC_PRELUDE: &[&str] = &[
    "-hide_banner",
    "-nostdin",
    "-y",
    "-progress",
    "pipe:2",
    "-nostats",
];

struct Loaded {
    ffmpeg: PathBuf,
    version: Option<String>,
    sandbox: Sandbox,
}

/// ffmpeg-backed transcoding engine.
pub struct FfmpegEngine {
    tools_config: ToolsConfig,
    engine_config: EngineConfig,
    loaded: RwLock<Option<Arc<Loaded>>>,
    listeners: ProgressListeners,
}

impl FfmpegEngine {
    pub fn new(tools_config: ToolsConfig, engine_config: EngineConfig) -> Self {
        Self {
            tools_config,
            engine_config,
            loaded: RwLock::new(None),
            listeners: ProgressListeners::new(),
        }
    }

    /// First line of `ffmpeg -version`, once loaded.
    pub fn version(&self) -> Option<String> {
        self.loaded.read().as_ref().and_then(|l| l.version.clone())
    }

    /// Host path of the sandbox, once loaded.
    pub fn sandbox_root(&self) -> Option<PathBuf> {
        self.loaded.read().as_ref().map(|l| l.sandbox.root().to_path_buf())
    }

    fn loaded(&self) -> gf_core::Result<Arc<Loaded>> {
        self.loaded
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or(gf_core::Error::EngineNotReady)
    }
}

#[async_trait]
impl Engine for FfmpegEngine {
    async fn load(&self) -> gf_core::Result<()> {
        if self.loaded.read().is_some() {
            return Ok(());
        }

        let registry = ToolRegistry::discover(&self.tools_config);
        let ffmpeg = registry.require("ffmpeg")?.path.clone();

        tracing::debug!(path = %ffmpeg.display(), "Probing ffmpeg");
        let output = ToolCommand::new(ffmpeg.clone())
            .arg("-version")
            .timeout(self.engine_config.load_timeout())
            .execute()
            .await?;
        let version = output.stdout.lines().next().map(str::to_string);

        let sandbox = Sandbox::new(self.engine_config.sandbox_dir.as_deref())?;
        tracing::info!(
            version = version.as_deref().unwrap_or("unknown"),
            sandbox = %sandbox.root().display(),
            "ffmpeg engine loaded"
        );

        *self.loaded.write() = Some(Arc::new(Loaded {
            ffmpeg,
            version,
            sandbox,
        }));
        Ok(())
    }

    async fn write_file(&self, name: &str, data: Bytes) -> gf_core::Result<()> {
        let loaded = self.loaded()?;
        tracing::trace!(name, bytes = data.len(), "write_file");
        loaded.sandbox.write(name, &data).await
    }

    async fn exec(&self, args: &[String]) -> gf_core::Result<()> {
        let loaded = self.loaded()?;

        let mut cmd = ToolCommand::new(loaded.ffmpeg.clone());
        cmd.args(EXEC_PRELUDE.iter().copied())
            .args(args.iter().cloned())
            .current_dir(loaded.sandbox.root())
            .timeout(self.engine_config.exec_timeout());
        tracing::debug!(args = ?cmd.get_args(), "Running ffmpeg");

        let mut parser = ProgressParser::new();
        let listeners = &self.listeners;
        cmd.execute_streaming(|line| {
            if let Some(fraction) = parser.feed(line) {
                listeners.emit(fraction);
            }
        })
        .await?;
        Ok(())
    }

    async fn read_file(&self, name: &str) -> gf_core::Result<Bytes> {
        let loaded = self.loaded()?;
        loaded.sandbox.read(name).await
    }

    async fn delete_file(&self, name: &str) -> gf_core::Result<()> {
        let loaded = self.loaded()?;
        tracing::trace!(name, "delete_file");
        loaded.sandbox.delete(name).await
    }

    async fn list_files(&self) -> gf_core::Result<Vec<String>> {
        let loaded = self.loaded()?;
        loaded.sandbox.list().await
    }

    fn on_progress(&self, listener: ProgressListener) -> ListenerId {
        self.listeners.add(listener)
    }

    fn off_progress(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

impl std::fmt::Debug for FfmpegEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegEngine")
            .field("loaded", &self.loaded.read().is_some())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unloaded() -> FfmpegEngine {
        FfmpegEngine::new(ToolsConfig::default(), EngineConfig::default())
    }

    #[tokio::test]
    async fn operations_before_load_are_not_ready() {
        let engine = unloaded();
        assert!(matches!(
            engine.write_file("a.mp4", Bytes::from_static(b"x")).await,
            Err(gf_core::Error::EngineNotReady)
        ));
        assert!(matches!(
            engine.exec(&["-version".to_string()]).await,
            Err(gf_core::Error::EngineNotReady)
        ));
        assert!(matches!(
            engine.list_files().await,
            Err(gf_core::Error::EngineNotReady)
        ));
        assert!(engine.version().is_none());
        assert!(engine.sandbox_root().is_none());
    }

    #[test]
    fn listener_registration_round_trip() {
        let engine = unloaded();
        let id = engine.on_progress(Arc::new(|_| {}));
        assert!(engine.off_progress(id));
        assert!(!engine.off_progress(id));
    }

    #[test]
    fn subscription_deregisters_on_drop() {
        let engine = Arc::new(unloaded());
        let sub = crate::ProgressSubscription::register(engine.clone(), Arc::new(|_| {}));
        let id = sub.id();
        assert_eq!(engine.listeners.len(), 1);
        drop(sub);
        assert!(engine.listeners.is_empty());
        assert!(!engine.off_progress(id));
    }
}
