//! # gf-av
//!
//! The transcoding engine seam for gifforge and its ffmpeg-backed
//! implementation.
//!
//! This crate provides:
//!
//! - **Engine capability trait** ([`Engine`]) -- the small surface the
//!   orchestrator drives: load, a private virtual filesystem, exec, and
//!   progress listener registration.
//! - **Progress listeners** ([`ProgressListeners`]) -- a registry engines use
//!   to fan out progress fractions to scoped listeners.
//! - **ffmpeg engine** ([`FfmpegEngine`]) -- runs the `ffmpeg` CLI against a
//!   sandboxed temporary directory.
//! - **Tool discovery** ([`ToolRegistry`]) and **command execution**
//!   ([`ToolCommand`]) -- async process builder with timeout support and
//!   streamed stderr.

pub mod command;
pub mod engine;
pub mod ffmpeg;
pub mod progress;
pub mod sandbox;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use engine::{Engine, ListenerId, ProgressListener, ProgressListeners, ProgressSubscription};
pub use ffmpeg::FfmpegEngine;
pub use progress::ProgressParser;
pub use sandbox::Sandbox;
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
