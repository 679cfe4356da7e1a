//! Unified error type for gifforge.
//!
//! Every failure the orchestrator can surface funnels into [`Error`]. None of
//! them are process-fatal: callers recover at the session boundary and the
//! user can always retry from a fresh file selection.

use std::fmt;

/// Unified error type covering all failure modes in gifforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bootstrapping the transcoding engine failed. Terminal until the caller
    /// explicitly retries the load.
    #[error("Engine load failed: {reason}")]
    EngineLoad {
        /// Human-readable reason reported by the engine.
        reason: String,
    },

    /// The selected input is not a video payload.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A job was requested before the engine reached `Ready`.
    #[error("Engine is not ready")]
    EngineNotReady,

    /// A job was requested while another one is still active.
    #[error("A conversion job is already running")]
    JobAlreadyRunning,

    /// The engine reported a failure while transcoding.
    #[error("Conversion failed: {reason}")]
    Conversion {
        /// Captured failure reason.
        reason: String,
    },

    /// Request data or configuration failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "handle", "file").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external tool (ffmpeg, ffprobe) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable snake_case label for logs and events.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::EngineLoad { .. } => "engine_load",
            Error::InvalidInput(_) => "invalid_input",
            Error::EngineNotReady => "engine_not_ready",
            Error::JobAlreadyRunning => "job_already_running",
            Error::Conversion { .. } => "conversion",
            Error::Validation(_) => "validation",
            Error::NotFound { .. } => "not_found",
            Error::Io { .. } => "io",
            Error::Tool { .. } => "tool",
            Error::Internal(_) => "internal",
        }
    }

    /// Whether the user can reasonably retry the same action later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::EngineLoad { .. }
                | Error::Conversion { .. }
                | Error::EngineNotReady
                | Error::JobAlreadyRunning
        )
    }

    /// Convenience constructor for [`Error::EngineLoad`].
    pub fn engine_load(reason: impl Into<String>) -> Self {
        Error::EngineLoad {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for [`Error::Conversion`].
    pub fn conversion(reason: impl Into<String>) -> Self {
        Error::Conversion {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_load_display() {
        let err = Error::engine_load("ffmpeg not found");
        assert_eq!(err.to_string(), "Engine load failed: ffmpeg not found");
        assert_eq!(err.kind(), "engine_load");
        assert!(err.is_retryable());
    }

    #[test]
    fn invalid_input_is_not_retryable() {
        let err = Error::InvalidInput("text/plain is not a video type".into());
        assert_eq!(
            err.to_string(),
            "Invalid input: text/plain is not a video type"
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn precondition_errors() {
        assert_eq!(Error::EngineNotReady.to_string(), "Engine is not ready");
        assert_eq!(
            Error::JobAlreadyRunning.to_string(),
            "A conversion job is already running"
        );
        assert_eq!(Error::JobAlreadyRunning.kind(), "job_already_running");
    }

    #[test]
    fn conversion_display() {
        let err = Error::conversion("unsupported container");
        assert_eq!(err.to_string(), "Conversion failed: unsupported container");
        assert!(err.is_retryable());
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(err.kind(), "io");
    }

    #[test]
    fn tool_display() {
        let err = Error::tool("ffmpeg", "exit code 1");
        assert_eq!(err.to_string(), "Tool error [ffmpeg]: exit code 1");
    }

    #[test]
    fn not_found_display() {
        let err = Error::not_found("file", "input-1.mp4");
        assert_eq!(err.to_string(), "file not found: input-1.mp4");
    }
}
