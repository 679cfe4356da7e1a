//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from TOML and carries the
//! tool, engine, conversion, and event settings. Every section defaults
//! sensibly so an empty file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::media::{ConversionParameters, FrameRate, ScalePolicy, OUTPUT_FILE_NAME, OUTPUT_MIME};
use crate::Error;

/// Locations searched by [`Config::load_or_default`] when no path is given.
const DEFAULT_PATHS: &[&str] = &["./gifforge.toml", "~/.config/gifforge/config.toml"];

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub engine: EngineConfig,
    pub conversion: ConversionConfig,
    pub events: EventsConfig,
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load the explicit `path`, or the first default location that exists,
    /// or fall back to defaults.
    ///
    /// An explicit path that cannot be read or parsed is an error; default
    /// locations are best-effort.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        for candidate in DEFAULT_PATHS {
            let expanded = shellexpand::tilde(candidate);
            let candidate = Path::new(expanded.as_ref());
            if candidate.exists() {
                match Self::load(candidate) {
                    Ok(cfg) => return Ok(cfg),
                    Err(e) => {
                        tracing::warn!("Failed to load config file {}: {e}", candidate.display());
                    }
                }
            }
        }

        tracing::debug!("No config file found; using defaults");
        Ok(Self::default())
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let fps = self.conversion.default_frame_rate;
        if !(FrameRate::MIN..=FrameRate::MAX).contains(&fps) {
            warnings.push(format!(
                "conversion.default_frame_rate {fps} is outside {}..={} and will be clamped",
                FrameRate::MIN,
                FrameRate::MAX
            ));
        }

        if self.conversion.scale_width == 0 {
            warnings.push("conversion.scale_width is 0".into());
        }

        if self.conversion.output_file_name.trim().is_empty() {
            warnings.push("conversion.output_file_name is empty".into());
        }

        if self.engine.load_timeout_secs == 0 {
            warnings.push("engine.load_timeout_secs is 0; every load will time out".into());
        }

        if self.engine.exec_timeout_secs == 0 {
            warnings.push("engine.exec_timeout_secs is 0; every job will time out".into());
        }

        if let Some(ref p) = self.tools.ffmpeg_path {
            if !p.exists() {
                warnings.push(format!(
                    "tools.ffmpeg_path {} does not exist; PATH will be searched",
                    p.display()
                ));
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// Engine bootstrap and execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub load_timeout_secs: u64,
    pub exec_timeout_secs: u64,
    /// Parent directory for the engine's private sandbox. System temp dir
    /// when unset.
    pub sandbox_dir: Option<PathBuf>,
}

impl EngineConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }

    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            load_timeout_secs: 30,
            exec_timeout_secs: 600,
            sandbox_dir: None,
        }
    }
}

/// Conversion defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    pub default_frame_rate: u32,
    pub scale_width: u32,
    pub scale_flags: String,
    pub output_file_name: String,
    pub output_mime: String,
}

impl ConversionConfig {
    pub fn default_frame_rate(&self) -> FrameRate {
        FrameRate::clamped(self.default_frame_rate as i64)
    }

    pub fn scale_policy(&self) -> ScalePolicy {
        ScalePolicy {
            width: self.scale_width,
            flags: self.scale_flags.clone(),
        }
    }

    /// Parameters for a job at `frame_rate` with the configured scale policy.
    pub fn parameters(&self, frame_rate: FrameRate) -> ConversionParameters {
        ConversionParameters::new(frame_rate).with_scale(self.scale_policy())
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        let scale = ScalePolicy::default();
        Self {
            default_frame_rate: FrameRate::DEFAULT.get(),
            scale_width: scale.width,
            scale_flags: scale.flags,
            output_file_name: OUTPUT_FILE_NAME.into(),
            output_mime: OUTPUT_MIME.into(),
        }
    }
}

/// Event bus settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}
