//! Media-domain value objects: the selected source payload and the
//! parameters a conversion job runs with.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::ids::SourceId;
use crate::{Error, Result};

/// MIME type of every produced artifact.
pub const OUTPUT_MIME: &str = "image/gif";

/// Fixed file name used when saving the produced artifact.
pub const OUTPUT_FILE_NAME: &str = "converted.gif";

/// Extension to MIME mapping for the video containers the engine accepts.
const VIDEO_MIME_TYPES: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("m4v", "video/x-m4v"),
    ("mkv", "video/x-matroska"),
    ("webm", "video/webm"),
    ("mov", "video/quicktime"),
    ("avi", "video/x-msvideo"),
    ("wmv", "video/x-ms-wmv"),
    ("flv", "video/x-flv"),
    ("ts", "video/mp2t"),
];

/// Returns `true` when a declared MIME type belongs to the video class.
///
/// ```
/// use gf_core::is_video_mime;
///
/// assert!(is_video_mime("video/mp4"));
/// assert!(is_video_mime("Video/WebM"));
/// assert!(!is_video_mime("text/plain"));
/// ```
pub fn is_video_mime(mime: &str) -> bool {
    mime.trim().to_ascii_lowercase().starts_with("video/")
}

/// Guess a MIME type from a path's extension.
///
/// Only video containers are recognised; anything else yields `None`.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    VIDEO_MIME_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

// ---------------------------------------------------------------------------
// SourceMedia
// ---------------------------------------------------------------------------

/// An immutable, user-selected video payload.
///
/// A new selection supersedes the old value; it is never mutated in place.
/// Construction validates the declared MIME type, so a `SourceMedia` always
/// describes a video.
#[derive(Debug, Clone)]
pub struct SourceMedia {
    id: SourceId,
    name: String,
    mime: String,
    data: Bytes,
}

impl SourceMedia {
    /// Build a source from an in-memory payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `mime` is not a video type or the
    /// payload is empty.
    pub fn new(name: impl Into<String>, mime: impl Into<String>, data: impl Into<Bytes>) -> Result<Self> {
        let name = name.into();
        let mime = mime.into();
        let data = data.into();

        if !is_video_mime(&mime) {
            return Err(Error::InvalidInput(format!(
                "{name}: declared type '{mime}' is not a video type"
            )));
        }
        if data.is_empty() {
            return Err(Error::InvalidInput(format!("{name}: file is empty")));
        }

        Ok(Self {
            id: SourceId::new(),
            name,
            mime,
            data,
        })
    }

    /// Read a source from disk, taking the MIME type from `mime` or, when
    /// absent, from the file extension.
    pub async fn from_path(path: &Path, mime: Option<&str>) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let mime = match mime {
            Some(m) => m.to_string(),
            None => mime_for_path(path)
                .map(str::to_string)
                .unwrap_or_else(|| "application/octet-stream".to_string()),
        };

        // Reject before touching the payload.
        if !is_video_mime(&mime) {
            return Err(Error::InvalidInput(format!(
                "{name}: declared type '{mime}' is not a video type"
            )));
        }

        let data = tokio::fs::read(path).await?;
        Self::new(name, mime, data)
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Byte size of the payload.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Cheap clone of the payload.
    pub fn data(&self) -> Bytes {
        self.data.clone()
    }
}

// ---------------------------------------------------------------------------
// FrameRate
// ---------------------------------------------------------------------------

/// Target output frame rate, always within `[MIN, MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct FrameRate(u32);

impl FrameRate {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 60;
    pub const DEFAULT: FrameRate = FrameRate(30);

    /// Clamp any integer into the valid range.
    pub fn clamped(raw: i64) -> Self {
        Self(raw.clamp(Self::MIN as i64, Self::MAX as i64) as u32)
    }

    /// Parse raw text from a numeric field. Unparseable input falls back to
    /// [`FrameRate::DEFAULT`]; numeric input is clamped.
    pub fn parse_lenient(raw: &str) -> Self {
        raw.trim()
            .parse::<i64>()
            .map(Self::clamped)
            .unwrap_or(Self::DEFAULT)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for FrameRate {
    type Error = String;

    fn try_from(value: i64) -> std::result::Result<Self, Self::Error> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Ok(Self(value as u32))
        } else {
            Err(format!(
                "frame rate {value} is outside {}..={}",
                Self::MIN,
                Self::MAX
            ))
        }
    }
}

impl From<FrameRate> for u32 {
    fn from(fps: FrameRate) -> Self {
        fps.0
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ConversionParameters
// ---------------------------------------------------------------------------

/// Fixed downscale-and-filter policy applied to every job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalePolicy {
    /// Output width in pixels; height follows the aspect ratio.
    pub width: u32,
    /// Scaler flags passed to the scale filter.
    pub flags: String,
}

impl Default for ScalePolicy {
    fn default() -> Self {
        Self {
            width: 480,
            flags: "lanczos".into(),
        }
    }
}

/// Parameters for a single job. Immutable once the job starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionParameters {
    pub frame_rate: FrameRate,
    pub scale: ScalePolicy,
}

impl ConversionParameters {
    pub fn new(frame_rate: FrameRate) -> Self {
        Self {
            frame_rate,
            scale: ScalePolicy::default(),
        }
    }

    pub fn with_scale(mut self, scale: ScalePolicy) -> Self {
        self.scale = scale;
        self
    }

    /// Filter graph: frame-rate resample, then downscale.
    pub fn filter_graph(&self) -> String {
        format!(
            "fps={},scale={}:-1:flags={}",
            self.frame_rate, self.scale.width, self.scale.flags
        )
    }

    /// Engine arguments transcoding virtual file `input` into GIF `output`.
    pub fn transcode_args(&self, input: &str, output: &str) -> Vec<String> {
        vec![
            "-i".into(),
            input.into(),
            "-vf".into(),
            self.filter_graph(),
            "-f".into(),
            "gif".into(),
            output.into(),
        ]
    }
}

impl Default for ConversionParameters {
    fn default() -> Self {
        Self::new(FrameRate::DEFAULT)
    }
}
