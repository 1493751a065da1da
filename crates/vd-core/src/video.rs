//! Video domain model: container formats, validated configurations and
//! download names.
//!
//! [`VideoConfig`] and [`FileName`] can only be obtained through the
//! validator in [`crate::validate`], so holding one proves every field is
//! within bounds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::validate::{self, RawVideoInput, ValidationErrors};

/// Largest accepted frame width in pixels.
pub const MAX_WIDTH: u32 = 7680;
/// Largest accepted frame height in pixels.
pub const MAX_HEIGHT: u32 = 4320;
/// Longest accepted overlay text, in characters.
pub const MAX_TEXT_CHARS: usize = 100;
/// Longest accepted download file name, in characters.
pub const MAX_FILE_NAME_CHARS: usize = 255;

// ---------------------------------------------------------------------------
// VideoFormat
// ---------------------------------------------------------------------------

/// Output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    #[default]
    Mp4,
    Webm,
}

impl VideoFormat {
    /// Every supported format, in display order.
    pub const ALL: [VideoFormat; 2] = [VideoFormat::Mp4, VideoFormat::Webm];

    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            VideoFormat::Mp4 => "mp4",
            VideoFormat::Webm => "webm",
        }
    }

    /// MIME type of an artifact in this container.
    pub fn mime_type(self) -> &'static str {
        match self {
            VideoFormat::Mp4 => "video/mp4",
            VideoFormat::Webm => "video/webm",
        }
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for VideoFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" => Ok(VideoFormat::Mp4),
            "webm" => Ok(VideoFormat::Webm),
            other => Err(format!("unsupported format '{other}' (expected mp4 or webm)")),
        }
    }
}

// ---------------------------------------------------------------------------
// VideoConfig
// ---------------------------------------------------------------------------

/// A fully validated set of video parameters, ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoConfig {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) text: String,
    pub(crate) background_color: String,
    pub(crate) format: VideoFormat,
}

impl VideoConfig {
    /// Validate typed values into a configuration.
    ///
    /// Equivalent to running [`validate::validate_video`] over the same
    /// values rendered as form input.
    pub fn new(
        width: u32,
        height: u32,
        text: impl Into<String>,
        background_color: impl Into<String>,
        format: VideoFormat,
    ) -> Result<Self, ValidationErrors> {
        validate::validate_video(&RawVideoInput {
            width: width.to_string(),
            height: height.to_string(),
            text: text.into(),
            background_color: background_color.into(),
            format: format.to_string(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Background color as entered, including the leading `#`.
    pub fn background_color(&self) -> &str {
        &self.background_color
    }

    /// The six hex digits of the background color, without `#`.
    pub fn background_hex(&self) -> &str {
        self.background_color.trim_start_matches('#')
    }

    pub fn format(&self) -> VideoFormat {
        self.format
    }

    /// `"{width}x{height}"`.
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    /// The subset of settings that describe a produced artifact.
    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            width: self.width,
            height: self.height,
            format: self.format,
        }
    }
}

// ---------------------------------------------------------------------------
// RenderSettings
// ---------------------------------------------------------------------------

/// Dimensions and format of the last successfully generated artifact.
///
/// Kept apart from the live form so the preview keeps its shape while the
/// user edits the next configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub format: VideoFormat,
}

impl RenderSettings {
    /// Width over height, for sizing a preview surface.
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

// ---------------------------------------------------------------------------
// FileName
// ---------------------------------------------------------------------------

/// A validated download file name stem (`[A-Za-z0-9_-]{1,255}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FileName(pub(crate) String);

impl FileName {
    /// Validate a raw file name stem.
    pub fn parse(raw: &str) -> Result<Self, ValidationErrors> {
        validate::validate_file_name(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<name>.<ext>`, with the extension always taken from the artifact.
    pub fn with_format(&self, format: VideoFormat) -> String {
        format!("{}.{}", self.0, format.extension())
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
