//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from TOML and carries the
//! engine, artifact, logging and form-default sections. Every section
//! defaults sensibly so an empty document is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::validate::{validate_file_name, validate_video, RawVideoInput};
use crate::Error;

/// Well-known font locations tried when no `engine.font_path` is set.
pub const FALLBACK_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub artifacts: ArtifactConfig,
    pub logging: LoggingConfig,
    pub defaults: FormDefaults,
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Config(format!("config parse error: {e}")))
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(ref path) = self.engine.ffmpeg_path {
            if !path.exists() {
                warnings.push(format!(
                    "engine.ffmpeg_path {} does not exist; PATH lookup will be used",
                    path.display()
                ));
            }
        }

        if let Some(ref path) = self.engine.font_path {
            if !path.exists() {
                warnings.push(format!(
                    "engine.font_path {} does not exist",
                    path.display()
                ));
            }
        } else if self.engine.resolve_font_path().is_none() {
            warnings.push("no engine.font_path set and no system font was found".into());
        }

        if self.engine.timeout_secs == 0 {
            warnings.push("engine.timeout_secs is 0; every transcode will time out".into());
        }

        if let Err(errors) = validate_video(&self.defaults.video) {
            warnings.push(format!("defaults are not a valid video config: {errors}"));
        }
        if let Err(errors) = validate_file_name(&self.defaults.file_name) {
            warnings.push(format!("defaults.file_name is invalid: {errors}"));
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Transcoding engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Explicit ffmpeg binary; `PATH` is searched when unset.
    pub ffmpeg_path: Option<PathBuf>,
    /// Font used for the text overlay.
    pub font_path: Option<PathBuf>,
    /// Upper bound for a single transcode.
    pub timeout_secs: u64,
    /// Parent directory for the engine's private working namespace.
    pub work_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            font_path: None,
            timeout_secs: default_timeout_secs(),
            work_dir: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    120
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The configured font if set, otherwise the first existing fallback.
    pub fn resolve_font_path(&self) -> Option<PathBuf> {
        if let Some(ref path) = self.font_path {
            return Some(path.clone());
        }
        FALLBACK_FONT_PATHS
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
            .map(Path::to_path_buf)
    }
}

/// Where preview/download handles are materialised.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Directory for handle files; the system temp dir when unset.
    pub dir: Option<PathBuf>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`.
    pub filter: String,
    /// Trace-level defaults for the video-dummy crates.
    pub verbose: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "video_dummy=info,vd_engine=info,vd_core=info".into(),
            verbose: false,
        }
    }
}

/// Initial form contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormDefaults {
    #[serde(flatten)]
    pub video: RawVideoInput,
    pub file_name: String,
}

impl Default for FormDefaults {
    fn default() -> Self {
        Self {
            video: RawVideoInput::default(),
            file_name: "generated_video".into(),
        }
    }
}
