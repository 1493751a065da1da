//! ffmpeg discovery.
//!
//! [`FfmpegBinary::discover`] resolves the executable (configured path or
//! `PATH` lookup) and checks its version; [`check_ffmpeg`] reports the same
//! information without failing, for diagnostics.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vd_core::config::EngineConfig;
use vd_core::{Error, Result};

use crate::command::ToolCommand;

/// Name of the executable searched in `PATH`.
pub const FFMPEG: &str = "ffmpeg";

/// Version checks should be quick.
const VERSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Availability information for the engine binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of `-version` output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// A located, runnable ffmpeg executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegBinary {
    pub path: PathBuf,
    pub version: String,
}

impl FfmpegBinary {
    /// Locate ffmpeg and confirm it runs.
    ///
    /// A configured `ffmpeg_path` is used when it exists; otherwise `PATH`
    /// is searched with [`which::which`].
    pub async fn discover(config: &EngineConfig) -> Result<Self> {
        let path = locate(config).ok_or_else(|| {
            Error::tool(FFMPEG, "ffmpeg not found; is it installed and in PATH?")
        })?;
        let version = detect_version(&path).await?;
        Ok(Self { path, version })
    }
}

/// Resolve the ffmpeg path without running it.
pub fn locate(config: &EngineConfig) -> Option<PathBuf> {
    match config.ffmpeg_path.as_deref() {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => {
            tracing::warn!(
                "Configured ffmpeg_path {} does not exist; falling back to PATH",
                p.display()
            );
            which::which(FFMPEG).ok()
        }
        None => which::which(FFMPEG).ok(),
    }
}

/// Run `ffmpeg -version` and return the first line of stdout.
pub async fn detect_version(path: &Path) -> Result<String> {
    let output = ToolCommand::new(path.to_path_buf())
        .arg("-version")
        .timeout(VERSION_TIMEOUT)
        .execute()
        .await?;

    output
        .stdout
        .lines()
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::tool(FFMPEG, "empty -version output"))
}

/// Report whether ffmpeg is available, never failing.
pub async fn check_ffmpeg(config: &EngineConfig) -> ToolInfo {
    let path = locate(config);
    let version = match path {
        Some(ref p) => detect_version(p).await.ok(),
        None => None,
    };
    ToolInfo {
        name: FFMPEG.to_string(),
        available: version.is_some(),
        version,
        path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn check_with_default_config_does_not_panic() {
        // We cannot guarantee ffmpeg is installed in CI.
        let info = check_ffmpeg(&EngineConfig::default()).await;
        assert_eq!(info.name, "ffmpeg");
        if info.available {
            assert!(info.path.is_some());
            assert!(info.version.is_some());
        }
    }

    #[tokio::test]
    async fn discover_with_bogus_binary_fails() {
        let cfg = EngineConfig {
            ffmpeg_path: Some(PathBuf::from("/nonexistent/ffmpeg")),
            ..EngineConfig::default()
        };
        if which::which(FFMPEG).is_ok() {
            // Falls back to PATH; nothing to assert about failure.
            return;
        }
        assert!(FfmpegBinary::discover(&cfg).await.is_err());
    }

    #[tokio::test]
    async fn detect_version_of_missing_binary_is_error() {
        let result = detect_version(Path::new("/nonexistent/ffmpeg")).await;
        assert!(result.is_err());
    }

    #[test]
    fn tool_info_serialization() {
        let info = ToolInfo {
            name: "ffmpeg".to_string(),
            available: true,
            version: Some("ffmpeg version 6.1".into()),
            path: Some(PathBuf::from("/usr/bin/ffmpeg")),
        };
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("ffmpeg version 6.1"));
        let back: ToolInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back.path, info.path);
    }
}
