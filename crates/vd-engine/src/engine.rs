//! The transcoding engine abstraction and its ffmpeg implementation.
//!
//! An engine owns a private file namespace and runs [`TranscodeCommand`]s
//! inside it. [`EngineHandle`] is the shared capability handed out by the
//! [`EngineLoader`](crate::EngineLoader); nothing else can construct one.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use vd_core::config::EngineConfig;
use vd_core::Result;

use crate::args::TranscodeCommand;
use crate::command::ToolCommand;
use crate::tools::FfmpegBinary;
use crate::workspace::Workspace;

/// An in-process view of a transcoding engine.
///
/// Calls on one engine are issued strictly in sequence by the orchestrator:
/// write assets, execute, read output.
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// Short human-readable engine description (e.g. the ffmpeg version).
    fn name(&self) -> &str;

    /// Write (or overwrite) a file in the engine namespace.
    async fn write_file(&self, name: &str, data: Bytes) -> Result<()>;

    /// Run a command to completion.
    async fn exec(&self, command: &TranscodeCommand) -> Result<()>;

    /// Read a file from the engine namespace.
    async fn read_file(&self, name: &str) -> Result<Bytes>;
}

/// Shared, immutable handle to the one loaded engine.
#[derive(Clone)]
pub struct EngineHandle(Arc<dyn TranscodeEngine>);

impl EngineHandle {
    pub(crate) fn new(engine: Arc<dyn TranscodeEngine>) -> Self {
        Self(engine)
    }

    /// Whether two handles refer to the same engine instance.
    pub fn ptr_eq(&self, other: &EngineHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for EngineHandle {
    type Target = dyn TranscodeEngine;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EngineHandle").field(&self.0.name()).finish()
    }
}

/// ffmpeg run as a child process inside a private [`Workspace`].
#[derive(Debug)]
pub struct FfmpegEngine {
    binary: FfmpegBinary,
    workspace: Workspace,
    timeout: Duration,
}

impl FfmpegEngine {
    /// Discover ffmpeg, confirm it runs and create its namespace.
    pub async fn load(config: &EngineConfig) -> Result<Self> {
        let binary = FfmpegBinary::discover(config).await?;
        let workspace = Workspace::new(config.work_dir.as_deref())?;
        tracing::info!(
            "Loaded {} from {} (namespace {})",
            binary.version,
            binary.path.display(),
            workspace.path().display()
        );
        Ok(Self {
            binary,
            workspace,
            timeout: config.timeout(),
        })
    }

    pub fn binary(&self) -> &FfmpegBinary {
        &self.binary
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    fn name(&self) -> &str {
        &self.binary.version
    }

    async fn write_file(&self, name: &str, data: Bytes) -> Result<()> {
        self.workspace.write_file(name, &data).await
    }

    async fn exec(&self, command: &TranscodeCommand) -> Result<()> {
        // Never read a stale output from an earlier run.
        self.workspace.remove_file(command.output_file()).await?;

        tracing::debug!("exec: ffmpeg {command}");
        ToolCommand::new(self.binary.path.clone())
            .current_dir(self.workspace.path())
            .args(["-hide_banner", "-nostdin", "-loglevel", "error", "-y"])
            .args(command.args().iter().cloned())
            .timeout(self.timeout)
            .execute()
            .await?;
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Bytes> {
        self.workspace.read_file(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use vd_core::{VideoConfig, VideoFormat};

    struct NullEngine;

    #[async_trait]
    impl TranscodeEngine for NullEngine {
        fn name(&self) -> &str {
            "null"
        }
        async fn write_file(&self, _name: &str, _data: Bytes) -> Result<()> {
            Ok(())
        }
        async fn exec(&self, _command: &TranscodeCommand) -> Result<()> {
            Ok(())
        }
        async fn read_file(&self, _name: &str) -> Result<Bytes> {
            Ok(Bytes::new())
        }
    }

    #[test]
    fn handle_identity() {
        let a = EngineHandle::new(Arc::new(NullEngine));
        let b = a.clone();
        let c = EngineHandle::new(Arc::new(NullEngine));
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
        assert_eq!(format!("{a:?}"), "EngineHandle(\"null\")");
        assert_eq!(a.name(), "null");
    }

    /// Runs a real encode when ffmpeg and a font are available.
    #[tokio::test]
    async fn ffmpeg_generates_webm_when_available() {
        let config = EngineConfig::default();
        let Some(font_path) = config.resolve_font_path() else {
            return;
        };
        let Ok(engine) = FfmpegEngine::load(&config).await else {
            return;
        };

        let font = tokio::fs::read(&font_path).await.unwrap();
        engine
            .write_file(crate::asset::FONT_FILE_NAME, Bytes::from(font))
            .await
            .unwrap();

        let cfg = VideoConfig::new(160, 90, "Hi: 'there'", "#FF0000", VideoFormat::Webm).unwrap();
        let command = args::build(&cfg);
        if engine.exec(&command).await.is_err() {
            // Builds without libvpx-vp9 or drawtext cannot run this.
            return;
        }
        let out = engine.read_file(command.output_file()).await.unwrap();
        // EBML magic.
        assert_eq!(&out[..4], &[0x1A, 0x45, 0xDF, 0xA3]);
    }
}
