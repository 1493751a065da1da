//! Shared test harness for integration tests.
//!
//! Provides a scripted [`FakeEngine`] (counts loads, records every call,
//! can be told to fail or to block inside `exec`), a [`RecordingStore`]
//! that tracks live artifact handles, and [`TestHarness`] which wires both
//! into a [`TranscodeOrchestrator`].

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::sync::Notify;

use vd_core::config::Config;
use vd_core::{Error, HandleId, Result, VideoConfig, VideoFormat};
use vd_engine::{EngineLoader, FontAsset, TranscodeCommand, TranscodeEngine};
use video_dummy::{
    Artifact, ArtifactLifecycleManager, ResourceHandle, ResourceStore, Studio, TempFileStore,
    TranscodeOrchestrator,
};

/// Controls shared by every engine the fake loader produces.
#[derive(Default)]
pub struct Script {
    loads: AtomicUsize,
    fail_load: AtomicBool,
    fail_exec: AtomicBool,
    gate: Mutex<Option<Arc<Notify>>>,
    calls: Mutex<Vec<String>>,
    commands: Mutex<Vec<TranscodeCommand>>,
}

impl Script {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn fail_load(&self, fail: bool) {
        self.fail_load.store(fail, Ordering::SeqCst);
    }

    pub fn fail_exec(&self, fail: bool) {
        self.fail_exec.store(fail, Ordering::SeqCst);
    }

    /// Make every `exec` wait until the returned gate is notified.
    pub fn block_exec(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    pub fn unblock_exec(&self) {
        *self.gate.lock() = None;
    }

    /// Every engine call so far, e.g. `write:overlay.ttf`, `exec:output.mp4`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn exec_count(&self) -> usize {
        self.calls().iter().filter(|c| c.starts_with("exec:")).count()
    }

    pub fn commands(&self) -> Vec<TranscodeCommand> {
        self.commands.lock().clone()
    }
}

/// In-memory engine driven by a [`Script`].
pub struct FakeEngine {
    script: Arc<Script>,
    files: Mutex<HashMap<String, Bytes>>,
}

#[async_trait]
impl TranscodeEngine for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    async fn write_file(&self, name: &str, data: Bytes) -> Result<()> {
        self.script.calls.lock().push(format!("write:{name}"));
        self.files.lock().insert(name.to_string(), data);
        Ok(())
    }

    async fn exec(&self, command: &TranscodeCommand) -> Result<()> {
        self.script
            .calls
            .lock()
            .push(format!("exec:{}", command.output_file()));
        self.script.commands.lock().push(command.clone());

        let gate = self.script.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.script.fail_exec.load(Ordering::SeqCst) {
            return Err(Error::tool("ffmpeg", "Conversion failed!"));
        }
        let output = Bytes::from(format!("fake video {}", command.output_file()));
        self.files
            .lock()
            .insert(command.output_file().to_string(), output);
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Bytes> {
        self.script.calls.lock().push(format!("read:{name}"));
        self.files
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::tool("ffmpeg", format!("{name}: No such file")))
    }
}

/// A loader whose factory builds [`FakeEngine`]s controlled by `script`.
pub fn fake_loader(script: Arc<Script>) -> EngineLoader {
    EngineLoader::new(move || {
        let script = Arc::clone(&script);
        async move {
            script.loads.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if script.fail_load.load(Ordering::SeqCst) {
                return Err(Error::tool("ffmpeg", "ffmpeg not found"));
            }
            Ok(FakeEngine {
                script,
                files: Mutex::new(HashMap::new()),
            })
        }
    })
}

/// Wraps [`TempFileStore`] and tracks which handles are live.
pub struct RecordingStore {
    inner: TempFileStore,
    live: Mutex<HashSet<HandleId>>,
    revoked: AtomicUsize,
}

impl RecordingStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            inner: TempFileStore::new(dir),
            live: Mutex::new(HashSet::new()),
            revoked: AtomicUsize::new(0),
        }
    }

    pub fn live(&self) -> usize {
        self.live.lock().len()
    }

    pub fn revoked(&self) -> usize {
        self.revoked.load(Ordering::SeqCst)
    }
}

impl ResourceStore for RecordingStore {
    fn create(&self, artifact: &Artifact) -> Result<ResourceHandle> {
        let handle = self.inner.create(artifact)?;
        self.live.lock().insert(handle.id());
        Ok(handle)
    }

    fn revoke(&self, handle: &ResourceHandle) -> Result<()> {
        self.inner.revoke(handle)?;
        self.live.lock().remove(&handle.id());
        self.revoked.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A [`TranscodeOrchestrator`] on a fake engine and a recording store in a
/// private temp dir.
pub struct TestHarness {
    pub script: Arc<Script>,
    pub store: Arc<RecordingStore>,
    pub orchestrator: TranscodeOrchestrator,
    pub dir: TempDir,
}

impl TestHarness {
    /// Create a harness whose engine has not been loaded yet.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let script = Arc::new(Script::default());
        let store = Arc::new(RecordingStore::new(dir.path()));
        let orchestrator = TranscodeOrchestrator::new(
            fake_loader(Arc::clone(&script)),
            FontAsset::from_bytes(&b"fake font"[..]),
            ArtifactLifecycleManager::new(store.clone()),
        );
        Self {
            script,
            store,
            orchestrator,
            dir,
        }
    }

    /// Create a harness and wait for its engine to load.
    pub async fn ready() -> Self {
        let harness = Self::new();
        harness
            .orchestrator
            .loader()
            .acquire()
            .await
            .expect("fake engine failed to load");
        harness
    }
}

/// A [`Studio`] on a fake engine, with a font file and artifact dir in a
/// private temp dir.
pub fn fake_studio() -> (Studio, Arc<Script>, TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let font = dir.path().join("font.ttf");
    std::fs::write(&font, b"fake font").expect("failed to write font");

    let mut config = Config::default();
    config.engine.font_path = Some(font);
    config.artifacts.dir = Some(dir.path().join("artifacts"));

    let script = Arc::new(Script::default());
    let studio = Studio::new(&config, fake_loader(Arc::clone(&script)));
    (studio, script, dir)
}

pub fn video(width: u32, height: u32, text: &str, color: &str, format: VideoFormat) -> VideoConfig {
    VideoConfig::new(width, height, text, color, format).expect("invalid test config")
}
