//! The host-facing entry point.
//!
//! [`Studio`] ties the form, the validator and the orchestrator together so
//! a UI only has to forward edits and button presses and render
//! [`StatusSnapshot`]s.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use vd_core::config::Config;
use vd_core::events::Event;
use vd_core::{Error, Field, Result};
use vd_engine::{EngineLoader, FontAsset};

use crate::artifact::{ArtifactLifecycleManager, Download, TempFileStore};
use crate::form::VideoForm;
use crate::orchestrator::{Generation, StatusSnapshot, TranscodeOrchestrator};

pub struct Studio {
    form: Mutex<VideoForm>,
    orchestrator: TranscodeOrchestrator,
}

impl Studio {
    /// Build a studio around `loader` without starting it.
    pub fn new(config: &Config, loader: EngineLoader) -> Self {
        let store = Arc::new(TempFileStore::from_config(&config.artifacts));
        let orchestrator = TranscodeOrchestrator::new(
            loader,
            FontAsset::from_config(&config.engine),
            ArtifactLifecycleManager::new(store),
        );
        Self {
            form: Mutex::new(VideoForm::from_defaults(&config.defaults)),
            orchestrator,
        }
    }

    /// Build a studio on the process-wide ffmpeg loader and start loading it
    /// in the background. Must be called from within a tokio runtime.
    pub fn open(config: &Config) -> Self {
        let studio = Self::new(config, EngineLoader::global(&config.engine));
        studio.preload();
        studio
    }

    /// Start loading the engine once the runtime is idle.
    pub fn preload(&self) -> tokio::task::JoinHandle<()> {
        self.orchestrator.loader().spawn_idle_load()
    }

    /// Apply a form edit. Editing a video field after a finished generation
    /// clears the displayed message.
    pub fn edit(&self, field: Field, value: impl Into<String>) -> bool {
        let changed = self.form.lock().set(field, value);
        if changed && field != Field::FileName {
            self.orchestrator.config_edited();
        }
        changed
    }

    /// A copy of the current form.
    pub fn form(&self) -> VideoForm {
        self.form.lock().clone()
    }

    /// Validate the form and submit it.
    ///
    /// Invalid input is returned as [`Error::Validation`] and never reaches
    /// the orchestrator.
    pub async fn generate(&self) -> Result<Generation> {
        let config = self.form.lock().video_config()?;
        self.orchestrator.submit(&config).await
    }

    /// The current artifact under the form's file name.
    pub fn download(&self) -> Result<Download> {
        let name = self.form.lock().file_name()?;
        self.orchestrator
            .download(&name)
            .ok_or_else(|| Error::resource("no video has been generated yet"))
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.orchestrator.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.orchestrator.subscribe()
    }

    pub fn orchestrator(&self) -> &TranscodeOrchestrator {
        &self.orchestrator
    }
}

impl std::fmt::Debug for Studio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Studio")
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}
