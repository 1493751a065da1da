//! The generation state machine.
//!
//! [`TranscodeOrchestrator::submit`] drives one generation through the
//! engine: stage the font, run the command, read the output back, publish
//! the artifact. Only one generation is in flight at a time; a submission
//! that arrives while one is running is ignored. Engine failures never
//! escape `submit` as errors: they come back as [`Generation::Failed`] and
//! leave the orchestrator in [`GenerationState::Error`].

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{broadcast, oneshot};
use vd_core::events::{Event, EventBus, EventPayload};
use vd_core::{
    Error, FileName, GenerationId, GenerationState, RenderSettings, Result, TranscodeError,
    VideoConfig,
};
use vd_engine::{args, EngineHandle, EngineLoader, FontAsset, LoaderStatus};

use crate::artifact::{Artifact, ArtifactLifecycleManager, Download, ResourceHandle};

/// Message attached to [`GenerationState::Success`].
pub const SUCCESS_MESSAGE: &str = "Video generated successfully!";

/// Outcome of [`TranscodeOrchestrator::submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    /// Another generation was already running; nothing happened.
    Ignored,
    /// The artifact is published and previewable.
    Completed {
        handle: ResourceHandle,
        settings: RenderSettings,
    },
    Failed(TranscodeError),
}

impl Generation {
    pub fn is_completed(&self) -> bool {
        matches!(self, Generation::Completed { .. })
    }
}

/// Everything a UI needs to render the generation panel.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub state: GenerationState,
    pub message: Option<String>,
    /// Settings of the last successful generation, for the preview layout.
    pub last_settings: Option<RenderSettings>,
    pub preview: Option<ResourceHandle>,
    pub generation_id: Option<GenerationId>,
    /// `Failed` means the host has to call [`EngineLoader::reload`].
    pub loader: LoaderStatus,
    pub load_error: Option<String>,
}

struct Inner {
    state: GenerationState,
    message: Option<String>,
    last_settings: Option<RenderSettings>,
    generation_id: Option<GenerationId>,
    artifacts: ArtifactLifecycleManager,
}

pub struct TranscodeOrchestrator {
    loader: EngineLoader,
    font: FontAsset,
    events: Arc<EventBus>,
    inner: Mutex<Inner>,
}

impl TranscodeOrchestrator {
    pub fn new(loader: EngineLoader, font: FontAsset, artifacts: ArtifactLifecycleManager) -> Self {
        Self::with_events(loader, font, artifacts, Arc::new(EventBus::default()))
    }

    /// Build an orchestrator that publishes on an existing bus. The loader
    /// and artifact manager publish on it too.
    pub fn with_events(
        loader: EngineLoader,
        font: FontAsset,
        mut artifacts: ArtifactLifecycleManager,
        events: Arc<EventBus>,
    ) -> Self {
        loader.attach_events(Arc::clone(&events));
        artifacts.attach_events(Arc::clone(&events));
        Self {
            loader,
            font,
            events,
            inner: Mutex::new(Inner {
                state: GenerationState::Idle,
                message: None,
                last_settings: None,
                generation_id: None,
                artifacts,
            }),
        }
    }

    /// Run one generation for `config`.
    ///
    /// Returns [`Error::EngineNotReady`] without touching any state when the
    /// engine has not finished loading. Every other outcome is an `Ok`.
    pub async fn submit(&self, config: &VideoConfig) -> Result<Generation> {
        let engine = self.loader.handle().ok_or(Error::EngineNotReady)?;

        let id = {
            let mut inner = self.inner.lock();
            if !inner.state.accepts_submissions() {
                tracing::debug!("Generation already in flight; ignoring submission");
                return Ok(Generation::Ignored);
            }
            let id = GenerationId::new();
            inner.generation_id = Some(id);
            self.transition(&mut inner, GenerationState::Generating, None);
            id
        };

        let mut guard = InFlight {
            orchestrator: self,
            id,
            armed: true,
        };
        let outcome = AssertUnwindSafe(async {
            let artifact = self.run(&engine, config).await?;
            self.publish(artifact).await
        })
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(TranscodeError::Execution(panic_message(panic))));
        guard.armed = false;

        Ok(self.finish(config.render_settings(), outcome))
    }

    async fn run(
        &self,
        engine: &EngineHandle,
        config: &VideoConfig,
    ) -> std::result::Result<Artifact, TranscodeError> {
        let name = self.font.file_name();
        let asset_error = |e: Error| TranscodeError::Asset {
            name: name.to_string(),
            message: e.to_string(),
        };
        let font = self.font.bytes().await.map_err(asset_error)?;
        engine.write_file(name, font).await.map_err(asset_error)?;

        let command = args::build(config);
        tracing::debug!("Generating {} with {}: {command}", config.resolution(), engine.name());
        engine
            .exec(&command)
            .await
            .map_err(|e| TranscodeError::Execution(e.to_string()))?;

        let output_error = |message: String| TranscodeError::Output {
            file: command.output_file().to_string(),
            message,
        };
        let data = engine
            .read_file(command.output_file())
            .await
            .map_err(|e| output_error(e.to_string()))?;
        if data.is_empty() {
            return Err(output_error("engine produced an empty file".into()));
        }

        Ok(Artifact::new(data, config.format()))
    }

    /// Hand the artifact to the lifecycle manager.
    ///
    /// The previous handle is revoked first. The new file is written on the
    /// blocking pool with the state lock released; if the submission is
    /// dropped meanwhile, the writer revokes the orphaned handle itself.
    async fn publish(
        &self,
        artifact: Artifact,
    ) -> std::result::Result<ResourceHandle, TranscodeError> {
        let store = {
            let mut inner = self.inner.lock();
            inner.artifacts.clear();
            inner.artifacts.store()
        };

        let (tx, rx) = oneshot::channel();
        let staged = artifact.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(Ok(orphan)) = tx.send(store.create(&staged)) {
                tracing::debug!("Generation dropped; revoking {}", orphan.uri());
                if let Err(e) = store.revoke(&orphan) {
                    tracing::warn!("Failed to revoke artifact handle {}: {e}", orphan.uri());
                }
            }
        });

        let handle = rx
            .await
            .map_err(|_| TranscodeError::Publish("artifact writer stopped".into()))?
            .map_err(|e| TranscodeError::Publish(e.to_string()))?;
        self.inner.lock().artifacts.install(artifact, handle.clone());
        Ok(handle)
    }

    fn finish(
        &self,
        settings: RenderSettings,
        outcome: std::result::Result<ResourceHandle, TranscodeError>,
    ) -> Generation {
        let mut inner = self.inner.lock();
        match outcome {
            Ok(handle) => {
                inner.last_settings = Some(settings);
                self.transition(
                    &mut inner,
                    GenerationState::Success,
                    Some(SUCCESS_MESSAGE.to_string()),
                );
                Generation::Completed { handle, settings }
            }
            Err(err) => {
                tracing::error!("Error generating video: {err}");
                self.transition(
                    &mut inner,
                    GenerationState::Error,
                    Some(err.user_message().to_string()),
                );
                Generation::Failed(err)
            }
        }
    }

    /// Note that the user changed a configuration field.
    ///
    /// After a finished generation this clears the displayed message; the
    /// artifact stays previewable and downloadable. Returns whether a
    /// message was cleared.
    pub fn config_edited(&self) -> bool {
        let mut inner = self.inner.lock();
        if !inner.state.is_terminal() || inner.message.is_none() {
            return false;
        }
        inner.message = None;
        self.events.publish(EventPayload::MessageCleared);
        true
    }

    /// Current state. Reports `Loading` while idle and the engine is not
    /// ready yet.
    pub fn state(&self) -> GenerationState {
        let state = self.inner.lock().state;
        if state == GenerationState::Idle && !self.loader.is_ready() {
            GenerationState::Loading
        } else {
            state
        }
    }

    pub fn message(&self) -> Option<String> {
        self.inner.lock().message.clone()
    }

    pub fn last_settings(&self) -> Option<RenderSettings> {
        self.inner.lock().last_settings
    }

    pub fn preview(&self) -> Option<ResourceHandle> {
        self.inner.lock().artifacts.preview().cloned()
    }

    /// The current artifact prepared for download under `name`.
    pub fn download(&self, name: &FileName) -> Option<Download> {
        self.inner.lock().artifacts.download(name)
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let state = self.state();
        let inner = self.inner.lock();
        StatusSnapshot {
            state,
            message: inner.message.clone(),
            last_settings: inner.last_settings,
            preview: inner.artifacts.preview().cloned(),
            generation_id: inner.generation_id,
            loader: self.loader.status(),
            load_error: self.loader.load_error(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn loader(&self) -> &EngineLoader {
        &self.loader
    }

    /// Revoke the artifact and return to `Idle`.
    ///
    /// A generation in flight keeps running and publishes its own result.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.artifacts.clear();
        inner.last_settings = None;
        if inner.state != GenerationState::Generating {
            self.transition(&mut inner, GenerationState::Idle, None);
        }
    }

    fn transition(&self, inner: &mut Inner, state: GenerationState, message: Option<String>) {
        tracing::debug!("Generation state {} -> {}", inner.state, state);
        inner.state = state;
        inner.message = message;
        self.events.publish(EventPayload::StateChanged {
            state,
            generation_id: inner.generation_id,
        });
    }
}

impl std::fmt::Debug for TranscodeOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscodeOrchestrator")
            .field("state", &self.state())
            .field("loader", &self.loader)
            .finish()
    }
}

/// Moves a dropped submission out of `Generating`.
struct InFlight<'a> {
    orchestrator: &'a TranscodeOrchestrator,
    id: GenerationId,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let orchestrator = self.orchestrator;
        let mut inner = orchestrator.inner.lock();
        if inner.generation_id == Some(self.id) && inner.state == GenerationState::Generating {
            let err = TranscodeError::Interrupted;
            tracing::warn!("Generation {} dropped before completion", self.id);
            orchestrator.transition(
                &mut inner,
                GenerationState::Error,
                Some(err.user_message().to_string()),
            );
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("engine panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("engine panicked: {s}")
    } else {
        "engine panicked".to_string()
    }
}
