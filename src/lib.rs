//! video-dummy - placeholder video generation
//!
//! Turns a handful of form fields (size, text, color, container) into a
//! short solid-color clip with centered text, using a lazily loaded
//! transcoding engine. The shared types live in `vd-core` and the engine in
//! `vd-engine`; this crate holds the orchestration layer a UI drives.

pub mod artifact;
pub mod config;
pub mod form;
pub mod orchestrator;
pub mod studio;
pub mod telemetry;

pub use artifact::{
    Artifact, ArtifactLifecycleManager, Download, ResourceHandle, ResourceStore, TempFileStore,
};
pub use form::VideoForm;
pub use orchestrator::{Generation, StatusSnapshot, TranscodeOrchestrator, SUCCESS_MESSAGE};
pub use studio::Studio;
