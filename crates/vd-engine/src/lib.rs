//! # vd-engine
//!
//! The transcoding side of video-dummy.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`FfmpegBinary`]) -- locate ffmpeg via configuration
//!   or `PATH` and check its version.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   support for running external processes.
//! - **Engine namespace** ([`Workspace`]) -- a private temporary directory the
//!   engine reads and writes by bare file name.
//! - **Argument building** ([`args::build`]) -- pure translation of a
//!   [`vd_core::VideoConfig`] into a [`TranscodeCommand`].
//! - **Loading** ([`EngineLoader`]) -- single-flight, lazy initialisation of
//!   the one shared [`EngineHandle`].

pub mod args;
pub mod asset;
pub mod command;
pub mod engine;
pub mod loader;
pub mod tools;
pub mod workspace;

// ---- Re-exports for convenience ----

pub use args::{build, TranscodeCommand};
pub use asset::FontAsset;
pub use command::{ToolCommand, ToolOutput};
pub use engine::{EngineHandle, FfmpegEngine, TranscodeEngine};
pub use loader::{EngineLoader, LoaderStatus};
pub use tools::{check_ffmpeg, FfmpegBinary, ToolInfo};
pub use workspace::Workspace;
