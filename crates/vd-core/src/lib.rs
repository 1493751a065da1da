//! vd-core: shared types, validation, errors, configuration, and events.
//!
//! This crate is the foundational dependency for the other video-dummy
//! crates. It holds the validated video model ([`VideoConfig`],
//! [`FileName`]), the field validator, a unified error type, application
//! configuration, and a broadcast event bus for UI collaborators.

pub mod config;
pub mod error;
pub mod events;
pub mod generation;
pub mod ids;
pub mod validate;
pub mod video;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result, TranscodeError};
pub use generation::GenerationState;
pub use ids::*;
pub use validate::{validate_file_name, validate_video, Field, RawVideoInput, ValidationErrors};
pub use video::*;
