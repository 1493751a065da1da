//! Unified error type for video-dummy.
//!
//! Library code funnels its failures into [`Error`]. Failures that happen
//! while a generation is in flight are carried separately as
//! [`TranscodeError`], which the orchestrator reports as a value instead of
//! propagating.

use crate::validate::ValidationErrors;

/// Message shown to the user for every failed generation, whatever the cause.
pub const GENERATION_FAILED_MESSAGE: &str = "Error generating video. Please try again.";

/// Unified error type covering all failure modes in video-dummy.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Form input failed field validation.
    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    /// A submission arrived before the engine finished loading.
    #[error("Engine is not loaded yet")]
    EngineNotReady,

    /// The engine could not be loaded.
    #[error("Engine load failed: {0}")]
    EngineLoad(String),

    /// An external tool (ffmpeg) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// A generation failed inside the engine.
    #[error("Transcode error: {0}")]
    Transcode(#[from] TranscodeError),

    /// Creating, revoking or exporting an artifact handle failed.
    #[error("Resource error: {0}")]
    Resource(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Configuration could not be parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Resource`].
    pub fn resource(message: impl Into<String>) -> Self {
        Error::Resource(message.into())
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Error::Validation(errors)
    }
}

/// Failure of one generation attempt, tagged by the step that failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranscodeError {
    /// The font asset could not be written into the engine namespace.
    #[error("failed to stage asset {name}: {message}")]
    Asset {
        /// Asset name inside the engine namespace.
        name: String,
        /// Underlying failure.
        message: String,
    },

    /// The engine rejected the command (bad parameters, codec fault,
    /// resource exhaustion, timeout).
    #[error("engine execution failed: {0}")]
    Execution(String),

    /// The engine finished but its output could not be read back.
    #[error("failed to read output {file}: {message}")]
    Output {
        /// Output file name inside the engine namespace.
        file: String,
        /// Underlying failure.
        message: String,
    },

    /// The artifact was produced but no preview handle could be created.
    #[error("failed to publish artifact: {0}")]
    Publish(String),

    /// The submission future was dropped before it finished.
    #[error("generation was interrupted")]
    Interrupted,
}

impl TranscodeError {
    /// The opaque message attached to the `Error` generation state.
    pub fn user_message(&self) -> &'static str {
        GENERATION_FAILED_MESSAGE
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
