//! The generation state machine's states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the orchestrator is in its generate cycle.
///
/// ```text
///   Loading ──engine ready──▶ Idle ──submit──▶ Generating ──ok──▶ Success
///                                                  │                 │
///                                                  └──fail──▶ Error  │
///   Success / Error ──submit──▶ Generating ◀─────────────────────────┘
/// ```
///
/// `Generating` is the only state in which submissions are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationState {
    #[default]
    Idle,
    Loading,
    Generating,
    Success,
    Error,
}

impl GenerationState {
    /// `Success` or `Error`: the outcome of the last attempt is on display.
    pub fn is_terminal(self) -> bool {
        matches!(self, GenerationState::Success | GenerationState::Error)
    }

    pub fn accepts_submissions(self) -> bool {
        self != GenerationState::Generating
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GenerationState::Idle => "idle",
            GenerationState::Loading => "loading",
            GenerationState::Generating => "generating",
            GenerationState::Success => "success",
            GenerationState::Error => "error",
        }
    }
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
