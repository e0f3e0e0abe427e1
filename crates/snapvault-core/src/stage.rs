//! Stages of a protected save.
//!
//! ```text
//! IDLE ──relax──▶ RELAXED ──write──▶ WRITTEN ──log──▶ LOGGED ──restrict──▶ RESTRICTED
//! ```
//!
//! The store crate encodes these as typestates; this enum is the runtime
//! view used in errors and observer callbacks.

use serde::{Deserialize, Serialize};

/// A stage of the save state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaveStage {
    /// Nothing has changed on disk.
    Idle,
    /// The directory chain root → target is `OPEN`.
    Relaxed,
    /// The artifact bytes are on disk.
    Written,
    /// The audit entry is appended.
    Logged,
    /// Artifact, log, and directory chain are locked. Terminal.
    Restricted,
}

impl SaveStage {
    /// The canonical upper-case name of this stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Relaxed => "RELAXED",
            Self::Written => "WRITTEN",
            Self::Logged => "LOGGED",
            Self::Restricted => "RESTRICTED",
        }
    }

    /// Whether the save is complete.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Restricted)
    }
}

impl std::fmt::Display for SaveStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
