//! # Error Types — Structured Error Hierarchy
//!
//! Defines the single error type shared by every snapvault crate. All
//! errors use `thiserror` for derive-based `Display` and `Error`
//! implementations.
//!
//! ## Design
//!
//! - Filesystem errors always carry the offending path.
//! - A missing file is reported as [`VaultError::NotFound`], never as a
//!   bare `Io` error, so callers can match on it.
//! - Failures inside a protected save are wrapped in
//!   [`VaultError::Aborted`], which records the last stage the save reached
//!   before the failure. Nothing is rolled back; the stage tells the operator
//!   which permission regime the directory was left in.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::stage::SaveStage;

/// Top-level error type for snapvault.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Filesystem read, write, or permission failure.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// The path being operated on.
        path: PathBuf,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A file that must exist (artifact to digest, log to read) is absent.
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    /// An existing audit log failed to parse. The log is left untouched.
    #[error("corrupt audit log at {}: {reason}", path.display())]
    CorruptLog {
        /// Path of the log file.
        path: PathBuf,
        /// Parser diagnostic.
        reason: String,
    },

    /// A file name does not follow the snapshot naming convention, or a
    /// naming field holds a forbidden character.
    #[error("naming error for {name:?}: {reason}")]
    Naming {
        /// The offending name or field value.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The artifact path already exists. Captured snapshots are never
    /// overwritten; a new capture must use a new name.
    #[error("artifact already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// The target path does not lie under the store root.
    #[error("{} is outside store root {}", path.display(), root.display())]
    OutsideRoot {
        /// The rejected path.
        path: PathBuf,
        /// The configured root.
        root: PathBuf,
    },

    /// Artifact content failed validation before any byte was written.
    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),

    /// Serialization of artifact content or log entries failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A protected save failed part-way through.
    #[error("save of {} aborted after {stage}: {source}", path.display())]
    Aborted {
        /// The last stage the save completed.
        stage: SaveStage,
        /// The artifact path being saved.
        path: PathBuf,
        /// The failure that stopped the save.
        #[source]
        source: Box<VaultError>,
    },
}

impl VaultError {
    /// Wrap an I/O error with the path it occurred on.
    ///
    /// `ErrorKind::NotFound` is mapped to [`VaultError::NotFound`].
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Io { path, source }
        }
    }

    /// Build a naming error.
    pub fn naming(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Naming {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Wrap this error as the cause of an aborted save.
    pub fn aborted(self, stage: SaveStage, path: impl Into<PathBuf>) -> Self {
        Self::Aborted {
            stage,
            path: path.into(),
            source: Box::new(self),
        }
    }

    /// Return the innermost error, unwrapping any `Aborted` layers.
    pub fn root_cause(&self) -> &VaultError {
        match self {
            Self::Aborted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
