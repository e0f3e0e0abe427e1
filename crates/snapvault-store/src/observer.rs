//! # Observer — Injected Observability
//!
//! Components never configure logging themselves. The protected folder and
//! the permission guard report what they do to a [`VaultObserver`] handed to
//! them at construction. [`TracingObserver`] forwards to `tracing`;
//! [`NoopObserver`] discards everything.

use std::path::Path;

use snapvault_core::{Regime, SaveStage};

use crate::audit::AuditEntry;
use crate::guard::RegimeViolation;

/// Receives store events. Every method defaults to a no-op.
pub trait VaultObserver: Send + Sync + std::fmt::Debug {
    /// A save reached `stage` for `artifact`.
    fn stage_entered(&self, _stage: SaveStage, _artifact: &Path) {}

    /// The guard set `path` to `regime`.
    fn regime_applied(&self, _path: &Path, _regime: Regime) {}

    /// An entry was appended to the log at `log_path`.
    fn entry_appended(&self, _log_path: &Path, _entry: &AuditEntry) {}

    /// A preflight survey found a node outside the locked regimes.
    fn violation_found(&self, _violation: &RegimeViolation) {}
}

/// Discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl VaultObserver for NoopObserver {}

/// Emits every event as a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl VaultObserver for TracingObserver {
    fn stage_entered(&self, stage: SaveStage, artifact: &Path) {
        tracing::debug!(stage = %stage, artifact = %artifact.display(), "save stage");
    }

    fn regime_applied(&self, path: &Path, regime: Regime) {
        tracing::trace!(path = %path.display(), regime = regime.as_str(), "regime applied");
    }

    fn entry_appended(&self, log_path: &Path, entry: &AuditEntry) {
        tracing::info!(
            log = %log_path.display(),
            file_name = %entry.file_name,
            shasum = %entry.shasum,
            "audit entry appended"
        );
    }

    fn violation_found(&self, violation: &RegimeViolation) {
        tracing::warn!(
            path = %violation.path.display(),
            mode = %format!("{:#o}", violation.mode),
            expected = violation.expected.as_str(),
            "node outside locked regime"
        );
    }
}
