//! # snapvault-store — Protected Snapshot Store
//!
//! Persists captured artifacts so that once written they cannot be silently
//! changed, and keeps an append-only provenance log in every directory.
//!
//! - **Permission guard** ([`guard`]) opens a directory chain top-down for
//!   a write and locks it bottom-up afterwards.
//! - **Audit log** ([`audit`]) appends one JSON entry per artifact and
//!   verifies recorded digests against disk.
//! - **Artifact writers** ([`writer`]) render content and create files
//!   exclusively.
//! - **Protected folder** ([`folder`]) sequences relax, write, log, and
//!   restrict as a typestate.
//! - **Snapshot selection** ([`snapshot`]) finds the newest or oldest
//!   capture of a dataset.
//!
//! ## Crate Policy
//!
//! - Depends only on `snapvault-core` internally.
//! - Never installs a logging subscriber; events go through an injected
//!   [`VaultObserver`].
//! - Tests assert permission bits directly, so they pass when run as root.

pub mod audit;
pub mod config;
pub mod folder;
pub mod guard;
pub mod observer;
pub mod snapshot;
pub mod writer;

pub use audit::{AuditEntry, AuditLog, EntryCheck, EntryStatus, VerifyReport};
pub use config::{ConfigError, StoreConfig};
pub use folder::{ProtectedFolder, SaveReceipt, SaveSession};
pub use guard::{PermissionGuard, RegimeViolation};
pub use observer::{NoopObserver, TracingObserver, VaultObserver};
pub use snapshot::{list_snapshots, select_snapshot, Pick, SnapshotEntry};
pub use writer::{ArtifactWriter, Delimiter, Table};
