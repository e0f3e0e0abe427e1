//! # snapvault-core — Foundational Types for snapvault
//!
//! This crate is the leaf of the snapvault workspace. It defines the types
//! every other crate shares and performs no directory-level mutation.
//!
//! ## Key Design Principles
//!
//! 1. **One error type.** [`VaultError`] carries the path for every
//!    filesystem failure and the stage reached for every aborted save.
//!
//! 2. **Bit-exact regimes.** [`Regime`] maps `OPEN`, `LOCKED_DIR`, and
//!    `LOCKED_FILE` to `0o744`, `0o544`, and `0o444`. No other crate spells
//!    those numbers.
//!
//! 3. **Validated naming fields.** [`ArtifactKind`] and [`Revision`] reject
//!    underscores and dots at construction, so [`SnapshotName::parse`] is
//!    the exact inverse of [`SnapshotName::file_name`].
//!
//! 4. **Injectable time.** Capture dates come from a [`Clock`], never from a
//!    hidden call to the system clock inside the store.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `snapvault-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod digest;
pub mod error;
pub mod naming;
pub mod regime;
pub mod stage;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use digest::{
    sha1_file, sha256_bytes, sha256_file, ChecksumProvider, DigestAlgorithm, Sha256Checksum, ShaSum,
};
pub use error::VaultError;
pub use naming::{
    ArtifactKind, Revision, SnapshotName, SnapshotNamer, HELM_MODELS_PREFIX,
    SCALE_LEADERBOARD_PREFIX,
};
pub use regime::{Regime, LOCKED_DIR_MODE, LOCKED_FILE_MODE, OPEN_MODE};
pub use stage::SaveStage;
pub use temporal::{CaptureDate, Clock, FixedClock, SystemClock};
