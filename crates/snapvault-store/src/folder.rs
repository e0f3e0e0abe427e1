//! # Protected Folder
//!
//! Owns a store root and sequences every write into it:
//!
//! ```text
//! IDLE ──relax──▶ RELAXED ──write──▶ WRITTEN ──log──▶ LOGGED ──restrict──▶ RESTRICTED
//! ```
//!
//! ## Design
//!
//! The sequence is a typestate. [`SaveSession<S>`] carries the data each
//! stage produced inside its state marker, and each transition consumes the
//! session, so a caller cannot log before writing or restrict before
//! logging. [`ProtectedFolder::save_file`] drives the whole chain.
//!
//! A failure at any step surfaces as [`VaultError::Aborted`] naming the
//! last stage completed. Nothing is rolled back: a failed save may leave
//! directories `OPEN`, which [`ProtectedFolder::preflight`] reports and
//! [`ProtectedFolder::repair`] fixes.
//!
//! ## Immutability
//!
//! An artifact path that already exists is rejected in `IDLE`, before any
//! permission change. The writer also creates the file exclusively, so the
//! guarantee holds for privileged users the mode bits would not stop.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use snapvault_core::{
    ChecksumProvider, Clock, Regime, SaveStage, Sha256Checksum, SnapshotName, SystemClock,
    VaultError,
};

use crate::audit::{AuditEntry, AuditLog, VerifyReport};
use crate::config::{StoreConfig, DEFAULT_LOG_NAME};
use crate::guard::{PermissionGuard, RegimeViolation};
use crate::observer::{TracingObserver, VaultObserver};
use crate::snapshot::{self, Pick, SnapshotEntry};
use crate::writer::ArtifactWriter;

// ── Session states ──────────────────────────────────────────────────

mod private {
    pub trait Sealed {}
}

/// Marker trait for save-session states. Sealed.
pub trait SessionState: private::Sealed + fmt::Debug {
    /// The stage this state represents.
    fn stage() -> SaveStage;
}

/// Nothing has been touched yet.
#[derive(Debug)]
pub struct Idle;

/// The directory chain is `OPEN`.
#[derive(Debug)]
pub struct Relaxed;

/// The artifact exists on disk.
#[derive(Debug)]
pub struct Written {
    bytes_written: u64,
}

/// The audit entry is in the log.
#[derive(Debug)]
pub struct Logged {
    bytes_written: u64,
    entry: AuditEntry,
    log_path: PathBuf,
}

/// The artifact, the log, and the chain are locked.
#[derive(Debug)]
pub struct Restricted {
    receipt: SaveReceipt,
}

macro_rules! session_state {
    ($($ty:ident => $stage:ident),* $(,)?) => {
        $(
            impl private::Sealed for $ty {}
            impl SessionState for $ty {
                fn stage() -> SaveStage {
                    SaveStage::$stage
                }
            }
        )*
    };
}

session_state! {
    Idle => Idle,
    Relaxed => Relaxed,
    Written => Written,
    Logged => Logged,
    Restricted => Restricted,
}

/// What a successful save produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    pub artifact: PathBuf,
    pub log_path: PathBuf,
    pub entry: AuditEntry,
    pub bytes_written: u64,
}

/// One in-flight save into a [`ProtectedFolder`].
#[derive(Debug)]
pub struct SaveSession<'f, S: SessionState> {
    folder: &'f ProtectedFolder,
    artifact: PathBuf,
    directory: PathBuf,
    state: S,
}

impl<'f, S: SessionState> SaveSession<'f, S> {
    /// The stage this session has reached.
    pub fn stage(&self) -> SaveStage {
        S::stage()
    }

    /// The resolved artifact path.
    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    fn fail(&self, err: VaultError) -> VaultError {
        err.aborted(S::stage(), &self.artifact)
    }

    fn advance<T: SessionState>(self, state: T) -> SaveSession<'f, T> {
        self.folder.observer.stage_entered(T::stage(), &self.artifact);
        SaveSession {
            folder: self.folder,
            artifact: self.artifact,
            directory: self.directory,
            state,
        }
    }
}

impl<'f> SaveSession<'f, Idle> {
    /// Open the chain from the root down to the artifact's directory.
    pub fn relax(self) -> Result<SaveSession<'f, Relaxed>, VaultError> {
        self.folder
            .guard
            .relax(&self.folder.root, &self.directory)
            .map_err(|e| self.fail(e))?;
        Ok(self.advance(Relaxed))
    }
}

impl<'f> SaveSession<'f, Relaxed> {
    /// Run the writer against the artifact path.
    pub fn write(self, writer: &ArtifactWriter) -> Result<SaveSession<'f, Written>, VaultError> {
        let bytes_written = writer.write_to(&self.artifact).map_err(|e| self.fail(e))?;
        Ok(self.advance(Written { bytes_written }))
    }
}

impl<'f> SaveSession<'f, Written> {
    /// Digest the artifact and append its entry to the directory's log.
    pub fn log(self, source: &str) -> Result<SaveSession<'f, Logged>, VaultError> {
        let folder = self.folder;
        let shasum = folder
            .checksum
            .digest(&self.artifact)
            .map_err(|e| self.fail(e))?;
        let entry = AuditEntry::new(
            self.artifact.display().to_string(),
            source,
            folder.clock.today(),
            shasum,
        );
        let log_path = folder
            .log_for(&self.directory)
            .append(entry.clone())
            .map_err(|e| self.fail(e))?;
        folder.observer.entry_appended(&log_path, &entry);
        let bytes_written = self.state.bytes_written;
        Ok(self.advance(Logged {
            bytes_written,
            entry,
            log_path,
        }))
    }
}

impl<'f> SaveSession<'f, Logged> {
    /// Lock the artifact and the log, then the chain from the artifact's
    /// directory back up to the root.
    pub fn restrict(self) -> Result<SaveSession<'f, Restricted>, VaultError> {
        let folder = self.folder;
        let guard = &folder.guard;
        guard
            .lock_file(&self.artifact)
            .and_then(|()| guard.lock_file(&self.state.log_path))
            .and_then(|()| guard.restrict(&folder.root, &self.directory, Regime::LockedDir))
            .map_err(|e| self.fail(e))?;
        let receipt = SaveReceipt {
            artifact: self.artifact.clone(),
            log_path: self.state.log_path.clone(),
            entry: self.state.entry.clone(),
            bytes_written: self.state.bytes_written,
        };
        Ok(self.advance(Restricted { receipt }))
    }
}

impl SaveSession<'_, Restricted> {
    /// Finish the session.
    pub fn into_receipt(self) -> SaveReceipt {
        self.state.receipt
    }
}

// ── Folder ──────────────────────────────────────────────────────────

/// A store root whose contents are written only through [`Self::save_file`].
#[derive(Debug, Clone)]
pub struct ProtectedFolder {
    root: PathBuf,
    log_name: String,
    guard: PermissionGuard,
    checksum: Arc<dyn ChecksumProvider>,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn VaultObserver>,
}

impl ProtectedFolder {
    /// A folder at `root` with `log.json` logs, SHA-256 digests, the system
    /// clock, and tracing output.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let observer: Arc<dyn VaultObserver> = Arc::new(TracingObserver);
        Self {
            root: root.into(),
            log_name: DEFAULT_LOG_NAME.to_string(),
            guard: PermissionGuard::new(Arc::clone(&observer)),
            checksum: Arc::new(Sha256Checksum),
            clock: Arc::new(SystemClock),
            observer,
        }
    }

    /// A folder for a loaded configuration.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.root.clone()).with_log_name(config.log_name.clone())
    }

    pub fn with_log_name(mut self, log_name: impl Into<String>) -> Self {
        self.log_name = log_name.into();
        self
    }

    pub fn with_checksum(mut self, checksum: Arc<dyn ChecksumProvider>) -> Self {
        self.checksum = checksum;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the observer for the folder and its guard.
    pub fn with_observer(mut self, observer: Arc<dyn VaultObserver>) -> Self {
        self.guard = PermissionGuard::new(Arc::clone(&observer));
        self.observer = observer;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn log_name(&self) -> &str {
        &self.log_name
    }

    fn log_for(&self, directory: &Path) -> AuditLog {
        AuditLog::in_dir(directory, &self.log_name)
    }

    /// Resolve `path` against the root. Relative paths not already under
    /// the root are joined onto it.
    fn resolve(&self, path: &Path) -> Result<PathBuf, VaultError> {
        let resolved = if path.is_relative() && !path.starts_with(&self.root) {
            self.root.join(path)
        } else {
            path.to_path_buf()
        };
        let escapes = resolved
            .components()
            .any(|c| matches!(c, Component::ParentDir));
        if escapes || !resolved.starts_with(&self.root) {
            return Err(VaultError::OutsideRoot {
                path: path.to_path_buf(),
                root: self.root.clone(),
            });
        }
        Ok(resolved)
    }

    /// Start a save of `artifact`. Validates the path and refuses one that
    /// already exists; touches nothing on disk.
    pub fn begin(&self, artifact: impl AsRef<Path>) -> Result<SaveSession<'_, Idle>, VaultError> {
        let raw = artifact.as_ref();
        let idle = |e: VaultError| e.aborted(SaveStage::Idle, raw);
        let artifact = self.resolve(raw).map_err(idle)?;
        if artifact == self.root || artifact.file_name().is_none() {
            return Err(idle(VaultError::InvalidArtifact(format!(
                "{} is not a file path",
                raw.display()
            ))));
        }
        if artifact.symlink_metadata().is_ok() {
            return Err(idle(VaultError::AlreadyExists(artifact)));
        }
        if artifact.file_name().and_then(|n| n.to_str()) == Some(self.log_name.as_str()) {
            return Err(idle(VaultError::InvalidArtifact(format!(
                "{} would shadow the audit log",
                raw.display()
            ))));
        }
        let directory = artifact
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        self.observer.stage_entered(SaveStage::Idle, &artifact);
        Ok(SaveSession {
            folder: self,
            artifact,
            directory,
            state: Idle,
        })
    }

    /// Write, log, and lock one artifact.
    pub fn save_file(
        &self,
        artifact: impl AsRef<Path>,
        writer: &ArtifactWriter,
        source: &str,
    ) -> Result<SaveReceipt, VaultError> {
        Ok(self
            .begin(artifact)?
            .relax()?
            .write(writer)?
            .log(source)?
            .restrict()?
            .into_receipt())
    }

    /// Save under a convention name inside `dir` (relative to the root).
    pub fn save_snapshot(
        &self,
        dir: impl AsRef<Path>,
        name: &SnapshotName,
        writer: &ArtifactWriter,
        source: &str,
    ) -> Result<SaveReceipt, VaultError> {
        let dir = self.resolve(dir.as_ref())?;
        self.save_file(name.path_in(&dir), writer, source)
    }

    /// Entries of the log in `dir` (relative to the root).
    pub fn entries(&self, dir: impl AsRef<Path>) -> Result<Vec<AuditEntry>, VaultError> {
        let dir = self.resolve(dir.as_ref())?;
        self.log_for(&dir).entries()
    }

    /// Check the artifacts logged in `dir` against their recorded digests.
    pub fn verify(&self, dir: impl AsRef<Path>) -> Result<VerifyReport, VaultError> {
        let dir = self.resolve(dir.as_ref())?;
        self.log_for(&dir).verify(self.checksum.as_ref())
    }

    /// Nodes under the root that are not in a locked regime.
    pub fn preflight(&self) -> Result<Vec<RegimeViolation>, VaultError> {
        self.guard.survey(&self.root)
    }

    /// Lock everything under the root. Returns the number of nodes changed.
    pub fn repair(&self) -> Result<usize, VaultError> {
        self.guard.lock_tree(&self.root)
    }

    /// The newest or oldest snapshot of `prefix` in `dir`.
    pub fn select(
        &self,
        dir: impl AsRef<Path>,
        prefix: &str,
        extension: &str,
        pick: Pick,
    ) -> Result<Option<SnapshotEntry>, VaultError> {
        let dir = self.resolve(dir.as_ref())?;
        snapshot::select_snapshot(&dir, prefix, extension, pick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NoopObserver;
    use snapvault_core::{CaptureDate, FixedClock};

    fn folder(root: &Path) -> ProtectedFolder {
        ProtectedFolder::new(root)
            .with_observer(Arc::new(NoopObserver))
            .with_clock(Arc::new(FixedClock(CaptureDate::parse("2024-01-15").unwrap())))
    }

    #[cfg(unix)]
    fn unlock(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755));
        if path.is_dir() {
            for entry in std::fs::read_dir(path).unwrap() {
                unlock(&entry.unwrap().path());
            }
        }
    }

    #[test]
    fn resolve_joins_relative_paths() {
        let f = folder(Path::new("/srv/vault"));
        assert_eq!(
            f.resolve(Path::new("a/b.yaml")).unwrap(),
            PathBuf::from("/srv/vault/a/b.yaml")
        );
        assert_eq!(
            f.resolve(Path::new("/srv/vault/b.yaml")).unwrap(),
            PathBuf::from("/srv/vault/b.yaml")
        );
        assert!(matches!(
            f.resolve(Path::new("/etc/passwd")),
            Err(VaultError::OutsideRoot { .. })
        ));
        assert!(matches!(
            f.resolve(Path::new("../escape.yaml")),
            Err(VaultError::OutsideRoot { .. })
        ));
    }

    #[test]
    fn relative_root_accepts_prefixed_paths() {
        let f = folder(Path::new("data/01_raw"));
        assert_eq!(
            f.resolve(Path::new("data/01_raw/x.pickle")).unwrap(),
            PathBuf::from("data/01_raw/x.pickle")
        );
    }

    #[test]
    fn begin_rejects_root_and_log_name() {
        let tmp = tempfile::tempdir().unwrap();
        let f = folder(tmp.path());
        let err = f.begin(tmp.path()).unwrap_err();
        assert!(matches!(err.root_cause(), VaultError::InvalidArtifact(_)));
        let err = f.begin("log.json").unwrap_err();
        assert!(matches!(err.root_cause(), VaultError::InvalidArtifact(_)));
    }

    #[cfg(unix)]
    #[test]
    fn session_reports_stage() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("store");
        let f = folder(&root);
        let session = f.begin("a.txt").unwrap();
        assert_eq!(session.stage(), SaveStage::Idle);
        let session = session.relax().unwrap();
        assert_eq!(session.stage(), SaveStage::Relaxed);
        let session = session
            .write(&ArtifactWriter::Text("a".into()))
            .unwrap();
        assert_eq!(session.stage(), SaveStage::Written);
        let receipt = session.log("test").unwrap().restrict().unwrap().into_receipt();
        assert_eq!(receipt.bytes_written, 1);
        assert_eq!(receipt.artifact, root.join("a.txt"));
        unlock(&root);
    }
}
