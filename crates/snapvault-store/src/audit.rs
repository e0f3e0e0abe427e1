//! # Audit Log
//!
//! One JSON array per directory recording every artifact ever written there.
//!
//! ## Format
//!
//! ```json
//! [
//!     {
//!         "file_name": "data/01_raw/helm_models_raw_2024-01-15_abc1234.yaml",
//!         "source": "src/data/helm_models.py--abc1234",
//!         "date": "2024-01-15",
//!         "shasum": "…64 hex…"
//!     }
//! ]
//! ```
//!
//! Four-space indentation and the key order above are part of the format;
//! logs written by the earlier pipeline diff cleanly against ours.
//!
//! ## Append-Only Invariant
//!
//! [`AuditLog::append`] reads the whole array, pushes one entry, and rewrites
//! the array through a sibling temp file renamed over the log. Existing
//! entries are copied as their original JSON text, byte for byte. A log that
//! fails to parse, or holds an element that is not an entry, is reported as
//! [`VaultError::CorruptLog`] and left untouched.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use snapvault_core::{CaptureDate, ChecksumProvider, ShaSum, VaultError};

/// One provenance record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// The artifact path as it was written.
    pub file_name: String,
    /// Producer identifier, e.g. `src/data/helm_models.py--abc1234`.
    pub source: String,
    /// Capture date.
    pub date: CaptureDate,
    /// Digest of the artifact's bytes after the write.
    pub shasum: ShaSum,
}

impl AuditEntry {
    /// Build an entry.
    pub fn new(
        file_name: impl Into<String>,
        source: impl Into<String>,
        date: CaptureDate,
        shasum: ShaSum,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            source: source.into(),
            date,
            shasum,
        }
    }
}

/// Handle on a directory's log file. Holds only the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    /// The log named `log_name` inside `directory`.
    pub fn in_dir(directory: &Path, log_name: &str) -> Self {
        Self {
            path: directory.join(log_name),
        }
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    fn read_text(&self) -> Result<Option<String>, VaultError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(VaultError::io(&self.path, e)),
        }
    }

    fn corrupt(&self, e: serde_json::Error) -> VaultError {
        VaultError::CorruptLog {
            path: self.path.clone(),
            reason: e.to_string(),
        }
    }

    /// Read every entry. An absent log has no entries.
    pub fn entries(&self) -> Result<Vec<AuditEntry>, VaultError> {
        match self.read_text()? {
            Some(text) => serde_json::from_str(&text).map_err(|e| self.corrupt(e)),
            None => Ok(Vec::new()),
        }
    }

    /// Append `entry` and return the log path.
    ///
    /// Earlier entries are carried over as their original JSON text, so
    /// fields this crate does not model, digest case, and string escapes
    /// survive unchanged. Each must still parse as an [`AuditEntry`].
    ///
    /// The directory must be writable. The log file itself may be locked;
    /// it is replaced, not opened for writing.
    pub fn append(&self, entry: AuditEntry) -> Result<PathBuf, VaultError> {
        let mut items: Vec<Box<RawValue>> = match self.read_text()? {
            Some(text) => serde_json::from_str(&text).map_err(|e| self.corrupt(e))?,
            None => Vec::new(),
        };
        for item in &items {
            serde_json::from_str::<AuditEntry>(item.get()).map_err(|e| self.corrupt(e))?;
        }
        items.push(render_entry(&entry)?);
        let bytes = render(&items)?;

        let tmp = self.temp_path();
        match fs::remove_file(&tmp) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(VaultError::io(&tmp, e)),
        }
        let mut file = File::create(&tmp).map_err(|e| VaultError::io(&tmp, e))?;
        file.write_all(&bytes).map_err(|e| VaultError::io(&tmp, e))?;
        file.sync_all().map_err(|e| VaultError::io(&tmp, e))?;
        drop(file);
        fs::rename(&tmp, &self.path).map_err(|e| VaultError::io(&self.path, e))?;
        Ok(self.path.clone())
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.directory().join(format!(".{name}.tmp"))
    }

    /// Recompute every entry's digest with `checksum` and compare. Each
    /// entry is checked with the algorithm its recorded digest came from.
    pub fn verify(&self, checksum: &dyn ChecksumProvider) -> Result<VerifyReport, VaultError> {
        let mut checks = Vec::new();
        for entry in self.entries()? {
            let resolved = self.resolve(&entry.file_name);
            let status = match checksum.digest_with(&resolved, entry.shasum.algorithm()) {
                Ok(actual) if actual == entry.shasum => EntryStatus::Intact,
                Ok(actual) => EntryStatus::Mismatch {
                    recorded: entry.shasum.clone(),
                    actual,
                },
                Err(VaultError::NotFound(_)) => EntryStatus::Missing,
                Err(e) => return Err(e),
            };
            checks.push(EntryCheck {
                entry,
                resolved,
                status,
            });
        }
        Ok(VerifyReport {
            log_path: self.path.clone(),
            checks,
        })
    }

    // Entries record the path as written, which may be relative to another
    // working directory. Fall back to the basename inside the log's directory.
    fn resolve(&self, file_name: &str) -> PathBuf {
        let recorded = Path::new(file_name);
        if recorded.exists() {
            return recorded.to_path_buf();
        }
        match recorded.file_name() {
            Some(base) => self.directory().join(base),
            None => recorded.to_path_buf(),
        }
    }
}

fn pretty() -> serde_json::ser::PrettyFormatter<'static> {
    serde_json::ser::PrettyFormatter::with_indent(b"    ")
}

// One entry, pretty-printed at array-element depth.
fn render_entry(entry: &AuditEntry) -> Result<Box<RawValue>, VaultError> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, pretty());
    entry
        .serialize(&mut ser)
        .map_err(|e| VaultError::Serialization(e.to_string()))?;
    let text = String::from_utf8(buf)
        .map_err(|e| VaultError::Serialization(e.to_string()))?
        .replace('\n', "\n    ");
    RawValue::from_string(text).map_err(|e| VaultError::Serialization(e.to_string()))
}

fn render(items: &[Box<RawValue>]) -> Result<Vec<u8>, VaultError> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, pretty());
    items
        .serialize(&mut ser)
        .map_err(|e| VaultError::Serialization(e.to_string()))?;
    Ok(buf)
}

/// Outcome of checking one entry against disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    /// The artifact's digest matches the record.
    Intact,
    /// The artifact's bytes changed since it was logged.
    Mismatch {
        /// Digest in the log.
        recorded: ShaSum,
        /// Digest of the bytes on disk now.
        actual: ShaSum,
    },
    /// The artifact no longer exists.
    Missing,
}

/// One entry and what was found for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryCheck {
    pub entry: AuditEntry,
    pub resolved: PathBuf,
    pub status: EntryStatus,
}

/// Result of [`AuditLog::verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub log_path: PathBuf,
    pub checks: Vec<EntryCheck>,
}

impl VerifyReport {
    /// True when every entry is intact.
    pub fn is_clean(&self) -> bool {
        self.checks.iter().all(|c| c.status == EntryStatus::Intact)
    }

    /// Entries that are not intact.
    pub fn problems(&self) -> impl Iterator<Item = &EntryCheck> {
        self.checks
            .iter()
            .filter(|c| c.status != EntryStatus::Intact)
    }
}
