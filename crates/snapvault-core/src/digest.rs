//! # File Digests — Checksum Provider
//!
//! Computes the content digest recorded in every audit entry.
//!
//! ## Invariant
//!
//! The digest is taken over the artifact's bytes as they sit on disk after
//! the write completes and before the file is locked, so the recorded value
//! matches the immutable final content. A missing file yields
//! [`VaultError::NotFound`]; nothing is logged for it.
//!
//! ## Legacy logs
//!
//! Logs written by the earlier pipeline may carry 40-character SHA-1
//! digests. [`ShaSum::parse`] accepts both 40 and 64 hex characters so those
//! logs remain readable, and [`ChecksumProvider::digest_with`] recomputes a
//! digest in whichever [`DigestAlgorithm`] it was recorded with. Everything
//! this crate writes is SHA-256.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::VaultError;

/// A lowercase hex content digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ShaSum(String);

impl ShaSum {
    /// Parse a hex digest, normalizing to lowercase.
    ///
    /// Accepts 40 (SHA-1) or 64 (SHA-256) hex characters.
    pub fn parse(s: &str) -> Result<Self, VaultError> {
        let d = s.trim().to_ascii_lowercase();
        if d.len() != 40 && d.len() != 64 {
            return Err(VaultError::Serialization(format!(
                "digest must be 40 or 64 hex chars, got {} chars",
                d.len()
            )));
        }
        if !d.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(VaultError::Serialization(
                "digest contains non-hex characters".into(),
            ));
        }
        Ok(Self(d))
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// The digest as a hex string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The algorithm that produced this digest, inferred from its length.
    pub fn algorithm(&self) -> DigestAlgorithm {
        if self.0.len() == 40 {
            DigestAlgorithm::Sha1
        } else {
            DigestAlgorithm::Sha256
        }
    }
}

/// Hash functions a recorded digest may come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    /// Legacy 40-hex-char digests.
    Sha1,
    /// Current 64-hex-char digests.
    Sha256,
}

impl std::fmt::Display for ShaSum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ShaSum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ShaSum::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Computes content digests for files.
///
/// The protected folder holds one of these; tests and alternative
/// deployments can swap the implementation.
pub trait ChecksumProvider: Send + Sync + std::fmt::Debug {
    /// Digest the current bytes of `path`.
    fn digest(&self, path: &Path) -> Result<ShaSum, VaultError>;

    /// Digest `path` with `algorithm`, for comparison against a recorded
    /// value. SHA-256 goes through [`Self::digest`].
    fn digest_with(&self, path: &Path, algorithm: DigestAlgorithm) -> Result<ShaSum, VaultError> {
        match algorithm {
            DigestAlgorithm::Sha256 => self.digest(path),
            DigestAlgorithm::Sha1 => sha1_file(path),
        }
    }
}

/// SHA-256 over the file contents, streamed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Checksum;

impl ChecksumProvider for Sha256Checksum {
    fn digest(&self, path: &Path) -> Result<ShaSum, VaultError> {
        sha256_file(path)
    }
}

/// Compute the SHA-256 digest of a file without loading it into memory.
pub fn sha256_file(path: &Path) -> Result<ShaSum, VaultError> {
    let file = File::open(path).map_err(|e| VaultError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    std::io::copy(&mut reader, &mut hasher).map_err(|e| VaultError::io(path, e))?;
    Ok(ShaSum::from_bytes(&hasher.finalize()))
}

/// Compute the SHA-1 digest of a file. Used only to check legacy entries.
pub fn sha1_file(path: &Path) -> Result<ShaSum, VaultError> {
    let file = File::open(path).map_err(|e| VaultError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha1::new();
    std::io::copy(&mut reader, &mut hasher).map_err(|e| VaultError::io(path, e))?;
    Ok(ShaSum::from_bytes(&hasher.finalize()))
}

/// Compute the SHA-256 digest of an in-memory buffer.
pub fn sha256_bytes(data: &[u8]) -> ShaSum {
    ShaSum::from_bytes(&Sha256::digest(data))
}
