//! # Permission Regimes
//!
//! Every directory and file under a store root is in one of three regimes.
//! The numeric modes are a bit-exact contract with downstream read-only
//! consumers and must not change.
//!
//! | Regime        | Mode    | Used for                                  |
//! |---------------|---------|-------------------------------------------|
//! | `OPEN`        | `0o744` | directories, only while a save is running |
//! | `LOCKED_DIR`  | `0o544` | directories holding finalized artifacts   |
//! | `LOCKED_FILE` | `0o444` | finalized artifacts and audit logs        |

use serde::{Deserialize, Serialize};

/// Owner rwx, group/other r.
pub const OPEN_MODE: u32 = 0o744;
/// Owner r-x, group/other r.
pub const LOCKED_DIR_MODE: u32 = 0o544;
/// Read-only for everyone.
pub const LOCKED_FILE_MODE: u32 = 0o444;

/// Permission regime of a filesystem node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    /// Transiently writable during a save.
    Open,
    /// Locked directory.
    LockedDir,
    /// Locked file.
    LockedFile,
}

impl Regime {
    /// The Unix permission bits for this regime.
    pub fn mode(&self) -> u32 {
        match self {
            Self::Open => OPEN_MODE,
            Self::LockedDir => LOCKED_DIR_MODE,
            Self::LockedFile => LOCKED_FILE_MODE,
        }
    }

    /// Classify permission bits. Only exact matches on the low nine bits
    /// count; file-type bits are ignored.
    pub fn from_mode(mode: u32) -> Option<Self> {
        match mode & 0o777 {
            OPEN_MODE => Some(Self::Open),
            LOCKED_DIR_MODE => Some(Self::LockedDir),
            LOCKED_FILE_MODE => Some(Self::LockedFile),
            _ => None,
        }
    }

    /// Whether this is one of the `LOCKED_*` regimes.
    pub fn is_locked(&self) -> bool {
        !matches!(self, Self::Open)
    }

    /// The canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::LockedDir => "LOCKED_DIR",
            Self::LockedFile => "LOCKED_FILE",
        }
    }
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:#o})", self.as_str(), self.mode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_are_bit_exact() {
        assert_eq!(Regime::Open.mode(), 0o744);
        assert_eq!(Regime::LockedDir.mode(), 0o544);
        assert_eq!(Regime::LockedFile.mode(), 0o444);
    }

    #[test]
    fn from_mode_ignores_file_type_bits() {
        // 0o040000 is S_IFDIR.
        assert_eq!(Regime::from_mode(0o040544), Some(Regime::LockedDir));
        assert_eq!(Regime::from_mode(0o100444), Some(Regime::LockedFile));
        assert_eq!(Regime::from_mode(0o755), None);
    }

    #[test]
    fn only_open_is_unlocked() {
        assert!(!Regime::Open.is_locked());
        assert!(Regime::LockedDir.is_locked());
        assert!(Regime::LockedFile.is_locked());
    }

    #[test]
    fn display_includes_octal_mode() {
        assert_eq!(Regime::LockedDir.to_string(), "LOCKED_DIR (0o544)");
    }
}
