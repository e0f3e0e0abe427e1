//! # Permission Guard
//!
//! Opens a directory chain for a write and locks it again afterwards.
//!
//! ## Ordering Invariant
//!
//! [`PermissionGuard::relax`] walks **top-down** (root → target) so every
//! directory is enterable before its children are touched.
//! [`PermissionGuard::restrict`] walks **bottom-up** (target → root) so the
//! just-written leaf is locked first. A crash part-way through restriction
//! therefore leaves the deepest nodes locked and only ancestors open, never
//! a writable leaf under a locked parent.
//!
//! Neither walk is transactional. A failure leaves the chain in whatever
//! state it reached; [`PermissionGuard::survey`] finds such leftovers and
//! [`PermissionGuard::lock_tree`] repairs them.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use snapvault_core::{Regime, VaultError};

use crate::observer::VaultObserver;

/// A node found outside its locked regime by [`PermissionGuard::survey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegimeViolation {
    /// The offending file or directory.
    pub path: PathBuf,
    /// Its current permission bits (low nine bits).
    pub mode: u32,
    /// The regime it should be in.
    pub expected: Regime,
}

/// Applies permission regimes along paths under a store root.
#[derive(Debug, Clone)]
pub struct PermissionGuard {
    observer: Arc<dyn VaultObserver>,
}

impl PermissionGuard {
    /// Create a guard reporting to `observer`.
    pub fn new(observer: Arc<dyn VaultObserver>) -> Self {
        Self { observer }
    }

    /// Directories from `root` down to `target`, both inclusive, root first.
    ///
    /// Fails with [`VaultError::OutsideRoot`] if `target` does not lie under
    /// `root` or climbs out of it with `..`.
    pub fn chain(root: &Path, target: &Path) -> Result<Vec<PathBuf>, VaultError> {
        let outside = || VaultError::OutsideRoot {
            path: target.to_path_buf(),
            root: root.to_path_buf(),
        };
        let rel = target.strip_prefix(root).map_err(|_| outside())?;
        let mut chain = vec![root.to_path_buf()];
        let mut current = root.to_path_buf();
        for component in rel.components() {
            match component {
                Component::Normal(part) => {
                    current.push(part);
                    chain.push(current.clone());
                }
                Component::CurDir => {}
                _ => return Err(outside()),
            }
        }
        Ok(chain)
    }

    /// Set every directory from `root` down to `target` to `OPEN`, creating
    /// missing ones on the way.
    pub fn relax(&self, root: &Path, target: &Path) -> Result<(), VaultError> {
        for dir in Self::chain(root, target)? {
            match fs::symlink_metadata(&dir) {
                Ok(meta) if meta.is_dir() => {}
                Ok(_) => {
                    return Err(VaultError::io(
                        &dir,
                        std::io::Error::other("exists but is not a directory"),
                    ))
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    fs::create_dir_all(&dir).map_err(|e| VaultError::io(&dir, e))?;
                }
                Err(e) => return Err(VaultError::io(&dir, e)),
            }
            self.apply(&dir, Regime::Open)?;
        }
        Ok(())
    }

    /// Set every directory from `target` up to `root` to `regime`.
    pub fn restrict(&self, root: &Path, target: &Path, regime: Regime) -> Result<(), VaultError> {
        for dir in Self::chain(root, target)?.iter().rev() {
            self.apply(dir, regime)?;
        }
        Ok(())
    }

    /// Make a single file `LOCKED_FILE`.
    pub fn lock_file(&self, path: &Path) -> Result<(), VaultError> {
        self.apply(path, Regime::LockedFile)
    }

    /// Classify the current permissions of `path`.
    ///
    /// Returns `None` when the bits match no regime exactly.
    pub fn regime_of(path: &Path) -> Result<Option<Regime>, VaultError> {
        let meta = fs::symlink_metadata(path).map_err(|e| VaultError::io(path, e))?;
        Ok(Regime::from_mode(mode_of(&meta)))
    }

    /// Walk `root` and report every directory not at `LOCKED_DIR` and every
    /// file not at `LOCKED_FILE`. Symlinks are not followed.
    pub fn survey(&self, root: &Path) -> Result<Vec<RegimeViolation>, VaultError> {
        let mut violations = Vec::new();
        self.survey_node(root, &mut violations)?;
        for v in &violations {
            self.observer.violation_found(v);
        }
        Ok(violations)
    }

    fn survey_node(&self, path: &Path, out: &mut Vec<RegimeViolation>) -> Result<(), VaultError> {
        let meta = fs::symlink_metadata(path).map_err(|e| VaultError::io(path, e))?;
        if meta.file_type().is_symlink() {
            return Ok(());
        }
        let expected = if meta.is_dir() {
            Regime::LockedDir
        } else {
            Regime::LockedFile
        };
        let mode = mode_of(&meta) & 0o777;
        if Regime::from_mode(mode) != Some(expected) {
            out.push(RegimeViolation {
                path: path.to_path_buf(),
                mode,
                expected,
            });
        }
        if meta.is_dir() {
            for child in sorted_children(path)? {
                self.survey_node(&child, out)?;
            }
        }
        Ok(())
    }

    /// Lock every file and directory under `root` (inclusive), children
    /// before parents. Returns the number of nodes whose mode changed.
    pub fn lock_tree(&self, root: &Path) -> Result<usize, VaultError> {
        self.lock_node(root)
    }

    fn lock_node(&self, path: &Path) -> Result<usize, VaultError> {
        let meta = fs::symlink_metadata(path).map_err(|e| VaultError::io(path, e))?;
        if meta.file_type().is_symlink() {
            return Ok(0);
        }
        let mut changed = 0;
        let target = if meta.is_dir() {
            for child in sorted_children(path)? {
                changed += self.lock_node(&child)?;
            }
            Regime::LockedDir
        } else {
            Regime::LockedFile
        };
        if Regime::from_mode(mode_of(&meta)) != Some(target) {
            self.apply(path, target)?;
            changed += 1;
        }
        Ok(changed)
    }

    fn apply(&self, path: &Path, regime: Regime) -> Result<(), VaultError> {
        set_regime(path, regime)?;
        self.observer.regime_applied(path, regime);
        Ok(())
    }
}

fn sorted_children(dir: &Path) -> Result<Vec<PathBuf>, VaultError> {
    let mut children = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| VaultError::io(dir, e))? {
        let entry = entry.map_err(|e| VaultError::io(dir, e))?;
        children.push(entry.path());
    }
    children.sort();
    Ok(children)
}

#[cfg(unix)]
fn set_regime(path: &Path, regime: Regime) -> Result<(), VaultError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(regime.mode()))
        .map_err(|e| VaultError::io(path, e))
}

#[cfg(not(unix))]
fn set_regime(path: &Path, regime: Regime) -> Result<(), VaultError> {
    let mut perms = fs::metadata(path)
        .map_err(|e| VaultError::io(path, e))?
        .permissions();
    perms.set_readonly(regime.is_locked());
    fs::set_permissions(path, perms).map_err(|e| VaultError::io(path, e))
}

#[cfg(unix)]
fn mode_of(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode()
}

// Without Unix mode bits only the read-only flag is meaningful; map it onto
// the nearest regime.
#[cfg(not(unix))]
fn mode_of(meta: &fs::Metadata) -> u32 {
    match (meta.is_dir(), meta.permissions().readonly()) {
        (true, true) => Regime::LockedDir.mode(),
        (false, true) => Regime::LockedFile.mode(),
        _ => Regime::Open.mode(),
    }
}
