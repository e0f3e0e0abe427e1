//! Snapshot discovery: list the captures of one dataset in a directory and
//! pick the newest (or oldest) by capture date.

use std::fs;
use std::path::{Path, PathBuf};

use snapvault_core::{SnapshotName, VaultError};

/// Which end of the date range [`select_snapshot`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pick {
    /// Latest capture date; ties go to the greatest file name.
    #[default]
    Newest,
    /// Earliest capture date; ties go to the smallest file name.
    Oldest,
}

/// A parsed snapshot found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub path: PathBuf,
    pub name: SnapshotName,
}

/// Every `<prefix>_*.<extension>` file in `dir` whose name parses with
/// exactly `prefix`, ordered by (date, file name). A missing directory has
/// no snapshots.
pub fn list_snapshots(
    dir: &Path,
    prefix: &str,
    extension: &str,
) -> Result<Vec<SnapshotEntry>, VaultError> {
    let read = match fs::read_dir(dir) {
        Ok(read) => read,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(VaultError::io(dir, e)),
    };
    let head = format!("{prefix}_");
    let tail = format!(".{extension}");

    let mut found = Vec::new();
    for entry in read {
        let entry = entry.map_err(|e| VaultError::io(dir, e))?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if !file_name.starts_with(&head) || !file_name.ends_with(&tail) {
            continue;
        }
        match SnapshotName::parse(&file_name) {
            Ok(name) if name.prefix() == prefix => found.push(SnapshotEntry {
                path: entry.path(),
                name,
            }),
            Ok(name) => {
                tracing::debug!(file = %file_name, prefix = name.prefix(), "different dataset, skipped");
            }
            Err(e) => {
                tracing::warn!(file = %file_name, error = %e, "unparseable snapshot name, skipped");
            }
        }
    }
    found.sort_by(|a, b| {
        a.name
            .date()
            .cmp(&b.name.date())
            .then_with(|| a.name.file_name().cmp(&b.name.file_name()))
    });
    Ok(found)
}

/// The newest or oldest snapshot of `prefix` in `dir`, if any.
pub fn select_snapshot(
    dir: &Path,
    prefix: &str,
    extension: &str,
    pick: Pick,
) -> Result<Option<SnapshotEntry>, VaultError> {
    let mut all = list_snapshots(dir, prefix, extension)?;
    Ok(match pick {
        Pick::Newest => all.pop(),
        Pick::Oldest => (!all.is_empty()).then(|| all.swap_remove(0)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    fn names(entries: &[SnapshotEntry]) -> Vec<String> {
        entries.iter().map(|e| e.name.file_name()).collect()
    }

    #[test]
    fn lists_by_date() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        touch(dir, "scale_leaderboard_raw_2024-05-30.pickle");
        touch(dir, "scale_leaderboard_raw_2024-03-01.pickle");
        touch(dir, "scale_leaderboard_raw_2024-04-10.pickle");
        touch(dir, "helm_models_raw_2024-06-01_abc.yaml");
        touch(dir, "raw_data_log.json");

        let listed = list_snapshots(dir, "scale_leaderboard", "pickle").unwrap();
        assert_eq!(
            names(&listed),
            vec![
                "scale_leaderboard_raw_2024-03-01.pickle",
                "scale_leaderboard_raw_2024-04-10.pickle",
                "scale_leaderboard_raw_2024-05-30.pickle",
            ]
        );
    }

    #[test]
    fn picks_newest_and_oldest() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        touch(dir, "helm_models_raw_2024-01-15_abc1234.yaml");
        touch(dir, "helm_models_raw_2024-02-20_def5678.yaml");

        let newest = select_snapshot(dir, "helm_models", "yaml", Pick::Newest)
            .unwrap()
            .unwrap();
        assert_eq!(newest.name.file_name(), "helm_models_raw_2024-02-20_def5678.yaml");

        let oldest = select_snapshot(dir, "helm_models", "yaml", Pick::Oldest)
            .unwrap()
            .unwrap();
        assert_eq!(oldest.name.file_name(), "helm_models_raw_2024-01-15_abc1234.yaml");
    }

    #[test]
    fn skips_garbage_and_other_prefixes() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        touch(dir, "helm_models_notes.yaml");
        touch(dir, "helm_models_v2_raw_2024-09-09.yaml");
        touch(dir, "helm_models_raw_2024-01-15.yaml");

        let listed = list_snapshots(dir, "helm_models", "yaml").unwrap();
        assert_eq!(names(&listed), vec!["helm_models_raw_2024-01-15.yaml"]);
    }

    #[test]
    fn empty_or_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(select_snapshot(tmp.path(), "helm_models", "yaml", Pick::Newest)
            .unwrap()
            .is_none());
        assert!(list_snapshots(&tmp.path().join("absent"), "helm_models", "yaml")
            .unwrap()
            .is_empty());
    }
}
