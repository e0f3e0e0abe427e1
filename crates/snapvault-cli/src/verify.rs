//! `snapvault verify`: recompute the digest of every artifact in a
//! directory's audit log. Exits 1 if any artifact changed or disappeared.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use snapvault_store::{EntryStatus, ProtectedFolder, StoreConfig, VerifyReport};

/// Arguments for `snapvault verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Directory under the store root. Defaults to the root.
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

/// Execute `snapvault verify`.
pub fn run_verify(args: &VerifyArgs, config: &StoreConfig) -> Result<u8> {
    let folder = ProtectedFolder::from_config(config);
    let dir = args.dir.clone().unwrap_or_else(|| config.root.clone());
    let report = folder
        .verify(&dir)
        .with_context(|| format!("failed to verify log in {}", dir.display()))?;
    print!("{}", render(&report));
    Ok(if report.is_clean() { 0 } else { 1 })
}

fn render(report: &VerifyReport) -> String {
    let mut out = format!("log: {}\n", report.log_path.display());
    if report.checks.is_empty() {
        out.push_str("  no entries\n");
        return out;
    }
    for check in &report.checks {
        let line = match &check.status {
            EntryStatus::Intact => format!("  OK        {}", check.resolved.display()),
            EntryStatus::Missing => format!("  MISSING   {}", check.resolved.display()),
            EntryStatus::Mismatch { recorded, actual } => format!(
                "  MISMATCH  {} (recorded {recorded}, actual {actual})",
                check.resolved.display()
            ),
        };
        out.push_str(&line);
        out.push('\n');
    }
    let problems = report.problems().count();
    out.push_str(&format!(
        "{} entries, {} intact, {} problems\n",
        report.checks.len(),
        report.checks.len() - problems,
        problems
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapvault_core::{sha256_bytes, CaptureDate};
    use snapvault_store::{AuditEntry, EntryCheck};

    fn check(name: &str, status: EntryStatus) -> EntryCheck {
        EntryCheck {
            entry: AuditEntry::new(
                name,
                "s",
                CaptureDate::parse("2024-01-15").unwrap(),
                sha256_bytes(b"x"),
            ),
            resolved: PathBuf::from(name),
            status,
        }
    }

    #[test]
    fn renders_each_status() {
        let report = VerifyReport {
            log_path: PathBuf::from("data/01_raw/log.json"),
            checks: vec![
                check("a.yaml", EntryStatus::Intact),
                check("b.yaml", EntryStatus::Missing),
            ],
        };
        let text = render(&report);
        assert!(text.contains("OK        a.yaml"));
        assert!(text.contains("MISSING   b.yaml"));
        assert!(text.ends_with("2 entries, 1 intact, 1 problems\n"));
    }

    #[test]
    fn empty_log_directory_is_clean() {
        let tmp = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(tmp.path(), "log.json").unwrap();
        let code = run_verify(&VerifyArgs { dir: None }, &config).unwrap();
        assert_eq!(code, 0);
    }
}
