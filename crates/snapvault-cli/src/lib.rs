//! # snapvault-cli — Protected Snapshot Store CLI
//!
//! A thin surface over `snapvault-store`. Each subcommand module exposes an
//! `Args` struct and a `run_*` handler returning a process exit code.
//!
//! ## Subcommands
//!
//! - `save` — write content as a named, logged, locked snapshot
//! - `verify` — recompute digests for a directory's audit log
//! - `check` — report (and optionally repair) unlocked nodes
//! - `name` / `parse` / `latest` — snapshot naming helpers
//!
//! ## Crate Policy
//!
//! - Argument parsing lives here; behavior lives in the store.
//! - Handlers return `anyhow::Result<u8>`; `main` maps errors to exit 1.

use std::path::PathBuf;

use anyhow::{Context, Result};
use snapvault_store::StoreConfig;

pub mod check;
pub mod save;
pub mod snapshot;
pub mod verify;

/// Build the store configuration: flags win over the environment, which
/// wins over the defaults.
pub fn resolve_config(root: Option<PathBuf>, log_name: Option<String>) -> Result<StoreConfig> {
    resolve_config_with(root, log_name, |key| std::env::var(key).ok())
}

fn resolve_config_with(
    root: Option<PathBuf>,
    log_name: Option<String>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<StoreConfig> {
    StoreConfig::layered(root, log_name, lookup).context("invalid store configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_environment() {
        let cfg = resolve_config(
            Some(PathBuf::from("/tmp/vault")),
            Some("raw_data_log.json".into()),
        )
        .unwrap();
        assert_eq!(cfg.root, PathBuf::from("/tmp/vault"));
        assert_eq!(cfg.log_name, "raw_data_log.json");
    }

    #[test]
    fn log_name_flag_overrides_invalid_env() {
        let env = |k: &str| (k == "SNAPVAULT_LOG_NAME").then(|| "bad.txt".to_string());
        let cfg = resolve_config_with(None, Some("log.json".into()), env).unwrap();
        assert_eq!(cfg.log_name, "log.json");

        let err = resolve_config_with(None, None, env).unwrap_err();
        assert!(format!("{err:#}").contains("bad.txt"));
    }

    #[test]
    fn bad_log_name_flag_is_rejected() {
        let err = resolve_config(Some(PathBuf::from("/tmp/vault")), Some("log.txt".into()))
            .unwrap_err();
        assert!(format!("{err:#}").contains("log.txt"));
    }
}
