//! `snapvault check`: find nodes under the store root that are not in a
//! locked regime, for example after an interrupted save. `--repair` locks
//! them. Exits 1 while violations remain.

use anyhow::{Context, Result};
use clap::Args;

use snapvault_store::{ProtectedFolder, StoreConfig};

/// Arguments for `snapvault check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Lock every file and directory found outside its regime.
    #[arg(long)]
    pub repair: bool,
}

/// Execute `snapvault check`.
pub fn run_check(args: &CheckArgs, config: &StoreConfig) -> Result<u8> {
    let folder = ProtectedFolder::from_config(config);
    run_check_with(args, &folder)
}

fn run_check_with(args: &CheckArgs, folder: &ProtectedFolder) -> Result<u8> {
    let root = folder.root().display().to_string();
    let mut violations = folder
        .preflight()
        .with_context(|| format!("failed to survey {root}"))?;
    for v in &violations {
        println!(
            "  {:#o}  {}  (expected {})",
            v.mode,
            v.path.display(),
            v.expected
        );
    }

    if args.repair && !violations.is_empty() {
        let changed = folder
            .repair()
            .with_context(|| format!("failed to repair {root}"))?;
        println!("repaired {changed} nodes");
        violations = folder.preflight()?;
    }

    if violations.is_empty() {
        println!("{root}: all nodes locked");
        Ok(0)
    } else {
        println!("{root}: {} nodes outside their regime", violations.len());
        Ok(1)
    }
}
