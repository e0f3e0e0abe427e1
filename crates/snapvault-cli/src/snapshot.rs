//! Snapshot naming helpers: `name`, `parse`, and `latest`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use snapvault_core::{CaptureDate, SnapshotName, SnapshotNamer};
use snapvault_store::{Pick, ProtectedFolder, StoreConfig};

/// Arguments for `snapvault name`.
#[derive(Args, Debug)]
pub struct NameArgs {
    #[arg(long)]
    pub prefix: String,
    #[arg(long)]
    pub kind: String,
    #[arg(long)]
    pub ext: String,
    /// Source revision; omit when unknown.
    #[arg(long, default_value = "")]
    pub revision: String,
    /// Capture date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    pub date: Option<String>,
}

/// Arguments for `snapvault parse`.
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// File name or path to parse.
    pub name: String,
    /// Print the fields as a JSON object.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `snapvault latest`.
#[derive(Args, Debug)]
pub struct LatestArgs {
    #[arg(long)]
    pub prefix: String,
    #[arg(long)]
    pub ext: String,
    /// Directory to search, relative to the store root. Defaults to the root.
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// Select the earliest capture instead of the latest.
    #[arg(long)]
    pub oldest: bool,
}

/// Execute `snapvault name`.
pub fn run_name(args: &NameArgs) -> Result<u8> {
    println!("{}", build_name(args)?);
    Ok(0)
}

fn build_name(args: &NameArgs) -> Result<SnapshotName> {
    let date = args
        .date
        .as_deref()
        .map(CaptureDate::parse)
        .transpose()
        .context("invalid --date")?;
    let namer = SnapshotNamer::new(&args.prefix).context("invalid --prefix")?;
    namer
        .name(&args.kind, &args.ext, &args.revision, date)
        .context("cannot build snapshot name")
}

/// Execute `snapvault parse`.
pub fn run_parse(args: &ParseArgs) -> Result<u8> {
    let name = SnapshotName::parse(&args.name)
        .with_context(|| format!("{} is not a snapshot name", args.name))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&fields(&name))?);
    } else {
        println!("prefix:    {}", name.prefix());
        println!("kind:      {}", name.kind());
        println!("date:      {}", name.date());
        println!(
            "revision:  {}",
            name.revision().map(|r| r.as_str()).unwrap_or("-")
        );
        println!("extension: {}", name.extension());
    }
    Ok(0)
}

fn fields(name: &SnapshotName) -> serde_json::Value {
    serde_json::json!({
        "prefix": name.prefix(),
        "kind": name.kind().as_str(),
        "date": name.date().to_string(),
        "revision": name.revision().map(|r| r.as_str()),
        "extension": name.extension(),
    })
}

/// Execute `snapvault latest`.
pub fn run_latest(args: &LatestArgs, config: &StoreConfig) -> Result<u8> {
    let folder = ProtectedFolder::from_config(config);
    let dir = args.dir.as_deref().unwrap_or(folder.root());
    let pick = if args.oldest { Pick::Oldest } else { Pick::Newest };
    let found = folder
        .select(dir, &args.prefix, &args.ext, pick)
        .with_context(|| format!("failed to list {}", dir.display()))?;
    match found {
        Some(entry) => {
            println!("{}", entry.path.display());
            Ok(0)
        }
        None => {
            tracing::warn!(
                prefix = %args.prefix,
                ext = %args.ext,
                dir = %dir.display(),
                "no snapshots found"
            );
            Ok(1)
        }
    }
}
