//! # Save CLI — write content as a protected snapshot.
//!
//! ```bash
//! # Capture a HELM model listing from stdin:
//! curl -s "$URL" | snapvault save --prefix helm_models --kind raw --ext yaml \
//!     --revision abc1234 --source src/data/helm_models.py--abc1234
//!
//! # Store a leaderboard page capture as opaque bytes:
//! snapvault --root data/01_raw --log-name raw_data_log.json save \
//!     --prefix scale_leaderboard --kind raw --ext pickle --format bytes \
//!     --input page.pickle --source src/data/scale_leaderboard.py
//! ```

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use snapvault_core::{CaptureDate, SnapshotNamer};
use snapvault_store::{ArtifactWriter, ProtectedFolder, SaveReceipt, StoreConfig};

/// How input bytes are interpreted before writing.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormat {
    /// UTF-8 text, written verbatim.
    Text,
    /// Arbitrary bytes, written verbatim.
    Bytes,
    /// JSON, re-emitted pretty-printed.
    Json,
    /// YAML, re-emitted in canonical form.
    Yaml,
}

/// Arguments for `snapvault save`.
#[derive(Args, Debug)]
pub struct SaveArgs {
    /// Dataset prefix, e.g. helm_models.
    #[arg(long)]
    pub prefix: String,

    /// Artifact kind, e.g. raw or intermediate.
    #[arg(long)]
    pub kind: String,

    /// File extension without the dot.
    #[arg(long)]
    pub ext: String,

    /// Source revision; omit when unknown.
    #[arg(long, default_value = "")]
    pub revision: String,

    /// Capture date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    pub date: Option<String>,

    /// Producer identifier recorded in the audit log.
    #[arg(long)]
    pub source: String,

    /// Read content from this file instead of stdin.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Content format.
    #[arg(long, value_enum, default_value_t = InputFormat::Text)]
    pub format: InputFormat,

    /// Directory under the store root. Defaults to the root.
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

/// Execute `snapvault save`.
pub fn run_save(args: &SaveArgs, config: &StoreConfig) -> Result<u8> {
    let content = read_input(args)?;
    let folder = ProtectedFolder::from_config(config);
    let receipt = save_with(args, &folder, content)?;

    println!("  artifact: {}", receipt.artifact.display());
    println!("  log:      {}", receipt.log_path.display());
    println!("  date:     {}", receipt.entry.date);
    println!("  shasum:   {}", receipt.entry.shasum);
    println!("  bytes:    {}", receipt.bytes_written);
    Ok(0)
}

/// Name, convert, and save `content` into `folder`.
pub fn save_with(args: &SaveArgs, folder: &ProtectedFolder, content: Vec<u8>) -> Result<SaveReceipt> {
    let date = args
        .date
        .as_deref()
        .map(CaptureDate::parse)
        .transpose()
        .context("invalid --date")?;
    let name = SnapshotNamer::new(&args.prefix)
        .and_then(|namer| namer.name(&args.kind, &args.ext, &args.revision, date))
        .context("cannot build snapshot name")?;
    let writer = to_writer(args.format, content)?;
    let dir = args.dir.clone().unwrap_or_else(|| folder.root().to_path_buf());

    tracing::info!(name = %name, writer = writer.label(), "saving snapshot");
    folder
        .save_snapshot(&dir, &name, &writer, &args.source)
        .with_context(|| format!("failed to save {}", name.file_name()))
}

fn read_input(args: &SaveArgs) -> Result<Vec<u8>> {
    match &args.input {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn to_writer(format: InputFormat, content: Vec<u8>) -> Result<ArtifactWriter> {
    Ok(match format {
        InputFormat::Text => {
            ArtifactWriter::Text(String::from_utf8(content).context("input is not valid UTF-8")?)
        }
        InputFormat::Bytes => ArtifactWriter::Bytes(content),
        InputFormat::Json => {
            ArtifactWriter::Json(serde_json::from_slice(&content).context("input is not valid JSON")?)
        }
        InputFormat::Yaml => {
            ArtifactWriter::Yaml(serde_yaml::from_slice(&content).context("input is not valid YAML")?)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use snapvault_core::FixedClock;
    use snapvault_store::NoopObserver;

    fn args(format: InputFormat) -> SaveArgs {
        SaveArgs {
            prefix: "helm_models".into(),
            kind: "raw".into(),
            ext: "yaml".into(),
            revision: "abc1234".into(),
            date: Some("2024-01-15".into()),
            source: "src/data/helm_models.py--abc1234".into(),
            input: None,
            format,
            dir: None,
        }
    }

    #[cfg(unix)]
    fn unlock(path: &std::path::Path) {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755));
        if path.is_dir() {
            for entry in std::fs::read_dir(path).unwrap().flatten() {
                unlock(&entry.path());
            }
        }
    }

    #[cfg(unix)]
    #[test]
    fn saves_named_snapshot() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("raw");
        let folder = ProtectedFolder::new(&root)
            .with_observer(Arc::new(NoopObserver))
            .with_clock(Arc::new(FixedClock(CaptureDate::parse("2024-01-15").unwrap())));

        let receipt = save_with(&args(InputFormat::Yaml), &folder, b"models: []\n".to_vec()).unwrap();
        assert_eq!(
            receipt.artifact,
            root.join("helm_models_raw_2024-01-15_abc1234.yaml")
        );
        assert_eq!(receipt.entry.source, "src/data/helm_models.py--abc1234");
        unlock(&root);
    }

    #[test]
    fn rejects_bad_date_before_touching_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("raw");
        let folder = ProtectedFolder::new(&root).with_observer(Arc::new(NoopObserver));
        let mut a = args(InputFormat::Text);
        a.date = Some("15/01/2024".into());
        let err = save_with(&a, &folder, b"x".to_vec()).unwrap_err();
        assert!(format!("{err:#}").contains("--date"));
        assert!(!root.exists());
    }

    #[test]
    fn converts_formats() {
        assert!(matches!(
            to_writer(InputFormat::Json, br#"{"a": 1}"#.to_vec()).unwrap(),
            ArtifactWriter::Json(_)
        ));
        assert!(to_writer(InputFormat::Json, b"{".to_vec()).is_err());
        assert!(to_writer(InputFormat::Text, vec![0xff, 0xfe]).is_err());
        assert!(matches!(
            to_writer(InputFormat::Bytes, vec![0xff]).unwrap(),
            ArtifactWriter::Bytes(_)
        ));
    }
}
