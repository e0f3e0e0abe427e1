//! # snapvault CLI entry point
//!
//! Parses command-line arguments, installs the log subscriber, resolves the
//! store configuration, and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use snapvault_cli::check::{run_check, CheckArgs};
use snapvault_cli::resolve_config;
use snapvault_cli::save::{run_save, SaveArgs};
use snapvault_cli::snapshot::{run_latest, run_name, run_parse, LatestArgs, NameArgs, ParseArgs};
use snapvault_cli::verify::{run_verify, VerifyArgs};

/// Protected snapshot store.
///
/// Saves captured artifacts read-only with an append-only audit log per
/// directory, and checks that nothing has changed since.
#[derive(Parser, Debug)]
#[command(name = "snapvault", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit log events as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    /// Store root. Overrides SNAPVAULT_ROOT.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Audit log file name. Overrides SNAPVAULT_LOG_NAME.
    #[arg(long, global = true)]
    log_name: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write content as a named, logged, read-only snapshot.
    Save(SaveArgs),

    /// Recompute digests for every artifact in a directory's audit log.
    Verify(VerifyArgs),

    /// Report nodes outside their locked regime; optionally repair them.
    Check(CheckArgs),

    /// Print the snapshot name for the given fields.
    Name(NameArgs),

    /// Print the fields of a snapshot name.
    Parse(ParseArgs),

    /// Print the newest (or oldest) snapshot of a dataset.
    Latest(LatestArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let result = resolve_config(cli.root, cli.log_name).and_then(|config| {
        tracing::debug!(
            root = %config.root.display(),
            log_name = %config.log_name,
            "resolved store configuration"
        );
        match cli.command {
            Commands::Save(args) => run_save(&args, &config),
            Commands::Verify(args) => run_verify(&args, &config),
            Commands::Check(args) => run_check(&args, &config),
            Commands::Name(args) => run_name(&args),
            Commands::Parse(args) => run_parse(&args),
            Commands::Latest(args) => run_latest(&args, &config),
        }
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parse_save() {
        let cli = Cli::try_parse_from([
            "snapvault",
            "save",
            "--prefix",
            "helm_models",
            "--kind",
            "raw",
            "--ext",
            "yaml",
            "--revision",
            "abc1234",
            "--source",
            "src/data/helm_models.py--abc1234",
            "--format",
            "yaml",
        ])
        .unwrap();
        match cli.command {
            Commands::Save(args) => {
                assert_eq!(args.prefix, "helm_models");
                assert_eq!(args.revision, "abc1234");
                assert_eq!(args.format, snapvault_cli::save::InputFormat::Yaml);
                assert!(args.input.is_none());
            }
            other => panic!("expected save, got {other:?}"),
        }
    }

    #[test]
    fn cli_parse_save_requires_source() {
        let result = Cli::try_parse_from([
            "snapvault", "save", "--prefix", "p", "--kind", "raw", "--ext", "yaml",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "snapvault",
            "check",
            "--repair",
            "--root",
            "data/01_raw",
            "--log-name",
            "raw_data_log.json",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("data/01_raw")));
        assert_eq!(cli.log_name.as_deref(), Some("raw_data_log.json"));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Check(CheckArgs { repair: true })));
    }

    #[test]
    fn cli_parse_latest_oldest() {
        let cli = Cli::try_parse_from([
            "snapvault", "latest", "--prefix", "scale_leaderboard", "--ext", "pickle", "--oldest",
        ])
        .unwrap();
        match cli.command {
            Commands::Latest(args) => assert!(args.oldest),
            other => panic!("expected latest, got {other:?}"),
        }
    }

    #[test]
    fn cli_parse_parse_positional() {
        let cli = Cli::try_parse_from([
            "snapvault",
            "parse",
            "scale_leaderboard_intermediate_2024-03-01.parquet",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Parse(_)));
    }

    #[test]
    fn cli_parse_no_subcommand_errors() {
        assert!(Cli::try_parse_from(["snapvault"]).is_err());
    }
}
