use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;

mod commands;
mod config;

use commands::{ClassifyArgs, InterbankArgs};

/// Categorise bank statement transactions and find interbank transfers.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file; `./tally.toml` is used when present
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    /// -v for debug output, -vv for per-row tracing
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Label every row of a statement from a keyword rule table
    Classify(ClassifyArgs),
    /// Match debits and credits across statements
    Interbank(InterbankArgs),
}

fn log_filter(verbose: u8) -> String {
    match verbose {
        0 => std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        1 => "debug".into(),
        _ => "trace".into(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(log_filter(cli.verbose)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = config::load_config(cli.config.as_deref())?;

    match &cli.command {
        Commands::Classify(args) => {
            commands::classify(&config, args)?;
        }
        Commands::Interbank(args) => {
            commands::interbank(&config, args)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_import::MatchMode;

    #[test]
    fn parses_interbank_flags() {
        let cli = Cli::parse_from([
            "tally", "-v", "interbank", "a.csv", "b.xlsx", "--mode", "grouped", "--strict",
        ]);
        assert_eq!(cli.verbose, 1);
        let Commands::Interbank(args) = cli.command else {
            panic!("expected interbank");
        };
        assert_eq!(args.inputs.len(), 2);
        assert_eq!(args.mode, Some(MatchMode::Grouped));
        assert!(args.strict);
    }

    #[test]
    fn parses_classify_with_global_config_after_subcommand() {
        let cli = Cli::parse_from([
            "tally", "classify", "s.csv", "--format", "json", "--config", "x.toml",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        let Commands::Classify(args) = cli.command else {
            panic!("expected classify");
        };
        assert_eq!(args.format, commands::OutputFormat::Json);
        assert!(args.rules.is_none());
    }

    #[test]
    fn interbank_needs_inputs() {
        assert!(Cli::try_parse_from(["tally", "interbank"]).is_err());
    }

    #[test]
    fn verbosity_overrides_env() {
        assert_eq!(log_filter(1), "debug");
        assert_eq!(log_filter(3), "trace");
    }
}
