//! Datadog data source CLI
//!
//! Runs metric queries and credential checks through the same code path the
//! data source backend uses.

mod commands;
mod config;
mod output;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::commands::query::QueryArgs;
use crate::config::CliConfig;
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "datadog",
    version,
    about = "Query Datadog metrics through the data source backend",
    long_about = "Query Datadog metrics through the data source backend.\n\n\
                  Credentials are read from --config, then DD_URL, DD_API_KEY and\n\
                  DD_APPLICATION_KEY, then the flags below."
)]
struct Cli {
    /// Datadog API URL (defaults to the public API origin)
    #[arg(short, long)]
    url: Option<String>,

    /// Datadog API key
    #[arg(short = 'k', long)]
    api_key: Option<String>,

    /// Datadog application key
    #[arg(short = 'a', long)]
    application_key: Option<String>,

    /// Configuration file (toml, yaml or json)
    #[arg(short, long, env = "DD_CONFIG")]
    config: Option<PathBuf>,

    /// Output format (text, json, yaml; "plain" and "yml" are accepted aliases)
    #[arg(
        short,
        long,
        default_value = "text",
        value_parser = ["text", "plain", "json", "yaml", "yml"]
    )]
    format: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a metrics query
    Query {
        /// Datadog metrics expression, e.g. "avg:system.cpu.user{*} by {host}"
        expression: String,

        /// Range start (RFC 3339)
        #[arg(long, value_parser = parse_time)]
        from: Option<DateTime<Utc>>,

        /// Range end (RFC 3339, defaults to now)
        #[arg(long, value_parser = parse_time)]
        to: Option<DateTime<Utc>>,

        /// Range length in minutes when --from is not given
        #[arg(short, long, default_value = "60")]
        last: i64,

        /// Print every data point
        #[arg(short, long)]
        points: bool,
    },

    /// Check API connectivity and credentials
    Health,
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 timestamp {:?}: {}", raw, e))
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    init_logging(cli.verbose);

    let result = run(&cli).await;

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            if cli.verbose {
                if let Some(source) = e.source() {
                    eprintln!("{}: {}", "Caused by".yellow(), source);
                }
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let format: OutputFormat = cli.format.parse().map_err(anyhow::Error::msg)?;
    let settings = CliConfig::load(cli.config.as_deref())?
        .with_overrides(
            cli.url.clone(),
            cli.api_key.clone(),
            cli.application_key.clone(),
        )
        .into_settings();

    match &cli.command {
        Commands::Query {
            expression,
            from,
            to,
            last,
            points,
        } => {
            let args = QueryArgs {
                expression: expression.clone(),
                from: *from,
                to: *to,
                last_minutes: *last,
                show_points: *points,
            };
            commands::query::run(settings, args, format).await
        }
        Commands::Health => commands::health::run(settings, format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert()
    }

    #[test]
    fn test_parse_time() {
        let t = parse_time("2025-12-02T06:00:00+01:00").unwrap();
        assert_eq!(t.timestamp(), 1_764_651_600);
        assert!(parse_time("yesterday").is_err());
    }

    #[test]
    fn test_format_aliases_are_accepted() {
        for (alias, expected) in [("plain", OutputFormat::Text), ("yml", OutputFormat::Yaml)] {
            let cli = Cli::parse_from(["datadog", "--format", alias, "health"]);
            assert_eq!(cli.format.parse::<OutputFormat>(), Ok(expected));
        }
        assert!(Cli::try_parse_from(["datadog", "--format", "xml", "health"]).is_err());
    }

    #[test]
    fn test_query_args() {
        let cli = Cli::parse_from([
            "datadog",
            "--format",
            "json",
            "query",
            "avg:cpu{*}",
            "--last",
            "15",
        ]);
        match cli.command {
            Commands::Query { expression, last, from, .. } => {
                assert_eq!(expression, "avg:cpu{*}");
                assert_eq!(last, 15);
                assert!(from.is_none());
            }
            Commands::Health => panic!("expected query command"),
        }
    }
}
