//! Command-line argument parsing

use clap::Parser;

/// Credentials accepted when none are configured
pub const DEFAULT_API_KEY: &str = "f22e8e0c4fcab646939943357ca7c201";
pub const DEFAULT_APPLICATION_KEY: &str = "5469722d1b56bc1e652698267eb979c10b7f7216";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "datadog-simulator",
    about = "Datadog metrics API simulator",
    version,
    long_about = "Serves /api/v1/query and /api/v1/validate with generated data \
                  so the data source can be exercised without a Datadog account."
)]
pub struct Args {
    /// Address to bind
    #[arg(long, env = "SIMULATOR_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// HTTP server port
    #[arg(short, long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// API key clients must send in DD-API-KEY
    #[arg(long, env = "SIMULATOR_API_KEY", default_value = DEFAULT_API_KEY)]
    pub api_key: String,

    /// Application key clients must send in DD-APPLICATION-KEY
    #[arg(long, env = "SIMULATOR_APPLICATION_KEY", default_value = DEFAULT_APPLICATION_KEY)]
    pub application_key: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        short,
        long,
        env = "LOG_LEVEL",
        default_value = "info",
        value_parser = ["trace", "debug", "info", "warn", "error"]
    )]
    pub log_level: String,

    /// Enable JSON log format
    #[arg(long, env = "JSON_LOGS")]
    pub json_logs: bool,
}

impl Args {
    /// Validate the arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_key.is_empty() || self.application_key.is_empty() {
            anyhow::bail!("API key and application key must not be empty");
        }
        Ok(())
    }
}
