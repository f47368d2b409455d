mod cli;
mod generator;
mod server;
mod telemetry;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use crate::cli::Args;
use crate::server::{AppState, Credentials, Server};
use crate::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let args = Args::parse();

    init_telemetry(&args)?;

    info!("Starting Datadog API simulator");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let result = run(args).await;

    if let Err(ref e) = result {
        error!("Simulator error: {:#}", e);
    }

    info!("Simulator shutdown complete");

    result
}

async fn run(args: Args) -> Result<()> {
    args.validate().context("Invalid command line arguments")?;

    let state = AppState::new(Credentials {
        api_key: args.api_key.clone(),
        application_key: args.application_key.clone(),
    });

    info!("Endpoints: GET /health, GET /api/v1/validate, GET /api/v1/query");

    Server::new(args, state)?.run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert()
    }

    #[test]
    fn test_default_credentials_are_valid() {
        let args = Args::parse_from(["datadog-simulator"]);
        assert!(args.validate().is_ok());
    }
}
