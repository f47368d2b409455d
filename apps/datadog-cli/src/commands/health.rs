//! Health check command

use anyhow::{bail, Result};
use datadog_datasource::{CheckHealthHandler, CheckHealthRequest, Datasource, DatasourceSettings};

use crate::output::{self, OutputFormat};

pub async fn run(settings: DatasourceSettings, format: OutputFormat) -> Result<()> {
    let datasource = Datasource::new(settings)?;
    let result = datasource
        .check_health(&CheckHealthRequest::default())
        .await;

    match output::format_structured(&result, format)? {
        Some(rendered) => println!("{}", rendered),
        None => {
            output::key_value("Endpoint", datasource.settings().base_url());
            if result.is_ok() {
                output::success(&result.message);
            } else {
                output::error(&result.message);
            }
        }
    }

    if !result.is_ok() {
        bail!("health check failed: {}", result.message);
    }
    Ok(())
}
