//! # Datadog Datasource
//!
//! Backend for a Datadog metrics data source. Queries coming from the
//! visualization host are forwarded to the Datadog `/api/v1/query`
//! endpoint and the returned series are reshaped into time/value frames.
//! A health check validates the configured credentials.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chrono::{Duration, Utc};
//! use datadog_datasource::{DataQuery, Datasource, DatasourceSettings, PluginContext, TimeRange};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = DatasourceSettings::new("https://api.us3.datadoghq.com", "api-key", "app-key");
//!     let datasource = Datasource::new(settings)?;
//!
//!     let now = Utc::now();
//!     let query = DataQuery::new(
//!         "A",
//!         TimeRange::new(now - Duration::hours(1), now),
//!         json!({ "query": "avg:system.cpu.user{*} by {host}" }),
//!     );
//!
//!     for frame in datasource.execute(&PluginContext::default(), &query).await? {
//!         println!("{} rows", frame.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

mod client;
mod data;
mod datasource;
mod error;
mod models;
mod settings;

pub use client::{
    DatadogClient, API_KEY_HEADER, APPLICATION_KEY_HEADER, QUERY_TIMEOUT, VALIDATE_TIMEOUT,
};
pub use data::*;
pub use datasource::{CheckHealthHandler, Datasource, InstanceDisposer, QueryDataHandler};
pub use error::{DatasourceError, ErrorKind, Result};
pub use models::*;
pub use settings::{
    DataSourceInstanceSettings, DatasourceOptions, DatasourceSettings, API_KEY, APPLICATION_KEY,
    DEFAULT_API_URL,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
