//! CLI configuration management
//!
//! Settings are layered: optional config file, then `DD_*` environment
//! variables, then command-line flags.

use config::{Config, Environment, File};
use datadog_datasource::DatasourceSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix, e.g. `DD_API_KEY`
pub const ENV_PREFIX: &str = "DD";

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CliConfig {
    /// Datadog API URL
    pub url: Option<String>,
    /// Datadog API key
    pub api_key: Option<String>,
    /// Datadog application key
    pub application_key: Option<String>,
}

impl CliConfig {
    /// Load from an optional file with environment overrides
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    pub fn load_with_prefix(path: Option<&Path>, prefix: &str) -> anyhow::Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(Environment::with_prefix(prefix));

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Merge with command line options
    pub fn with_overrides(
        mut self,
        url: Option<String>,
        api_key: Option<String>,
        application_key: Option<String>,
    ) -> Self {
        self.url = url.or(self.url);
        self.api_key = api_key.or(self.api_key);
        self.application_key = application_key.or(self.application_key);
        self
    }

    /// Resolve into data source settings; unset values become empty
    pub fn into_settings(self) -> DatasourceSettings {
        DatasourceSettings::new(
            self.url.unwrap_or_default(),
            self.api_key.unwrap_or_default(),
            self.application_key.unwrap_or_default(),
        )
    }
}
