//! Instance configuration
//!
//! The host stores a loosely typed JSON blob plus a map of decrypted
//! secrets per data source instance. Both are resolved once into an
//! immutable [`DatasourceSettings`] when the instance is created.

use crate::error::{DatasourceError, Result};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

/// Public Datadog API origin used when no URL is configured
pub const DEFAULT_API_URL: &str = "https://api.datadoghq.com/";

/// Secret map key holding the API key
pub const API_KEY: &str = "apiKey";

/// Secret map key holding the application key
pub const APPLICATION_KEY: &str = "applicationKey";

/// Settings envelope handed over by the host
#[derive(Debug, Clone, Default)]
pub struct DataSourceInstanceSettings {
    pub uid: String,
    pub name: String,
    /// Raw non-secret configuration
    pub json_data: Vec<u8>,
    pub decrypted_secure_json_data: HashMap<String, String>,
}

/// Non-secret options stored in `json_data`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatasourceOptions {
    /// A non-string value is treated as unset
    #[serde(default, deserialize_with = "string_or_none")]
    pub url: Option<String>,
}

impl DatasourceOptions {
    /// Parse the raw blob. Empty input and JSON `null` mean no options.
    pub fn from_json(raw: &[u8]) -> Result<Self> {
        // Deliberately lenient: an empty blob is not a JSON document, but an
        // instance saved without options carries one, so it resolves to defaults.
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        let map: Option<serde_json::Map<String, serde_json::Value>> = serde_json::from_slice(raw)
            .map_err(|e| DatasourceError::Config(format!("error unmarshaling JSONData: {}", e)))?;

        match map {
            Some(map) => serde_json::from_value(serde_json::Value::Object(map))
                .map_err(|e| DatasourceError::Config(format!("error unmarshaling JSONData: {}", e))),
            None => Ok(Self::default()),
        }
    }
}

fn string_or_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        _ => Ok(None),
    }
}

/// Resolved, read-only instance context
#[derive(Clone)]
pub struct DatasourceSettings {
    base_url: String,
    api_key: Secret<String>,
    application_key: Secret<String>,
}

impl std::fmt::Debug for DatasourceSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasourceSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("application_key", &"[REDACTED]")
            .finish()
    }
}

impl DatasourceSettings {
    /// Build settings directly. An empty `base_url` selects [`DEFAULT_API_URL`].
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        application_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            api_key: Secret::new(api_key.into()),
            application_key: Secret::new(application_key.into()),
        }
    }

    /// Resolve settings from the host envelope
    pub fn from_instance_settings(settings: &DataSourceInstanceSettings) -> Result<Self> {
        let options = DatasourceOptions::from_json(&settings.json_data)?;
        let secret = |key: &str| {
            settings
                .decrypted_secure_json_data
                .get(key)
                .cloned()
                .unwrap_or_default()
        };

        Ok(Self::new(
            options.url.unwrap_or_default(),
            secret(API_KEY),
            secret(APPLICATION_KEY),
        ))
    }

    /// Base URL, always ending with `/`
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    pub fn application_key(&self) -> &str {
        self.application_key.expose_secret()
    }
}

fn normalize_base_url(url: String) -> String {
    let mut url = if url.is_empty() {
        DEFAULT_API_URL.to_string()
    } else {
        url
    };
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(json: &str, secrets: &[(&str, &str)]) -> DataSourceInstanceSettings {
        DataSourceInstanceSettings {
            json_data: json.as_bytes().to_vec(),
            decrypted_secure_json_data: secrets
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_url_when_missing() {
        let settings = DatasourceSettings::from_instance_settings(&instance("{}", &[])).unwrap();
        assert_eq!(settings.base_url(), DEFAULT_API_URL);
        assert_eq!(settings.api_key(), "");
        assert_eq!(settings.application_key(), "");
    }

    #[test]
    fn test_default_url_when_empty_or_not_a_string() {
        for json in [r#"{"url":""}"#, r#"{"url":null}"#, r#"{"url":42}"#, "null", ""] {
            let settings = DatasourceSettings::from_instance_settings(&instance(json, &[])).unwrap();
            assert_eq!(settings.base_url(), DEFAULT_API_URL, "json_data {:?}", json);
        }
    }

    #[test]
    fn test_url_gets_trailing_slash() {
        let settings = DatasourceSettings::from_instance_settings(&instance(
            r#"{"url":"https://api.us3.datadoghq.com"}"#,
            &[(API_KEY, "k"), (APPLICATION_KEY, "a")],
        ))
        .unwrap();
        assert_eq!(settings.base_url(), "https://api.us3.datadoghq.com/");
        assert_eq!(settings.api_key(), "k");
        assert_eq!(settings.application_key(), "a");

        let settings = DatasourceSettings::new("http://localhost:5000/", "", "");
        assert_eq!(settings.base_url(), "http://localhost:5000/");
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        for json in ["{not json", "[1, 2]", r#""a string""#] {
            let err = DatasourceSettings::from_instance_settings(&instance(json, &[])).unwrap_err();
            assert!(matches!(err, DatasourceError::Config(_)), "json_data {:?}", json);
        }
    }

    #[test]
    fn test_debug_redacts_keys() {
        let settings = DatasourceSettings::new("", "super-secret", "also-secret");
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("also-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
