//! Host-facing request and response types
//!
//! These mirror the envelopes the visualization host hands to a backend
//! data source: a batch of queries in, one response slot per query out,
//! each holding zero or more frames of columns.

use crate::error::DatasourceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Details of the plugin instance a request originates from
#[derive(Debug, Clone, Default)]
pub struct PluginContext {
    pub org_id: i64,
    pub plugin_id: String,
    /// Fires when the host abandons the request
    pub cancellation: CancellationToken,
}

impl PluginContext {
    pub fn new(org_id: i64, plugin_id: impl Into<String>) -> Self {
        Self {
            org_id,
            plugin_id: plugin_id.into(),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

/// Start and end of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Bounds as whole-second Unix timestamps
    pub fn unix_seconds(&self) -> (i64, i64) {
        (self.from.timestamp(), self.to.timestamp())
    }
}

/// A single query within a [`QueryDataRequest`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataQuery {
    /// Identifier the host uses to line responses up with queries
    pub ref_id: String,
    #[serde(default)]
    pub query_type: String,
    pub time_range: TimeRange,
    /// Raw query payload set by the query editor
    #[serde(default)]
    pub json: serde_json::Value,
}

impl DataQuery {
    pub fn new(ref_id: impl Into<String>, time_range: TimeRange, json: serde_json::Value) -> Self {
        Self {
            ref_id: ref_id.into(),
            query_type: String::new(),
            time_range,
            json,
        }
    }
}

/// A batch of queries from the host
#[derive(Debug, Clone, Default)]
pub struct QueryDataRequest {
    pub plugin_context: PluginContext,
    pub queries: Vec<DataQuery>,
}

/// Responses keyed by query `ref_id`
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryDataResponse {
    pub responses: HashMap<String, DataResponse>,
}

/// Outcome of one query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataResponseStatus {
    Ok,
    BadRequest,
    Internal,
}

impl DataResponseStatus {
    /// HTTP-equivalent status code
    pub fn code(&self) -> u16 {
        match self {
            DataResponseStatus::Ok => 200,
            DataResponseStatus::BadRequest => 400,
            DataResponseStatus::Internal => 500,
        }
    }
}

/// Frames produced for one query, or the error that prevented them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataResponse {
    #[serde(default)]
    pub frames: Vec<Frame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: DataResponseStatus,
}

impl DataResponse {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            error: None,
            status: DataResponseStatus::Ok,
        }
    }

    pub fn error(status: DataResponseStatus, message: impl Into<String>) -> Self {
        Self {
            frames: Vec::new(),
            error: Some(message.into()),
            status,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl From<DatasourceError> for DataResponse {
    fn from(err: DatasourceError) -> Self {
        DataResponse::error(err.status(), err.to_string())
    }
}

/// Column values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum FieldValues {
    Time(Vec<DateTime<Utc>>),
    Float64(Vec<f64>),
}

impl FieldValues {
    pub fn len(&self) -> usize {
        match self {
            FieldValues::Time(v) => v.len(),
            FieldValues::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub values: FieldValues,
}

impl Field {
    pub fn time(name: impl Into<String>, values: Vec<DateTime<Utc>>) -> Self {
        Self {
            name: name.into(),
            values: FieldValues::Time(values),
        }
    }

    pub fn float64(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values: FieldValues::Float64(values),
        }
    }
}

/// A table of equally long columns
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    pub name: String,
    pub fields: Vec<Field>,
}

impl Frame {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.fields.first().map(|f| f.values.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Health check invocation
#[derive(Debug, Clone, Default)]
pub struct CheckHealthRequest {
    pub plugin_context: PluginContext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Error,
}

/// Result shown on the data source configuration page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckHealthResult {
    pub status: HealthStatus,
    pub message: String,
}

impl CheckHealthResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Ok,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Error,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == HealthStatus::Ok
    }
}
