//! Query payload and Datadog wire types

use crate::data::{Field, Frame};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Query payload produced by the query editor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryModel {
    /// Datadog metrics expression, passed through verbatim
    #[serde(default, deserialize_with = "null_as_default")]
    pub query: String,
}

/// Body of `GET /api/v1/query`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatadogResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub series: Vec<DatadogSeries>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub error_type: String,
    #[serde(default, rename = "error", deserialize_with = "null_as_default")]
    pub error_detail: String,
}

impl DatadogResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    /// Failure reason reported by the API, preferring the detailed `error` field
    pub fn error_message(&self) -> &str {
        if self.error_detail.is_empty() {
            &self.message
        } else {
            &self.error_detail
        }
    }
}

/// One series of a query result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatadogSeries {
    #[serde(default, deserialize_with = "null_as_default")]
    pub metric: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tag_set: Vec<String>,
    /// `[timestamp_ms, value, ...]` entries, either of which may be null
    #[serde(default, deserialize_with = "null_as_default")]
    pub pointlist: Vec<Vec<Option<f64>>>,
    /// Dimensional tags identifying the series, e.g. `host:a,instance:0`
    #[serde(default, deserialize_with = "null_as_default")]
    pub scope: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub expression: String,
}

impl DatadogSeries {
    /// Convert to a `[time, <scope>]` frame, skipping incomplete points
    pub fn to_frame(&self) -> Frame {
        let (times, values): (Vec<_>, Vec<_>) =
            self.pointlist.iter().filter_map(|p| to_row(p)).unzip();

        Frame::new("")
            .with_field(Field::time("time", times))
            .with_field(Field::float64(self.scope.clone(), values))
    }
}

fn to_row(point: &[Option<f64>]) -> Option<(DateTime<Utc>, f64)> {
    match point {
        [Some(timestamp_ms), Some(value), ..] => {
            let time = DateTime::from_timestamp_millis(timestamp_ms.trunc() as i64)?;
            Some((time, *value))
        }
        _ => None,
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
