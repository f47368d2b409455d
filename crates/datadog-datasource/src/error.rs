//! Error types for the Datadog data source

use crate::data::DataResponseStatus;
use thiserror::Error;

/// Result type alias for data source operations
pub type Result<T> = std::result::Result<T, DatasourceError>;

/// Coarse classification reported back to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing query input
    BadRequest,
    /// Transport, remote API or response shape failure
    Internal,
    /// Malformed instance configuration
    Config,
}

/// Errors that can occur while serving a query or a health check
#[derive(Error, Debug)]
pub enum DatasourceError {
    /// Query payload could not be decoded
    #[error("json unmarshal: {0}")]
    InvalidQuery(#[source] serde_json::Error),

    /// Query payload carried no expression
    #[error("query is required")]
    MissingQuery,

    /// Outbound URL could not be built
    #[error("error creating request: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Outbound request could not be built
    #[error("error creating request: {0}")]
    Request(#[source] reqwest::Error),

    /// The call to the remote API did not complete
    #[error("error executing request: {0}")]
    Transport(#[source] reqwest::Error),

    /// The response body could not be read
    #[error("error reading response: {0}")]
    ReadBody(#[source] reqwest::Error),

    /// Remote API answered with a non-200 status
    #[error("Datadog API error (status {status}): {body}")]
    Api { status: u16, body: String },

    /// Response body did not match the expected shape
    #[error("error parsing response: {0}")]
    Parse(#[source] serde_json::Error),

    /// Remote API reported a failed query
    #[error("Datadog query error: {message}")]
    Query { message: String },

    /// The caller cancelled the operation
    #[error("request cancelled")]
    Cancelled,

    /// Invalid instance configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl DatasourceError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            DatasourceError::InvalidQuery(_) | DatasourceError::MissingQuery => {
                ErrorKind::BadRequest
            }
            DatasourceError::Config(_) => ErrorKind::Config,
            _ => ErrorKind::Internal,
        }
    }

    /// Status to report in a per-query response slot
    pub fn status(&self) -> DataResponseStatus {
        match self.kind() {
            ErrorKind::BadRequest => DataResponseStatus::BadRequest,
            ErrorKind::Internal | ErrorKind::Config => DataResponseStatus::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(DatasourceError::MissingQuery.kind(), ErrorKind::BadRequest);
        assert_eq!(DatasourceError::Cancelled.kind(), ErrorKind::Internal);
        assert_eq!(
            DatasourceError::Config("bad".to_string()).kind(),
            ErrorKind::Config
        );

        let err = DatasourceError::Api {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.status(), DataResponseStatus::Internal);
    }

    #[test]
    fn test_messages() {
        let err = DatasourceError::Api {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "Datadog API error (status 502): bad gateway");

        let err = DatasourceError::Query {
            message: "unknown metric".to_string(),
        };
        assert_eq!(err.to_string(), "Datadog query error: unknown metric");

        assert_eq!(DatasourceError::MissingQuery.to_string(), "query is required");
    }

    #[test]
    fn test_invalid_query_is_bad_request() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = DatasourceError::InvalidQuery(source);
        assert_eq!(err.status(), DataResponseStatus::BadRequest);
        assert!(err.to_string().starts_with("json unmarshal: "));
    }
}
