//! Datadog API client implementation

use crate::error::{DatasourceError, Result};
use crate::models::DatadogResponse;
use crate::settings::DatasourceSettings;
use reqwest::{header, Client, Request, Response, StatusCode};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "DD-API-KEY";

/// Header carrying the application key
pub const APPLICATION_KEY_HEADER: &str = "DD-APPLICATION-KEY";

/// Timeout for metric queries
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for credential validation
pub const VALIDATE_TIMEOUT: Duration = Duration::from_secs(10);

const QUERY_PATH: &str = "api/v1/query";
const VALIDATE_PATH: &str = "api/v1/validate";

/// Thin client over the two Datadog endpoints the data source uses
#[derive(Clone)]
pub struct DatadogClient {
    http: Client,
    settings: DatasourceSettings,
}

impl std::fmt::Debug for DatadogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatadogClient")
            .field("settings", &self.settings)
            .finish()
    }
}

impl DatadogClient {
    /// Create a client sharing one connection pool for all calls
    pub fn new(settings: DatasourceSettings) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let http = Client::builder()
            .user_agent(format!("datadog-datasource/{}", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| DatasourceError::Config(format!("error creating HTTP client: {}", e)))?;

        Ok(Self { http, settings })
    }

    pub fn settings(&self) -> &DatasourceSettings {
        &self.settings
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&format!("{}{}", self.settings.base_url(), path))?)
    }

    /// URL of a metrics query over `[from, to]` (Unix seconds)
    pub fn query_url(&self, expression: &str, from: i64, to: i64) -> Result<Url> {
        let mut url = self.endpoint(QUERY_PATH)?;
        url.query_pairs_mut()
            .append_pair("from", &from.to_string())
            .append_pair("to", &to.to_string())
            .append_pair("query", expression);
        Ok(url)
    }

    pub fn validate_url(&self) -> Result<Url> {
        self.endpoint(VALIDATE_PATH)
    }

    fn authenticated_get(&self, url: Url, timeout: Duration) -> Result<Request> {
        self.http
            .get(url)
            .header(API_KEY_HEADER, self.settings.api_key())
            .header(APPLICATION_KEY_HEADER, self.settings.application_key())
            .timeout(timeout)
            .build()
            .map_err(DatasourceError::Request)
    }

    fn query_request(&self, expression: &str, from: i64, to: i64) -> Result<Request> {
        let url = self.query_url(expression, from, to)?;
        debug!(url = %url, "Querying Datadog");
        self.authenticated_get(url, QUERY_TIMEOUT)
    }

    fn validate_request(&self) -> Result<Request> {
        let url = self.validate_url()?;
        debug!(url = %url, "Validating Datadog credentials");
        self.authenticated_get(url, VALIDATE_TIMEOUT)
    }

    async fn execute(&self, request: Request) -> Result<Response> {
        self.http
            .execute(request)
            .await
            .map_err(DatasourceError::Transport)
    }

    /// Run a metrics query and return the decoded body.
    ///
    /// Fails on transport errors, non-200 statuses, undecodable bodies and
    /// bodies whose `status` is not `"ok"`.
    pub async fn query(
        &self,
        cancel: &CancellationToken,
        expression: &str,
        from: i64,
        to: i64,
    ) -> Result<DatadogResponse> {
        let request = self.query_request(expression, from, to)?;

        let body = cancellable(cancel, async {
            let response = self.execute(request).await?;
            let status = response.status();
            let body = response.text().await.map_err(DatasourceError::ReadBody)?;
            if status != StatusCode::OK {
                return Err(DatasourceError::Api {
                    status: status.as_u16(),
                    body,
                });
            }
            Ok(body)
        })
        .await?;

        let response: DatadogResponse =
            serde_json::from_str(&body).map_err(DatasourceError::Parse)?;

        if !response.is_ok() {
            return Err(DatasourceError::Query {
                message: response.error_message().to_string(),
            });
        }

        Ok(response)
    }

    /// Call the credential validation endpoint and return its status code
    pub async fn validate(&self, cancel: &CancellationToken) -> Result<StatusCode> {
        let request = self.validate_request()?;

        let response = cancellable(cancel, self.execute(request)).await?;
        Ok(response.status())
    }
}

/// Drive `fut` to completion unless `cancel` fires first, in which case the
/// in-flight future is dropped.
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DatasourceError::Cancelled),
        result = fut => result,
    }
}
