//! Datasource instance: query execution and health checks

use crate::client::DatadogClient;
use crate::data::{
    CheckHealthRequest, CheckHealthResult, DataQuery, DataResponse, Frame, PluginContext,
    QueryDataRequest, QueryDataResponse,
};
use crate::error::{DatasourceError, Result};
use crate::models::QueryModel;
use crate::settings::{DataSourceInstanceSettings, DatasourceSettings};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

/// Handles batches of data queries from the host
#[async_trait]
pub trait QueryDataHandler: Send + Sync {
    /// Answer every query in the batch. A failing query only affects its own slot.
    async fn query_data(&self, request: QueryDataRequest) -> QueryDataResponse;
}

/// Handles the "test" action of the data source configuration page
#[async_trait]
pub trait CheckHealthHandler: Send + Sync {
    async fn check_health(&self, request: &CheckHealthRequest) -> CheckHealthResult;
}

/// Called by the host when an instance is replaced after a settings change
pub trait InstanceDisposer {
    fn dispose(&self);
}

/// A configured Datadog data source instance
#[derive(Debug, Clone)]
pub struct Datasource {
    client: DatadogClient,
}

impl Datasource {
    pub fn new(settings: DatasourceSettings) -> Result<Self> {
        Ok(Self {
            client: DatadogClient::new(settings)?,
        })
    }

    /// Instance factory invoked by the host with stored settings
    pub fn from_instance_settings(settings: &DataSourceInstanceSettings) -> Result<Self> {
        Self::new(DatasourceSettings::from_instance_settings(settings)?)
    }

    pub fn settings(&self) -> &DatasourceSettings {
        self.client.settings()
    }

    /// Execute one query, returning one frame per Datadog series
    #[instrument(skip(self, ctx, query), fields(ref_id = %query.ref_id))]
    pub async fn execute(&self, ctx: &PluginContext, query: &DataQuery) -> Result<Vec<Frame>> {
        let model = QueryModel::deserialize(&query.json).map_err(DatasourceError::InvalidQuery)?;
        if model.query.is_empty() {
            return Err(DatasourceError::MissingQuery);
        }

        let (from, to) = query.time_range.unix_seconds();
        let response = self
            .client
            .query(&ctx.cancellation, &model.query, from, to)
            .await?;

        let frames: Vec<Frame> = response.series.iter().map(|s| s.to_frame()).collect();

        if frames.iter().all(Frame::is_empty) {
            warn!(query = %model.query, series = frames.len(), "No series returned from Datadog");
        } else {
            debug!(series = frames.len(), "Converted Datadog series to frames");
        }

        Ok(frames)
    }

    /// Execute one query, folding any failure into the response slot
    pub async fn query(&self, ctx: &PluginContext, query: &DataQuery) -> DataResponse {
        match self.execute(ctx, query).await {
            Ok(frames) => DataResponse::new(frames),
            Err(err) => {
                debug!(ref_id = %query.ref_id, error = %err, "Query failed");
                err.into()
            }
        }
    }

    /// Validate configured credentials against the API
    #[instrument(skip(self, ctx))]
    pub async fn probe(&self, ctx: &PluginContext) -> CheckHealthResult {
        let settings = self.settings();
        if settings.api_key().is_empty() {
            return CheckHealthResult::error("API key not configured");
        }
        if settings.application_key().is_empty() {
            return CheckHealthResult::error("application key not configured");
        }

        match self.client.validate(&ctx.cancellation).await {
            Ok(StatusCode::OK) => CheckHealthResult::ok("connected successfully"),
            Ok(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
                CheckHealthResult::error("invalid credentials")
            }
            Ok(status) => CheckHealthResult::error(format!(
                "Datadog API returned status {}",
                status.as_u16()
            )),
            Err(DatasourceError::Transport(e)) => {
                CheckHealthResult::error(format!("error connecting to Datadog: {}", e))
            }
            Err(err) => CheckHealthResult::error(err.to_string()),
        }
    }
}

#[async_trait]
impl QueryDataHandler for Datasource {
    async fn query_data(&self, request: QueryDataRequest) -> QueryDataResponse {
        let ctx = &request.plugin_context;
        let results = join_all(
            request
                .queries
                .iter()
                .map(|q| async move { (q.ref_id.clone(), self.query(ctx, q).await) }),
        )
        .await;

        QueryDataResponse {
            responses: results.into_iter().collect(),
        }
    }
}

#[async_trait]
impl CheckHealthHandler for Datasource {
    async fn check_health(&self, request: &CheckHealthRequest) -> CheckHealthResult {
        self.probe(&request.plugin_context).await
    }
}

impl InstanceDisposer for Datasource {
    fn dispose(&self) {
        debug!(base_url = %self.settings().base_url(), "Disposing datasource instance");
    }
}
