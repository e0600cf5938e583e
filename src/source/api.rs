//! HTTP client for the run service REST API.
//!
//! ## Endpoints
//!
//! - `GET /api/processes`: process catalog
//! - `GET /api/processes/{p}/runs`: all runs of a process (two list shapes)
//! - `GET /api/processes/{p}/runs/{r}/info`: one run
//! - `DELETE /api/processes/{p}/runs/{r}` and `DELETE /api/processes/{p}`
//! - `GET /api/processes/{p}/runs/{r}/download/{file}`: raw file bytes
//!
//! ## Example
//!
//! ```rust,no_run
//! use madboard::source::{ApiClient, RunBackend};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::builder()
//!         .endpoint("http://127.0.0.1:5000")
//!         .build()?;
//!
//!     for run in client.list_runs("ttbar").await? {
//!         println!("{}: {}", run.name, run.status);
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::snapshot::{ProcessEntry, ProcessList, Run, RunInfo, RunList};
use super::{ApiError, RunBackend};

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000";

/// Client for the run service.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base: Url,
}

impl ApiClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// The base URL requests are issued against.
    pub fn endpoint(&self) -> &str {
        self.base.as_str()
    }

    /// Join `segments` under `/api`, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, method: Method, url: Url) -> Result<Response, ApiError> {
        debug!(%method, %url, "API request");
        let response = self.client.request(method, url.clone()).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(url.path().to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Http {
                status: status.as_u16(),
                message: message.trim().to_string(),
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.url(segments)?;
        self.send(Method::GET, url)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }
}

#[async_trait]
impl RunBackend for ApiClient {
    async fn list_processes(&self) -> Result<Vec<ProcessEntry>, ApiError> {
        let list: ProcessList = self.get_json(&["processes"]).await?;
        Ok(list.processes)
    }

    async fn list_runs(&self, process: &str) -> Result<Vec<Run>, ApiError> {
        let list: RunList = self.get_json(&["processes", process, "runs"]).await?;
        Ok(list.runs.into_iter().map(Run::from).collect())
    }

    async fn run_info(&self, process: &str, run: &str) -> Result<Run, ApiError> {
        let info: RunInfo = self
            .get_json(&["processes", process, "runs", run, "info"])
            .await?;
        Ok(Run::from_info(run, info))
    }

    async fn delete_run(&self, process: &str, run: &str) -> Result<(), ApiError> {
        let url = self.url(&["processes", process, "runs", run])?;
        self.send(Method::DELETE, url).await?;
        Ok(())
    }

    async fn delete_process(&self, process: &str) -> Result<(), ApiError> {
        let url = self.url(&["processes", process])?;
        self.send(Method::DELETE, url).await?;
        Ok(())
    }

    async fn download_file(&self, process: &str, run: &str, file: &str) -> Result<Vec<u8>, ApiError> {
        let url = self.url(&["processes", process, "runs", run, "download", file])?;
        let bytes = self.send(Method::GET, url).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

/// Builder for ApiClient.
#[derive(Debug, Default)]
pub struct ApiClientBuilder {
    endpoint: Option<String>,
    timeout: Option<Duration>,
}

impl ApiClientBuilder {
    /// Set the service endpoint (e.g., "http://127.0.0.1:5000").
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));
        let endpoint = self.endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let base = Url::parse(&endpoint).map_err(|e| ApiError::InvalidUrl(format!("{endpoint}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(endpoint));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(ApiClient { client, base })
    }
}
