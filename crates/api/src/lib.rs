//! Backend REST API client for conservation reports.
//!
//! Provides the `ReportsApi` trait and its HTTP implementation. The trait
//! keeps `ReportBoard` testable without a server; the HTTP client attaches
//! a bearer token through an explicit `TokenSource` session object rather
//! than reading ambient storage.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use wildwatch_model::{NewReport, Report, ReportStatus};

/// Errors from backend API operations.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Unauthorized: please log in again")]
    Unauthorized,

    #[error("Backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Source of the session bearer token.
///
/// Handed to the client at construction so authentication state is an
/// explicit collaborator, not a global.
pub trait TokenSource: Send + Sync {
    /// Current token, if a session exists.
    fn token(&self) -> Option<String>;
}

/// Fixed token (or none), for CLIs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self(token)
    }
}

impl TokenSource for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Trait for the reports backend.
pub trait ReportsApi {
    /// Fetch the full report collection.
    fn list(&self) -> impl Future<Output = Result<Vec<Report>, ApiError>> + Send;

    /// Submit a new report.
    fn submit(&self, report: &NewReport) -> impl Future<Output = Result<Report, ApiError>> + Send;

    /// Update the status of one report.
    fn set_status(
        &self,
        id: &str,
        status: ReportStatus,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Delete one report.
    fn delete(&self, id: &str) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Check that the backend is reachable.
    fn health(&self) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

/// Backend API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the backend
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusBody {
    status: ReportStatus,
}

/// HTTP implementation of `ReportsApi`.
pub struct HttpReportsApi {
    config: ApiConfig,
    client: reqwest::Client,
    session: Arc<dyn TokenSource>,
}

impl HttpReportsApi {
    pub fn new(config: ApiConfig, session: Arc<dyn TokenSource>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            client,
            session,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Attach the bearer token when a session exists.
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }
        Ok(response)
    }
}

impl ReportsApi for HttpReportsApi {
    async fn list(&self) -> Result<Vec<Report>, ApiError> {
        tracing::debug!("fetching reports");

        let response = self
            .authorize(self.client.get(self.url("/api/reports")))
            .send()
            .await
            .map_err(|e| ApiError::Connection(e.to_string()))?;

        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn submit(&self, report: &NewReport) -> Result<Report, ApiError> {
        tracing::debug!(species = %report.species_name, "submitting report");

        let response = self
            .authorize(self.client.post(self.url("/api/reports")))
            .json(report)
            .send()
            .await
            .map_err(|e| ApiError::Connection(e.to_string()))?;

        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn set_status(&self, id: &str, status: ReportStatus) -> Result<(), ApiError> {
        tracing::debug!(id, %status, "updating report status");

        let response = self
            .authorize(
                self.client
                    .put(self.url(&format!("/api/reports/{}/status", id))),
            )
            .json(&StatusBody { status })
            .send()
            .await
            .map_err(|e| ApiError::Connection(e.to_string()))?;

        Self::check(response).await.map(|_| ())
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        tracing::debug!(id, "deleting report");

        let response = self
            .authorize(self.client.delete(self.url(&format!("/api/reports/{}", id))))
            .send()
            .await
            .map_err(|e| ApiError::Connection(e.to_string()))?;

        Self::check(response).await.map(|_| ())
    }

    async fn health(&self) -> Result<(), ApiError> {
        let response = self
            .client
            .get(self.url("/api/health"))
            .send()
            .await
            .map_err(|e| ApiError::Connection(e.to_string()))?;

        Self::check(response).await.map(|_| ())
    }

    fn name(&self) -> &'static str {
        "reports-api"
    }
}
