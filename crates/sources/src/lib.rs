//! External biodiversity data sources.
//!
//! Provides the `TaxonomyProvider` and `EncyclopediaProvider` traits and
//! their HTTP implementations (GBIF and Wikipedia REST). The traits keep
//! the lookup orchestration testable against in-memory fakes and leave
//! room for alternative data services.

use std::future::Future;

use thiserror::Error;
use wildwatch_model::{PageSummary, SpeciesCandidate, SpeciesDetails};

/// Errors from external data source operations.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl SourceError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        // Timeouts classify as connection failures alongside DNS/socket errors.
        Self::Connection(err.to_string())
    }
}

/// Trait for taxonomy/occurrence data services (GBIF today).
pub trait TaxonomyProvider {
    /// Suggest candidate taxa for a free-text name, best match first.
    fn suggest(
        &self,
        name: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<SpeciesCandidate>, SourceError>> + Send;

    /// Fetch the full taxonomic record for a taxon key.
    fn details(
        &self,
        key: i64,
    ) -> impl Future<Output = Result<SpeciesDetails, SourceError>> + Send;

    /// Fetch still-image URLs from occurrence records, grouped per record.
    fn occurrence_images(
        &self,
        key: i64,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Vec<String>>, SourceError>> + Send;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}

/// Trait for encyclopedia summary services (Wikipedia today).
pub trait EncyclopediaProvider {
    /// Look up a page summary by title. `Ok(None)` means the page does not
    /// exist; errors are reserved for network and server failures.
    fn summary(
        &self,
        title: &str,
    ) -> impl Future<Output = Result<Option<PageSummary>, SourceError>> + Send;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}

/// GBIF API configuration.
#[derive(Debug, Clone)]
pub struct GbifConfig {
    /// Base URL for the GBIF v1 API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GbifConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.gbif.org/v1".to_string(),
            timeout_secs: 30,
        }
    }
}

/// GBIF species/occurrence client.
pub struct GbifClient {
    config: GbifConfig,
    client: reqwest::Client,
}

/// Wire shape of the occurrence search response. Only the media
/// identifiers are of interest.
#[derive(Debug, serde::Deserialize)]
struct OccurrencePage {
    #[serde(default)]
    results: Vec<OccurrenceRecord>,
}

#[derive(Debug, serde::Deserialize)]
struct OccurrenceRecord {
    #[serde(default)]
    media: Vec<MediaItem>,
}

#[derive(Debug, serde::Deserialize)]
struct MediaItem {
    #[serde(default)]
    identifier: Option<String>,
}

impl GbifClient {
    pub fn new(config: GbifConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(SourceError::from_reqwest)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))
    }
}

impl TaxonomyProvider for GbifClient {
    async fn suggest(
        &self,
        name: &str,
        limit: usize,
    ) -> Result<Vec<SpeciesCandidate>, SourceError> {
        tracing::debug!(query = %name, limit, "GBIF suggest");

        self.get_json(
            format!("{}/species/suggest", self.config.base_url),
            &[("q", name.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    async fn details(&self, key: i64) -> Result<SpeciesDetails, SourceError> {
        tracing::debug!(key, "GBIF species details");

        self.get_json(format!("{}/species/{}", self.config.base_url, key), &[])
            .await
    }

    async fn occurrence_images(
        &self,
        key: i64,
        limit: usize,
    ) -> Result<Vec<Vec<String>>, SourceError> {
        tracing::debug!(key, limit, "GBIF occurrence media");

        let page: OccurrencePage = self
            .get_json(
                format!("{}/occurrence/search", self.config.base_url),
                &[
                    ("taxonKey", key.to_string()),
                    ("mediaType", "StillImage".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        Ok(page
            .results
            .into_iter()
            .map(|record| {
                record
                    .media
                    .into_iter()
                    .filter_map(|m| m.identifier)
                    .collect()
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "gbif"
    }
}

/// Wikipedia REST API configuration.
#[derive(Debug, Clone)]
pub struct WikipediaConfig {
    /// Base URL for the REST v1 API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            base_url: "https://en.wikipedia.org/api/rest_v1".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Wikipedia page-summary client.
pub struct WikipediaClient {
    config: WikipediaConfig,
    client: reqwest::Client,
}

impl WikipediaClient {
    pub fn new(config: WikipediaConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn summary_url(&self, title: &str) -> Result<reqwest::Url, SourceError> {
        let mut url = reqwest::Url::parse(&self.config.base_url)
            .map_err(|e| SourceError::Parse(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SourceError::Parse("base URL cannot hold a path".to_string()))?
            .extend(["page", "summary", title]);
        Ok(url)
    }
}

impl EncyclopediaProvider for WikipediaClient {
    async fn summary(&self, title: &str) -> Result<Option<PageSummary>, SourceError> {
        let url = self.summary_url(title)?;

        tracing::debug!(title = %title, "Wikipedia summary");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(SourceError::from_reqwest)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status { status, body });
        }

        let summary: PageSummary = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        Ok(Some(summary))
    }

    fn name(&self) -> &'static str {
        "wikipedia"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_url_encodes_title() {
        let client = WikipediaClient::new(WikipediaConfig::default());
        let url = client.summary_url("Panthera leo").unwrap();
        assert_eq!(
            url.as_str(),
            "https://en.wikipedia.org/api/rest_v1/page/summary/Panthera%20leo"
        );
    }

    #[test]
    fn test_occurrence_page_parsing() {
        let json = r#"{
            "results": [
                {"media": [{"identifier": "https://img.example/a.jpg"}]},
                {"media": []},
                {"media": [{"identifier": null}, {"identifier": "https://img.example/b.jpg"}]}
            ]
        }"#;
        let page: OccurrencePage = serde_json::from_str(json).unwrap();
        let grouped: Vec<Vec<String>> = page
            .results
            .into_iter()
            .map(|r| r.media.into_iter().filter_map(|m| m.identifier).collect())
            .collect();

        assert_eq!(grouped.len(), 3);
        assert_eq!(grouped[0], vec!["https://img.example/a.jpg"]);
        assert!(grouped[1].is_empty());
        assert_eq!(grouped[2], vec!["https://img.example/b.jpg"]);
    }

    #[test]
    fn test_default_configs() {
        assert_eq!(GbifConfig::default().timeout_secs, 30);
        assert!(WikipediaConfig::default().base_url.contains("rest_v1"));
    }
}
