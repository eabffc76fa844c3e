//! Core domain model for WildWatch conservation tooling.
//!
//! This crate defines the fundamental types used throughout the system:
//! - `SpeciesQuery`, `SpeciesCandidate`, `SpeciesDetails`: species lookup inputs
//! - `SpeciesRecord`: the merged species view model
//! - `Report`, `ReportStatus`, `IssueType`: moderation reports from the backend
//! - `ReportStats`, `FilterState`: derived views over the report collection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sentinel shown when no encyclopedia summary could be found.
pub const NO_DESCRIPTION: &str =
    "No description available. Try searching on Wikipedia for more information.";

/// Placeholder for taxonomy fields the upstream record omits.
pub const NOT_AVAILABLE: &str = "N/A";

/// Errors from query validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Search query is empty")]
    Empty,
}

/// A validated species search query: trimmed and guaranteed non-empty.
///
/// Construction is the validation boundary; an empty or whitespace-only
/// string never reaches the network layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeciesQuery(String);

impl SpeciesQuery {
    /// Parse user input into a query, rejecting empty/whitespace input.
    pub fn parse(input: &str) -> Result<Self, QueryError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(QueryError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SpeciesQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A taxonomy suggestion returned by the suggest endpoint.
///
/// The first suggestion in the response is treated as the authoritative
/// match; no local re-ranking is performed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesCandidate {
    /// Opaque taxon usage key used for detail and occurrence lookups
    pub key: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scientific_name: Option<String>,

    /// Common names in upstream order
    #[serde(default)]
    pub vernacular_names: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
}

/// Full taxonomic detail record for a matched taxon.
///
/// Every field is optional: the upstream JSON omits whatever it does not
/// know, so fallbacks are applied when the view model is assembled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scientific_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vernacular_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kingdom: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phylum: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genus: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxonomic_status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
}

/// An encyclopedia page summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract: Option<String>,

    /// Page type reported upstream ("standard", "disambiguation", ...)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Thumbnail>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_urls: Option<ContentUrls>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Thumbnail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentUrls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desktop: Option<DesktopUrls>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DesktopUrls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
}

impl PageSummary {
    /// Whether this summary can back a species description: it must carry
    /// a non-empty extract and not be a disambiguation page.
    pub fn is_usable(&self) -> bool {
        let has_extract = self
            .extract
            .as_deref()
            .map(|e| !e.trim().is_empty())
            .unwrap_or(false);
        has_extract && self.kind.as_deref() != Some("disambiguation")
    }

    /// The desktop page URL, if the summary carries one.
    pub fn page_url(&self) -> Option<&str> {
        self.content_urls
            .as_ref()
            .and_then(|c| c.desktop.as_ref())
            .and_then(|d| d.page.as_deref())
    }

    /// The thumbnail image URL, if present.
    pub fn thumbnail_url(&self) -> Option<&str> {
        self.thumbnail.as_ref().and_then(|t| t.source.as_deref())
    }
}

/// The merged species view model.
///
/// Built fresh on every successful lookup from taxonomy details
/// (authoritative), suggestion fields (fallback) and best-effort
/// encyclopedia/image enrichment. Never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesRecord {
    pub scientific_name: String,
    pub common_name: String,
    pub kingdom: String,
    pub phylum: String,
    pub class: String,
    pub order: String,
    pub family: String,
    pub genus: String,
    pub taxonomic_status: String,
    pub rank: String,

    /// Encyclopedia extract, or [`NO_DESCRIPTION`] when none was found
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,

    /// Encyclopedia deep link for "read more"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,

    /// Occurrence images, deduplicated in first-seen order and capped
    #[serde(default)]
    pub images: Vec<String>,
}

/// Status of a moderation report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportStatus {
    /// Submitted, not yet looked at
    Pending,
    /// Seen by a moderator
    Reviewed,
    /// Closed out
    Resolved,
}

impl Default for ReportStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl From<&str> for ReportStatus {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "reviewed" => Self::Reviewed,
            "resolved" => Self::Resolved,
            _ => Self::Pending,
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            Self::Reviewed => "Reviewed",
            Self::Resolved => "Resolved",
        };
        f.write_str(s)
    }
}

/// Category of conservation issue being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueType {
    Overhunting,
    Deforestation,
    Pollution,
    #[serde(rename = "Climate Change")]
    ClimateChange,
    Other,
}

impl Default for IssueType {
    fn default() -> Self {
        Self::Other
    }
}

impl From<&str> for IssueType {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "overhunting" => Self::Overhunting,
            "deforestation" => Self::Deforestation,
            "pollution" => Self::Pollution,
            "climate change" => Self::ClimateChange,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Overhunting => "Overhunting",
            Self::Deforestation => "Deforestation",
            Self::Pollution => "Pollution",
            Self::ClimateChange => "Climate Change",
            Self::Other => "Other",
        };
        f.write_str(s)
    }
}

/// A conservation report owned by the backend.
///
/// The client never patches these locally; the full collection is
/// refetched after every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(rename = "_id")]
    pub id: String,

    pub species_name: String,

    #[serde(default)]
    pub issue_type: IssueType,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: ReportStatus,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter_email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Report {
    /// Create a minimal report for testing.
    pub fn new(id: impl Into<String>, species_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            species_name: species_name.into(),
            issue_type: IssueType::Other,
            description: String::new(),
            status: ReportStatus::Pending,
            created_at: Utc::now(),
            reporter_name: None,
            reporter_email: None,
            image_url: None,
        }
    }

    /// Reporter display name, "Unknown" when the report was anonymous.
    pub fn reporter(&self) -> &str {
        self.reporter_name.as_deref().unwrap_or("Unknown")
    }
}

/// Fields accepted when submitting a new report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    pub species_name: String,
    pub issue_type: IssueType,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Counts of reports by status over the full, unfiltered collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportStats {
    pub total: usize,
    pub pending: usize,
    pub reviewed: usize,
    pub resolved: usize,
}

impl ReportStats {
    /// Tally statuses across a report collection.
    pub fn tally(reports: &[Report]) -> Self {
        let mut stats = Self {
            total: reports.len(),
            ..Self::default()
        };
        for report in reports {
            match report.status {
                ReportStatus::Pending => stats.pending += 1,
                ReportStatus::Reviewed => stats.reviewed += 1,
                ReportStatus::Resolved => stats.resolved += 1,
            }
        }
        stats
    }
}

/// Status half of the report filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(ReportStatus),
}

impl From<&str> for StatusFilter {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pending" => Self::Only(ReportStatus::Pending),
            "reviewed" => Self::Only(ReportStatus::Reviewed),
            "resolved" => Self::Only(ReportStatus::Resolved),
            _ => Self::All,
        }
    }
}

/// Combined status + free-text filter over the report collection.
///
/// A report is visible when its status matches AND the search text
/// appears (case-insensitively) in its species name, issue type or
/// description. Empty search text matches everything.
#[derive(Debug, Clone, Default)]
pub struct FilterState {
    pub status: StatusFilter,
    pub search: String,
}

impl FilterState {
    pub fn new(status: StatusFilter, search: impl Into<String>) -> Self {
        Self {
            status,
            search: search.into(),
        }
    }

    pub fn matches(&self, report: &Report) -> bool {
        let status_ok = match self.status {
            StatusFilter::All => true,
            StatusFilter::Only(status) => report.status == status,
        };
        if !status_ok {
            return false;
        }

        let needle = self.search.to_lowercase();
        if needle.is_empty() {
            return true;
        }

        report.species_name.to_lowercase().contains(&needle)
            || report.issue_type.to_string().to_lowercase().contains(&needle)
            || report.description.to_lowercase().contains(&needle)
    }
}
