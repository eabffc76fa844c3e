//! Report moderation board.
//!
//! `ReportBoard` holds the report collection fetched from the backend and
//! derives everything else from it: status counts, the filtered view and
//! the CSV export. Mutations never patch the collection locally; every
//! successful write is followed by a full authoritative reload, so the
//! list and the derived stats cannot diverge.

use thiserror::Error;
use wildwatch_api::{ApiError, ReportsApi};
use wildwatch_model::{FilterState, Report, ReportStats, ReportStatus};

/// Errors surfaced by board operations.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// CSV column headers, in export order.
const CSV_HEADERS: [&str; 6] = [
    "Species Name",
    "Issue Type",
    "Description",
    "Status",
    "Date",
    "Reporter",
];

/// The moderation view over the backend's report collection.
pub struct ReportBoard<A> {
    api: A,
    reports: Vec<Report>,
}

impl<A: ReportsApi> ReportBoard<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            reports: Vec::new(),
        }
    }

    /// Fetch the full collection, replacing what is held. On failure the
    /// previously loaded collection stays untouched (stale but consistent).
    pub async fn load(&mut self) -> Result<(), BoardError> {
        let fetched = self.api.list().await?;
        tracing::debug!(count = fetched.len(), "loaded reports");
        self.reports = fetched;
        Ok(())
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Reports matching the filter, in held order. Pure view; no refetch.
    pub fn filtered_view(&self, filter: &FilterState) -> Vec<&Report> {
        self.reports.iter().filter(|r| filter.matches(r)).collect()
    }

    /// Status counts over the FULL collection, independent of any filter.
    pub fn stats(&self) -> ReportStats {
        ReportStats::tally(&self.reports)
    }

    /// Update one report's status, then reload. Any status may move to any
    /// other; moderation is deliberately free-form.
    pub async fn set_status(&mut self, id: &str, status: ReportStatus) -> Result<(), BoardError> {
        self.api.set_status(id, status).await?;
        self.invalidate_and_reload().await
    }

    /// Delete one report behind a caller-supplied confirmation gate.
    /// Returns `Ok(false)` without touching the network when the caller
    /// declines.
    pub async fn remove(
        &mut self,
        id: &str,
        confirm: impl FnOnce() -> bool,
    ) -> Result<bool, BoardError> {
        if !confirm() {
            return Ok(false);
        }
        self.api.delete(id).await?;
        self.invalidate_and_reload().await?;
        Ok(true)
    }

    /// The post-mutation full reload. Kept as an explicit step so it is
    /// not "optimized" into a local patch, which would let the collection
    /// and server state drift apart.
    async fn invalidate_and_reload(&mut self) -> Result<(), BoardError> {
        self.load().await
    }

    /// Serialize the FILTERED view as CSV.
    ///
    /// Commas in the description are replaced with semicolons instead of
    /// quoting the field, matching the export format consumers already
    /// parse. See DESIGN.md before changing this.
    pub fn export_csv(&self, filter: &FilterState) -> String {
        let mut lines = vec![CSV_HEADERS.join(",")];

        for report in self.filtered_view(filter) {
            let row = [
                report.species_name.clone(),
                report.issue_type.to_string(),
                report.description.replace(',', ";"),
                report.status.to_string(),
                report.created_at.format("%-m/%-d/%Y").to_string(),
                report.reporter().to_string(),
            ];
            lines.push(row.join(","));
        }

        lines.join("\n")
    }
}
