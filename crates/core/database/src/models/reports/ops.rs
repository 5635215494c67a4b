use chrono::{DateTime, Utc};
use vigil_result::Result;

use crate::Report;

#[cfg(feature = "mongodb")]
mod mongodb;
mod reference;

#[async_trait]
pub trait AbstractReports: Sync + Send {
    /// Insert a new report into the database
    async fn insert_report(&self, report: &Report) -> Result<()>;

    /// Fetch a report by its id
    async fn fetch_report(&self, id: &str) -> Result<Report>;

    /// Fetch reports created strictly before the given instant,
    /// newest first, up to `limit` reports
    async fn fetch_reports_before(
        &self,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<Report>>;

    /// Fetch all reports by the given author, newest first
    async fn fetch_reports_by_author(&self, author: &str) -> Result<Vec<Report>>;

    /// Save a report, replacing the whole document
    async fn save_report(&self, report: &Report) -> Result<()>;

    /// Delete a report from the database by its id
    async fn delete_report(&self, id: &str) -> Result<()>;
}
