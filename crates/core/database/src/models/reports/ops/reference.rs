use chrono::{DateTime, Utc};
use vigil_result::Result;

use crate::{ReferenceDb, Report};

use super::AbstractReports;

#[async_trait]
impl AbstractReports for ReferenceDb {
    /// Insert a new report into the database
    async fn insert_report(&self, report: &Report) -> Result<()> {
        let mut reports = self.reports.lock().await;
        if reports.contains_key(&report.id) {
            Err(create_database_error!("insert", "reports"))
        } else {
            reports.insert(report.id.to_string(), report.clone());
            Ok(())
        }
    }

    /// Fetch a report by its id
    async fn fetch_report(&self, id: &str) -> Result<Report> {
        let reports = self.reports.lock().await;
        reports
            .get(id)
            .cloned()
            .ok_or_else(|| create_error!(UnknownReport))
    }

    /// Fetch reports created strictly before the given instant,
    /// newest first, up to `limit` reports
    async fn fetch_reports_before(
        &self,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<Report>> {
        let reports = self.reports.lock().await;
        let mut matched: Vec<Report> = reports
            .values()
            .filter(|report| match before {
                Some(before) => report.created_at < before,
                None => true,
            })
            .cloned()
            .collect();

        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched.truncate(limit.max(0) as usize);
        Ok(matched)
    }

    /// Fetch all reports by the given author, newest first
    async fn fetch_reports_by_author(&self, author: &str) -> Result<Vec<Report>> {
        let reports = self.reports.lock().await;
        let mut matched: Vec<Report> = reports
            .values()
            .filter(|report| report.author == author)
            .cloned()
            .collect();

        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }

    /// Save a report, replacing the whole document
    async fn save_report(&self, report: &Report) -> Result<()> {
        let mut reports = self.reports.lock().await;
        reports.insert(report.id.to_string(), report.clone());
        Ok(())
    }

    /// Delete a report from the database by its id
    async fn delete_report(&self, id: &str) -> Result<()> {
        let mut reports = self.reports.lock().await;
        reports
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| create_error!(UnknownReport))
    }
}
