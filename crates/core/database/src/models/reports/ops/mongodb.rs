use chrono::{DateTime, Utc};
use mongodb::options::FindOptions;
use vigil_result::Result;

use crate::{MongoDb, Report};

use super::AbstractReports;

static COL: &str = "reports";

#[async_trait]
impl AbstractReports for MongoDb {
    /// Insert a new report into the database
    async fn insert_report(&self, report: &Report) -> Result<()> {
        query!(self, insert_one, COL, report).map(|_| ())
    }

    /// Fetch a report by its id
    async fn fetch_report(&self, id: &str) -> Result<Report> {
        query!(self, find_one_by_id, COL, id)?.ok_or_else(|| create_error!(UnknownReport))
    }

    /// Fetch reports created strictly before the given instant,
    /// newest first, up to `limit` reports
    async fn fetch_reports_before(
        &self,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<Report>> {
        let mut filter = doc! {};
        if let Some(before) = before {
            filter.insert(
                "created_at",
                doc! {
                    "$lt": bson::DateTime::from_chrono(before)
                },
            );
        }

        query!(
            self,
            find_with_options,
            COL,
            filter,
            FindOptions::builder()
                .limit(limit)
                .sort(doc! {
                    "created_at": -1_i32
                })
                .build()
        )
    }

    /// Fetch all reports by the given author, newest first
    async fn fetch_reports_by_author(&self, author: &str) -> Result<Vec<Report>> {
        query!(
            self,
            find_with_options,
            COL,
            doc! {
                "author": author
            },
            FindOptions::builder()
                .sort(doc! {
                    "created_at": -1_i32
                })
                .build()
        )
    }

    /// Save a report, replacing the whole document
    async fn save_report(&self, report: &Report) -> Result<()> {
        query!(self, replace_one_by_id, COL, &report.id, report).map(|_| ())
    }

    /// Delete a report from the database by its id
    async fn delete_report(&self, id: &str) -> Result<()> {
        query!(self, delete_one_by_id, COL, id).map(|_| ())
    }
}
