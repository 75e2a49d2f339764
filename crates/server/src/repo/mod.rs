pub mod memory;
pub mod report;

use async_trait::async_trait;
use shared_types::{AppError, Report, StatusCounts};

use crate::triage::workflow::StatusChange;

pub use memory::MemoryReportStore;
pub use report::PgReportStore;

/// Durable record of submitted reports.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Insert a new report. A duplicate `report_id` is `Conflict`.
    async fn create(&self, report: &Report) -> Result<Report, AppError>;

    /// All reports, newest first.
    async fn get_all(&self) -> Result<Vec<Report>, AppError>;

    /// A single report, or `NotFound`.
    async fn get_by_id(&self, report_id: &str) -> Result<Report, AppError>;

    /// Apply a status change atomically and return the updated report.
    /// A missing report is `NotFound` and nothing is written.
    async fn update_status(
        &self,
        report_id: &str,
        change: &StatusChange,
    ) -> Result<Report, AppError>;

    /// Report counts by status, taken from one consistent snapshot.
    async fn status_counts(&self) -> Result<StatusCounts, AppError>;

    /// Connectivity check for the health endpoint.
    async fn ping(&self) -> Result<(), AppError>;
}

pub(crate) fn report_not_found(report_id: &str) -> AppError {
    AppError::not_found(format!("Report {report_id} not found"))
}
