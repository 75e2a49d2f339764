use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use shared_types::{AppError, Report, StatusCounts};
use tokio::sync::RwLock;

use super::{report_not_found, ReportStore};
use crate::triage::{analytics, workflow::StatusChange};

/// Process-local report store for development and tests.
#[derive(Default)]
pub struct MemoryReportStore {
    reports: RwLock<HashMap<String, Report>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn create(&self, report: &Report) -> Result<Report, AppError> {
        let mut reports = self.reports.write().await;
        if reports.contains_key(&report.report_id) {
            return Err(AppError::conflict(
                "A report with this identifier already exists",
            ));
        }
        reports.insert(report.report_id.clone(), report.clone());
        Ok(report.clone())
    }

    async fn get_all(&self) -> Result<Vec<Report>, AppError> {
        let mut all: Vec<Report> = self.reports.read().await.values().cloned().collect();
        all.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.report_id.cmp(&b.report_id))
        });
        Ok(all)
    }

    async fn get_by_id(&self, report_id: &str) -> Result<Report, AppError> {
        self.reports
            .read()
            .await
            .get(report_id)
            .cloned()
            .ok_or_else(|| report_not_found(report_id))
    }

    async fn update_status(
        &self,
        report_id: &str,
        change: &StatusChange,
    ) -> Result<Report, AppError> {
        let mut reports = self.reports.write().await;
        let report = reports
            .get_mut(report_id)
            .ok_or_else(|| report_not_found(report_id))?;
        change.apply(report, Utc::now());
        Ok(report.clone())
    }

    async fn status_counts(&self) -> Result<StatusCounts, AppError> {
        Ok(analytics::tally(self.reports.read().await.values()))
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
