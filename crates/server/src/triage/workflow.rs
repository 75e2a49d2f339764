use chrono::{DateTime, Utc};
use shared_types::{AppError, Report, ReportStatus, UpdateReportStatusRequest};

/// A validated administrative status update.
///
/// Any status may move to any other. Moving to `Resolved` stamps
/// `resolved_at`; other targets leave it untouched, so a reopened report
/// keeps the time of its last resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub status: ReportStatus,
    /// Replaces the stored remarks when present.
    pub remarks: Option<String>,
    /// Replaces the handling official when present.
    pub assigned_to: Option<String>,
}

impl StatusChange {
    pub fn new(status: ReportStatus) -> Self {
        Self {
            status,
            remarks: None,
            assigned_to: None,
        }
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = non_blank(Some(remarks.into()));
        self
    }

    /// Validate a request. Unknown status names are `InvalidStatus`; blank
    /// remarks or assignee count as not supplied.
    pub fn parse(request: &UpdateReportStatusRequest) -> Result<Self, AppError> {
        let status = ReportStatus::from_str_opt(request.status.trim()).ok_or_else(|| {
            AppError::invalid_status(format!(
                "Invalid status '{}': expected one of Pending, InProgress, Resolved",
                request.status
            ))
        })?;
        Ok(Self {
            status,
            remarks: non_blank(request.remarks.clone()),
            assigned_to: non_blank(request.assigned_to.clone()),
        })
    }

    /// Whether this change stamps `resolved_at`.
    pub fn resolves(&self) -> bool {
        self.status == ReportStatus::Resolved
    }

    /// Apply the change to a report in place.
    pub fn apply(&self, report: &mut Report, now: DateTime<Utc>) {
        report.status = self.status;
        if let Some(remarks) = &self.remarks {
            report.remarks = Some(remarks.clone());
        }
        if let Some(assignee) = &self.assigned_to {
            report.assigned_to = Some(assignee.clone());
        }
        if self.resolves() {
            report.resolved_at = Some(now);
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
