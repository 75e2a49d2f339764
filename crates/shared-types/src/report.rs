use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "validation")]
use validator::Validate;

use crate::triage::GeoPoint;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Administrative workflow state of a report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ReportStatus {
    Pending,
    InProgress,
    Resolved,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 3] = [Self::Pending, Self::InProgress, Self::Resolved];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "InProgress",
            Self::Resolved => "Resolved",
        }
    }

    /// Parse a wire or stored status name. `"In Progress"` is the display
    /// form older dashboards send and maps to `InProgress`.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(Self::Pending),
            "InProgress" | "In Progress" => Some(Self::InProgress),
            "Resolved" => Some(Self::Resolved),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Domain record
// ---------------------------------------------------------------------------

/// A citizen-submitted road damage report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub report_id: String,
    pub reporter_name: String,
    pub reporter_phone: String,
    pub ward: String,
    pub damage_type: String,
    pub description: String,
    /// Opaque key into the image byte store.
    pub image_reference: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Confidence of the winning detection; `None` when classification
    /// found nothing or failed.
    pub ai_confidence: Option<f64>,
    /// JSON bounding box `[x1, y1, x2, y2]`, `"[]"` when nothing was
    /// detected, `None` when classification failed.
    pub ai_metadata: Option<String>,
    pub status: ReportStatus,
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
}

// ---------------------------------------------------------------------------
// API Response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ReportResponse {
    pub report_id: String,
    pub reporter_name: String,
    pub reporter_phone: String,
    pub ward: String,
    pub damage_type: String,
    pub description: String,
    pub image_reference: String,
    pub latitude: f64,
    pub longitude: f64,
    pub ai_confidence: Option<f64>,
    pub ai_metadata: Option<String>,
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    pub created_at: String,
    pub resolved_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl From<Report> for ReportResponse {
    fn from(r: Report) -> Self {
        Self {
            report_id: r.report_id,
            reporter_name: r.reporter_name,
            reporter_phone: r.reporter_phone,
            ward: r.ward,
            damage_type: r.damage_type,
            description: r.description,
            image_reference: r.image_reference,
            latitude: r.latitude,
            longitude: r.longitude,
            ai_confidence: r.ai_confidence,
            ai_metadata: r.ai_metadata,
            status: r.status,
            assigned_to: r.assigned_to,
            created_at: r.created_at.to_rfc3339(),
            resolved_at: r.resolved_at.map(|d| d.to_rfc3339()),
            remarks: r.remarks,
        }
    }
}

/// Row of the administrative listing. Leaves out the reporter's phone
/// number and free-text description; `GET /api/complaints/{id}` has both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ReportSummary {
    pub report_id: String,
    pub reporter_name: String,
    pub ward: String,
    pub damage_type: String,
    pub image_reference: String,
    pub latitude: f64,
    pub longitude: f64,
    pub ai_confidence: Option<f64>,
    pub ai_metadata: Option<String>,
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    pub created_at: String,
    pub resolved_at: Option<String>,
}

impl From<Report> for ReportSummary {
    fn from(r: Report) -> Self {
        Self {
            report_id: r.report_id,
            reporter_name: r.reporter_name,
            ward: r.ward,
            damage_type: r.damage_type,
            image_reference: r.image_reference,
            latitude: r.latitude,
            longitude: r.longitude,
            ai_confidence: r.ai_confidence,
            ai_metadata: r.ai_metadata,
            status: r.status,
            assigned_to: r.assigned_to,
            created_at: r.created_at.to_rfc3339(),
            resolved_at: r.resolved_at.map(|d| d.to_rfc3339()),
        }
    }
}

/// Response to a successful submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SubmitReportResponse {
    pub message: String,
    pub report_id: String,
    pub report: ReportResponse,
    /// Location read from the photo's metadata. Advisory only: the stored
    /// coordinates are always the submitter's.
    pub metadata_location: Option<GeoPoint>,
}

/// Report counts partitioned by status.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StatusCounts {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub resolved: i64,
}

impl StatusCounts {
    /// Count one report with the given status.
    pub fn record(&mut self, status: ReportStatus) {
        self.total += 1;
        match status {
            ReportStatus::Pending => self.pending += 1,
            ReportStatus::InProgress => self.in_progress += 1,
            ReportStatus::Resolved => self.resolved += 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Request Types
// ---------------------------------------------------------------------------

/// Submitter-supplied fields of a report submission (multipart text parts).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct SubmitReportFields {
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Reporter name is required"))
    )]
    pub name: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Phone number is required"))
    )]
    pub phone: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Ward is required"))
    )]
    pub ward: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Damage type is required"))
    )]
    pub damage_type: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Description is required"))
    )]
    pub description: String,
    #[cfg_attr(
        feature = "validation",
        validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))
    )]
    pub latitude: f64,
    #[cfg_attr(
        feature = "validation",
        validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))
    )]
    pub longitude: f64,
}

/// PATCH /api/complaints/{report_id}
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateReportStatusRequest {
    /// Target status name: `Pending`, `InProgress` or `Resolved`.
    pub status: String,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
}
