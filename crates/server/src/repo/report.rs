use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_types::{AppError, Report, ReportStatus, StatusCounts};
use sqlx::{Pool, Postgres};

use super::{report_not_found, ReportStore};
use crate::error_convert::SqlxErrorExt;
use crate::triage::workflow::StatusChange;

const REPORT_COLUMNS: &str = r#"
    report_id, reporter_name, reporter_phone, ward, damage_type, description,
    image_reference, latitude, longitude, ai_confidence, ai_metadata,
    status, assigned_to, created_at, resolved_at, remarks
"#;

/// Row shape of the `reports` table. `status` is checked on the way out so
/// that a `Report` never carries a value outside the workflow.
#[derive(Debug, sqlx::FromRow)]
struct ReportRow {
    report_id: String,
    reporter_name: String,
    reporter_phone: String,
    ward: String,
    damage_type: String,
    description: String,
    image_reference: String,
    latitude: f64,
    longitude: f64,
    ai_confidence: Option<f64>,
    ai_metadata: Option<String>,
    status: String,
    assigned_to: Option<String>,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
    remarks: Option<String>,
}

impl TryFrom<ReportRow> for Report {
    type Error = AppError;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        let status = ReportStatus::from_str_opt(&row.status).ok_or_else(|| {
            AppError::database(format!(
                "report {} has unrecognized status '{}'",
                row.report_id, row.status
            ))
        })?;
        Ok(Report {
            report_id: row.report_id,
            reporter_name: row.reporter_name,
            reporter_phone: row.reporter_phone,
            ward: row.ward,
            damage_type: row.damage_type,
            description: row.description,
            image_reference: row.image_reference,
            latitude: row.latitude,
            longitude: row.longitude,
            ai_confidence: row.ai_confidence,
            ai_metadata: row.ai_metadata,
            status,
            assigned_to: row.assigned_to,
            created_at: row.created_at,
            resolved_at: row.resolved_at,
            remarks: row.remarks,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CountsRow {
    total: i64,
    pending: i64,
    in_progress: i64,
    resolved: i64,
}

/// Postgres-backed report store.
#[derive(Clone)]
pub struct PgReportStore {
    pool: Pool<Postgres>,
}

impl PgReportStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

#[async_trait]
impl ReportStore for PgReportStore {
    #[tracing::instrument(skip_all, fields(report_id = %report.report_id))]
    async fn create(&self, report: &Report) -> Result<Report, AppError> {
        let sql = format!(
            r#"
            INSERT INTO reports
                (report_id, reporter_name, reporter_phone, ward, damage_type, description,
                 image_reference, latitude, longitude, ai_confidence, ai_metadata,
                 status, assigned_to, created_at, resolved_at, remarks)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {REPORT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, ReportRow>(&sql)
            .bind(&report.report_id)
            .bind(&report.reporter_name)
            .bind(&report.reporter_phone)
            .bind(&report.ward)
            .bind(&report.damage_type)
            .bind(&report.description)
            .bind(&report.image_reference)
            .bind(report.latitude)
            .bind(report.longitude)
            .bind(report.ai_confidence)
            .bind(&report.ai_metadata)
            .bind(report.status.as_str())
            .bind(&report.assigned_to)
            .bind(report.created_at)
            .bind(report.resolved_at)
            .bind(&report.remarks)
            .fetch_one(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_app_error)?
            .try_into()
    }

    async fn get_all(&self) -> Result<Vec<Report>, AppError> {
        let sql = format!(
            "SELECT {REPORT_COLUMNS} FROM reports ORDER BY created_at DESC, report_id ASC"
        );
        sqlx::query_as::<_, ReportRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_app_error)?
            .into_iter()
            .map(Report::try_from)
            .collect()
    }

    async fn get_by_id(&self, report_id: &str) -> Result<Report, AppError> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE report_id = $1");
        sqlx::query_as::<_, ReportRow>(&sql)
            .bind(report_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_app_error)?
            .ok_or_else(|| report_not_found(report_id))?
            .try_into()
    }

    /// Single-statement read-modify-write, so concurrent updates to the
    /// same report never lose a field.
    #[tracing::instrument(skip(self, change), fields(status = %change.status))]
    async fn update_status(
        &self,
        report_id: &str,
        change: &StatusChange,
    ) -> Result<Report, AppError> {
        let sql = format!(
            r#"
            UPDATE reports
            SET status = $2,
                remarks = COALESCE($3, remarks),
                assigned_to = COALESCE($4, assigned_to),
                resolved_at = CASE WHEN $5 THEN NOW() ELSE resolved_at END
            WHERE report_id = $1
            RETURNING {REPORT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, ReportRow>(&sql)
            .bind(report_id)
            .bind(change.status.as_str())
            .bind(&change.remarks)
            .bind(&change.assigned_to)
            .bind(change.resolves())
            .fetch_optional(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_app_error)?
            .ok_or_else(|| report_not_found(report_id))?
            .try_into()
    }

    async fn status_counts(&self) -> Result<StatusCounts, AppError> {
        let row = sqlx::query_as::<_, CountsRow>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'Pending') AS pending,
                   COUNT(*) FILTER (WHERE status = 'InProgress') AS in_progress,
                   COUNT(*) FILTER (WHERE status = 'Resolved') AS resolved
            FROM reports
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

        Ok(StatusCounts {
            total: row.total,
            pending: row.pending,
            in_progress: row.in_progress,
            resolved: row.resolved,
        })
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
            .map_err(SqlxErrorExt::into_app_error)
    }
}
