use axum::extract::DefaultBodyLimit;
use axum::Router;
use shared_types::{
    AppError, AppErrorKind, ClassificationResult, ClassificationStatus, GeoPoint,
    PrecheckResponse, ReportResponse, ReportStatus, ReportSummary, StatusCounts,
    SubmitReportResponse, UpdateReportStatusRequest, ValidationOutcome,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::db::AppState;
use crate::health::{self, HealthResponse};
use crate::rest::{self, report::{ImageUploadForm, SubmitReportForm}};

/// Room for multipart boundaries and text parts on top of the photo itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        rest::report::validate_image,
        rest::report::submit_report,
        rest::report::list_reports,
        rest::report::get_report,
        rest::report::update_report_status,
        rest::report::get_report_image,
        rest::analytics::get_analytics,
    ),
    components(schemas(
        AppError,
        AppErrorKind,
        ClassificationResult,
        ClassificationStatus,
        GeoPoint,
        HealthResponse,
        ImageUploadForm,
        PrecheckResponse,
        ReportResponse,
        ReportStatus,
        ReportSummary,
        StatusCounts,
        SubmitReportForm,
        SubmitReportResponse,
        UpdateReportStatusRequest,
        ValidationOutcome,
    )),
    tags(
        (name = "reports", description = "Road damage report intake and administration"),
        (name = "analytics", description = "Report counts by status"),
        (name = "health", description = "Health check endpoint")
    ),
    info(
        title = "Road Damage Reporting API",
        description = "Citizen road damage reports with automated photo triage",
        version = "1.0.0"
    )
)]
pub struct ApiDoc;

/// Build an Axum router that serves the API docs at `/docs`,
/// the health check, and the REST API at `/api/*`.
pub fn api_router(state: AppState) -> Router {
    let body_limit = state.triage.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .merge(rest::api_router())
        .route("/health", axum::routing::get(health::health_check))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
}
