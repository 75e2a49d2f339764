pub mod analytics;
pub mod report;

use axum::{routing::{get, post}, Router};
use crate::db::AppState;

/// Build the REST API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Intake
        .route("/api/validate-image", post(report::validate_image))
        .route("/api/report", post(report::submit_report))
        // Administration
        .route("/api/complaints", get(report::list_reports))
        .route(
            "/api/complaints/{report_id}",
            get(report::get_report).patch(report::update_report_status),
        )
        .route("/api/reports/{report_id}/image", get(report::get_report_image))
        // Analytics
        .route("/api/analytics", get(analytics::get_analytics))
}
