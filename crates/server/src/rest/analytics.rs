use std::sync::Arc;

use axum::{extract::State, Json};
use shared_types::{AppError, StatusCounts};

use crate::repo::ReportStore;
use crate::triage::analytics;

#[utoipa::path(
    get,
    path = "/api/analytics",
    responses(
        (status = 200, description = "Report counts by status", body = StatusCounts)
    ),
    tag = "analytics"
)]
pub async fn get_analytics(
    State(store): State<Arc<dyn ReportStore>>,
) -> Result<Json<StatusCounts>, AppError> {
    let counts = analytics::status_counts(store.as_ref()).await?;
    Ok(Json(counts))
}
