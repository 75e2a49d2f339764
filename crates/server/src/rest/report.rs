use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use shared_types::{
    AppError, PrecheckResponse, ReportResponse, ReportSummary, SubmitReportFields,
    SubmitReportResponse, TriageSettings, UpdateReportStatusRequest,
};

use crate::db::AppState;
use crate::repo::ReportStore;
use crate::storage::ImageStore;
use crate::triage::{intake, workflow::StatusChange};

/// Multipart body of `POST /api/validate-image`.
#[derive(utoipa::ToSchema)]
#[allow(dead_code)]
pub struct ImageUploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// Multipart body of `POST /api/report`.
#[derive(utoipa::ToSchema)]
#[allow(dead_code)]
pub struct SubmitReportForm {
    pub name: String,
    pub phone: String,
    pub ward: String,
    pub damage_type: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

/// Text parts and the single file part of a multipart upload.
struct UploadParts {
    text: HashMap<String, String>,
    file: Option<Bytes>,
}

/// Drain a multipart body. `file_field` names the part that carries the
/// photo; every other part is read as text.
async fn read_upload(
    mut multipart: Multipart,
    file_field: &str,
    settings: &TriageSettings,
) -> Result<UploadParts, AppError> {
    let mut parts = UploadParts {
        text: HashMap::new(),
        file: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == file_field {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::bad_request(format!("Failed to read upload: {e}")))?;
            intake::check_upload_size(bytes.len(), settings)?;
            parts.file = Some(bytes);
        } else if !name.is_empty() {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::bad_request(format!("Failed to read field '{name}': {e}")))?;
            parts.text.insert(name, value);
        }
    }

    Ok(parts)
}

impl UploadParts {
    fn take_file(&mut self, field: &str) -> Result<Bytes, AppError> {
        self.file
            .take()
            .ok_or_else(|| AppError::bad_request(format!("'{field}' file is required")))
    }

    fn text(&self, field: &str) -> String {
        self.text.get(field).cloned().unwrap_or_default()
    }

    fn coordinate(&self, field: &str) -> Result<f64, AppError> {
        self.text
            .get(field)
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                let mut errors = HashMap::new();
                errors.insert(field.to_string(), format!("{field} must be a number"));
                AppError::validation("Validation failed", errors)
            })
    }

    fn submission_fields(&self) -> Result<SubmitReportFields, AppError> {
        Ok(SubmitReportFields {
            name: self.text("name"),
            phone: self.text("phone"),
            ward: self.text("ward"),
            damage_type: self.text("damage_type"),
            description: self.text("description"),
            latitude: self.coordinate("latitude")?,
            longitude: self.coordinate("longitude")?,
        })
    }
}

// ---------------------------------------------------------------------------
// POST /api/validate-image
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/validate-image",
    request_body(content = ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Quality gate, classification and photo location", body = PrecheckResponse),
        (status = 400, description = "Missing file or upload too large", body = AppError)
    ),
    tag = "reports"
)]
pub async fn validate_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<PrecheckResponse>, AppError> {
    let mut parts = read_upload(multipart, "file", &state.triage).await?;
    let image = parts.take_file("file")?;
    Ok(Json(intake::precheck(&state, image).await))
}

// ---------------------------------------------------------------------------
// POST /api/report
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/report",
    request_body(content = SubmitReportForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Report registered", body = SubmitReportResponse),
        (status = 400, description = "Missing image or upload too large", body = AppError),
        (status = 415, description = "Upload is not a readable image", body = AppError),
        (status = 422, description = "Invalid fields or image below minimum resolution", body = AppError)
    ),
    tag = "reports"
)]
pub async fn submit_report(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitReportResponse>), AppError> {
    let mut parts = read_upload(multipart, "image", &state.triage).await?;
    let fields = parts.submission_fields()?;
    let image = parts.take_file("image")?;

    let submission = intake::submit(&state, fields, image).await?;
    let report_id = submission.report.report_id.clone();

    Ok((
        StatusCode::CREATED,
        Json(SubmitReportResponse {
            message: "Report registered successfully".to_string(),
            report_id,
            report: ReportResponse::from(submission.report),
            metadata_location: submission.metadata_location,
        }),
    ))
}

// ---------------------------------------------------------------------------
// GET /api/complaints
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/complaints",
    responses(
        (status = 200, description = "All reports, newest first", body = Vec<ReportSummary>)
    ),
    tag = "reports"
)]
pub async fn list_reports(
    State(store): State<Arc<dyn ReportStore>>,
) -> Result<Json<Vec<ReportSummary>>, AppError> {
    let reports = store.get_all().await?;
    Ok(Json(reports.into_iter().map(ReportSummary::from).collect()))
}

// ---------------------------------------------------------------------------
// GET /api/complaints/{report_id}
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/complaints/{report_id}",
    params(
        ("report_id" = String, Path, description = "8-character report tracking code")
    ),
    responses(
        (status = 200, description = "Report", body = ReportResponse),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "reports"
)]
pub async fn get_report(
    State(store): State<Arc<dyn ReportStore>>,
    Path(report_id): Path<String>,
) -> Result<Json<ReportResponse>, AppError> {
    let report = store.get_by_id(&report_id).await?;
    Ok(Json(ReportResponse::from(report)))
}

// ---------------------------------------------------------------------------
// PATCH /api/complaints/{report_id}
// ---------------------------------------------------------------------------

#[utoipa::path(
    patch,
    path = "/api/complaints/{report_id}",
    params(
        ("report_id" = String, Path, description = "8-character report tracking code")
    ),
    request_body = UpdateReportStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ReportResponse),
        (status = 400, description = "Unrecognized or missing status, or a body that is not JSON", body = AppError),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "reports"
)]
pub async fn update_report_status(
    State(store): State<Arc<dyn ReportStore>>,
    Path(report_id): Path<String>,
    body: Result<Json<UpdateReportStatusRequest>, JsonRejection>,
) -> Result<Json<ReportResponse>, AppError> {
    let Json(body) = body.map_err(status_body_rejection)?;
    let change = StatusChange::parse(&body)?;
    let report = store.update_status(&report_id, &change).await?;
    tracing::info!(report_id = %report.report_id, status = %report.status, "report status updated");
    Ok(Json(ReportResponse::from(report)))
}

/// Well-formed JSON whose `status` is missing or not a string is an
/// unrecognized status; anything that is not JSON at all is a bad request.
fn status_body_rejection(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::JsonDataError(e) => AppError::invalid_status(format!(
            "Invalid status update: {}",
            e.body_text()
        )),
        other => AppError::bad_request(other.body_text()),
    }
}

// ---------------------------------------------------------------------------
// GET /api/reports/{report_id}/image
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/reports/{report_id}/image",
    params(
        ("report_id" = String, Path, description = "8-character report tracking code")
    ),
    responses(
        (status = 200, description = "The submitted photo bytes"),
        (status = 404, description = "Report or photo not found", body = AppError)
    ),
    tag = "reports"
)]
pub async fn get_report_image(
    State(store): State<Arc<dyn ReportStore>>,
    State(images): State<Arc<dyn ImageStore>>,
    Path(report_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let report = store.get_by_id(&report_id).await?;
    let bytes = images.get(&report.image_reference).await?;
    let content_type = image::ImageFormat::from_path(&report.image_reference)
        .map(|f| f.to_mime_type())
        .unwrap_or("application/octet-stream");
    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}
