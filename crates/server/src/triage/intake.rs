use std::sync::Arc;

use axum::body::Bytes;
use chrono::Utc;
use shared_types::{
    AppError, AppErrorKind, ClassificationResult, GeoPoint, PrecheckResponse, Report,
    ReportStatus, SubmitReportFields, TriageSettings, ValidationOutcome,
};
use tracing::Instrument;
use uuid::Uuid;

use super::classifier::DamageClassifier;
use super::geolocation;
use super::image_gate::{self, ImageGateError, ImageInfo};
use crate::db::AppState;
use crate::error_convert::ValidateRequest;

/// Identifier allocation gives up after this many primary-key collisions.
const MAX_ID_ATTEMPTS: usize = 5;

/// A stored report plus the advisory location read from its photo.
#[derive(Debug, Clone)]
pub struct Submission {
    pub report: Report,
    pub metadata_location: Option<GeoPoint>,
}

/// Short tracking code handed to the citizen: 8 uppercase hex characters.
pub fn new_report_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_ascii_uppercase()
}

pub fn check_upload_size(len: usize, settings: &TriageSettings) -> Result<(), AppError> {
    if len > settings.max_upload_bytes {
        return Err(AppError::bad_request(format!(
            "Upload of {len} bytes exceeds the {} byte limit",
            settings.max_upload_bytes
        )));
    }
    Ok(())
}

/// Run the quality gate on the blocking pool.
async fn check_image(image: Bytes, settings: TriageSettings) -> Result<ImageInfo, ImageGateError> {
    tokio::task::spawn_blocking(move || image_gate::inspect(&image, &settings))
        .await
        .unwrap_or_else(|e| Err(ImageGateError::Unreadable(format!("inspection aborted: {e}"))))
}

/// Classify and geolocate concurrently. Neither side can fail the caller:
/// a crashed classifier becomes an `Error` result, a crashed extractor
/// becomes "no location".
async fn analyze(
    classifier: Arc<DamageClassifier>,
    image: Bytes,
) -> (ClassificationResult, Option<GeoPoint>) {
    let classify = tokio::spawn({
        let image = image.clone();
        async move { classifier.classify(image).await }.in_current_span()
    });
    let locate = tokio::task::spawn_blocking(move || geolocation::extract_location(&image));

    let (classification, location) = tokio::join!(classify, locate);

    let classification = classification.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "classification task aborted");
        ClassificationResult::failed(format!("classification aborted: {e}"))
    });
    let location = location.unwrap_or_else(|e| {
        tracing::debug!(error = %e, "geolocation task aborted");
        None
    });
    (classification, location)
}

/// Pre-check an upload without storing anything. A gate rejection is a
/// normal outcome here, reported in `validation` with the AI fields empty.
#[tracing::instrument(skip_all, fields(bytes = image.len()))]
pub async fn precheck(state: &AppState, image: Bytes) -> PrecheckResponse {
    match check_image(image.clone(), state.triage).await {
        Err(rejection) => {
            tracing::info!(reason = %rejection, "pre-check rejected image");
            PrecheckResponse {
                validation: ValidationOutcome::Rejected {
                    kind: rejection.kind(),
                    reason: rejection.to_string(),
                },
                classification: None,
                geolocation: None,
            }
        }
        Ok(info) => {
            let (classification, geolocation) =
                analyze(state.classifier.clone(), image).await;
            PrecheckResponse {
                validation: ValidationOutcome::Accepted {
                    width: info.width,
                    height: info.height,
                },
                classification: Some(classification),
                geolocation,
            }
        }
    }
}

/// Validate, triage and persist a new report.
///
/// The photo is written to the image store before the report row. The
/// stored coordinates are always the submitter's; the photo's own GPS
/// position is returned alongside as advisory.
#[tracing::instrument(skip_all, fields(bytes = image.len(), report_id))]
pub async fn submit(
    state: &AppState,
    fields: SubmitReportFields,
    image: Bytes,
) -> Result<Submission, AppError> {
    check_upload_size(image.len(), &state.triage)?;
    let fields = normalize(fields);
    fields.validate_request()?;

    let info = check_image(image.clone(), state.triage).await.map_err(|rejection| {
        tracing::info!(reason = %rejection, "submission rejected by image gate");
        AppError::from(rejection)
    })?;

    let (classification, metadata_location) =
        analyze(state.classifier.clone(), image.clone()).await;

    for attempt in 1..=MAX_ID_ATTEMPTS {
        let report_id = new_report_id();
        tracing::Span::current().record("report_id", report_id.as_str());

        let image_reference = format!(
            "reports/{report_id}/{}.{}",
            Uuid::new_v4().simple(),
            info.extension()
        );
        state
            .images
            .put(&image_reference, info.content_type(), image.to_vec())
            .await?;

        let report = Report {
            report_id,
            reporter_name: fields.name.clone(),
            reporter_phone: fields.phone.clone(),
            ward: fields.ward.clone(),
            damage_type: fields.damage_type.clone(),
            description: fields.description.clone(),
            image_reference: image_reference.clone(),
            latitude: fields.latitude,
            longitude: fields.longitude,
            ai_confidence: classification.stored_confidence(),
            ai_metadata: classification.stored_metadata(),
            status: ReportStatus::Pending,
            assigned_to: None,
            created_at: Utc::now(),
            resolved_at: None,
            remarks: None,
        };

        match state.store.create(&report).await {
            Ok(report) => {
                tracing::info!(
                    classification = ?classification.status,
                    has_metadata_location = metadata_location.is_some(),
                    "report created"
                );
                return Ok(Submission {
                    report,
                    metadata_location,
                });
            }
            Err(err) => {
                discard_image(state, &image_reference).await;
                if err.kind != AppErrorKind::Conflict {
                    return Err(err);
                }
                tracing::warn!(attempt, "report id collision, regenerating");
            }
        }
    }

    Err(AppError::conflict(
        "Could not allocate a unique report identifier",
    ))
}

async fn discard_image(state: &AppState, key: &str) {
    if let Err(e) = state.images.delete(key).await {
        tracing::warn!(key, error = %e, "failed to remove orphaned report image");
    }
}

fn normalize(fields: SubmitReportFields) -> SubmitReportFields {
    SubmitReportFields {
        name: fields.name.trim().to_string(),
        phone: fields.phone.trim().to_string(),
        ward: fields.ward.trim().to_string(),
        damage_type: fields.damage_type.trim().to_string(),
        description: fields.description.trim().to_string(),
        ..fields
    }
}
