use serde::{Deserialize, Serialize};

use crate::AppErrorKind;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Outcome tag of a damage classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ClassificationStatus {
    Success,
    NoDetection,
    Error,
}

/// Axis-aligned box in image pixel space. Degenerate boxes (`x1 >= x2` or
/// `y1 >= y2`) are passed through as reported by the model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl From<[f64; 4]> for BoundingBox {
    fn from([x1, y1, x2, y2]: [f64; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// Result of running the damage classifier over one photo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ClassificationResult {
    pub status: ClassificationStatus,
    /// Damage label of the winning detection.
    pub label: Option<String>,
    /// Confidence of the winning detection, 0.0 otherwise.
    pub confidence: f64,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Vec<f64>>))]
    pub bbox: Option<BoundingBox>,
    /// Failure detail, only set when `status` is `Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ClassificationResult {
    pub fn detected(label: impl Into<String>, confidence: f64, bbox: BoundingBox) -> Self {
        Self {
            status: ClassificationStatus::Success,
            label: Some(label.into()),
            confidence,
            bbox: Some(bbox),
            message: None,
        }
    }

    pub fn no_detection() -> Self {
        Self {
            status: ClassificationStatus::NoDetection,
            label: None,
            confidence: 0.0,
            bbox: None,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: ClassificationStatus::Error,
            label: None,
            confidence: 0.0,
            bbox: None,
            message: Some(message.into()),
        }
    }

    /// Confidence as stored on a report.
    pub fn stored_confidence(&self) -> Option<f64> {
        match self.status {
            ClassificationStatus::Success => Some(self.confidence),
            ClassificationStatus::NoDetection | ClassificationStatus::Error => None,
        }
    }

    /// Serialized bounding box as stored on a report.
    pub fn stored_metadata(&self) -> Option<String> {
        match (self.status, self.bbox) {
            (ClassificationStatus::Success, Some(bbox)) => {
                serde_json::to_string(&<[f64; 4]>::from(bbox)).ok()
            }
            (ClassificationStatus::Error, _) => None,
            _ => Some("[]".to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Geolocation
// ---------------------------------------------------------------------------

/// Decimal-degree coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

// ---------------------------------------------------------------------------
// Pre-check
// ---------------------------------------------------------------------------

/// Whether an uploaded photo passed the quality gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "outcome")]
pub enum ValidationOutcome {
    Accepted { width: u32, height: u32 },
    Rejected { kind: AppErrorKind, reason: String },
}

/// POST /api/validate-image response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PrecheckResponse {
    pub validation: ValidationOutcome,
    /// `None` when the photo was rejected before classification.
    pub classification: Option<ClassificationResult>,
    /// `None` when rejected, or when the photo carries no usable location.
    pub geolocation: Option<GeoPoint>,
}
