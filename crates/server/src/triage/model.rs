use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use serde::Deserialize;
use shared_types::BoundingBox;
use tokio::sync::OnceCell;

use crate::config::env_parse;

const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 30;

/// One candidate finding returned by the detection model.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Detection {
    pub class_id: u32,
    pub confidence: f64,
    /// `[x1, y1, x2, y2]` in image pixel space.
    pub bbox: BoundingBox,
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("detection model is not configured")]
    Disabled,
    #[error("detection service request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("detection service returned {status}: {body}")]
    Service { status: u16, body: String },
    #[error("detection model returned malformed output: {0}")]
    Malformed(String),
}

/// Black-box object detector plus its class label table.
#[async_trait]
pub trait DetectionModel: Send + Sync {
    async fn predict(&self, image: Bytes) -> Result<Vec<Detection>, ModelError>;

    async fn label(&self, class_id: u32) -> Result<Option<String>, ModelError>;
}

/// Stand-in used when no inference service is configured. Every prediction
/// fails, so reports are stored with empty AI fields.
pub struct DisabledModel;

#[async_trait]
impl DetectionModel for DisabledModel {
    async fn predict(&self, _image: Bytes) -> Result<Vec<Detection>, ModelError> {
        Err(ModelError::Disabled)
    }

    async fn label(&self, _class_id: u32) -> Result<Option<String>, ModelError> {
        Ok(None)
    }
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    detections: Vec<Detection>,
}

/// HTTP client for a detection inference service.
///
/// - `POST {base}/predict` with the raw image bytes returns
///   `{"detections": [{"class_id", "confidence", "bbox"}]}`.
/// - `GET {base}/labels` returns `{"0": "pothole", ...}`. The table is
///   fetched on first use and cached for the life of the process.
pub struct RemoteDetectionModel {
    client: reqwest::Client,
    base_url: String,
    labels: OnceCell<HashMap<u32, String>>,
}

impl RemoteDetectionModel {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            labels: OnceCell::new(),
        })
    }

    /// Build from `MODEL_URL` / `MODEL_TIMEOUT_SECS`. Returns `None` when no
    /// URL is configured.
    pub fn from_env() -> Result<Option<Self>, ModelError> {
        let Some(url) = std::env::var("MODEL_URL").ok().filter(|u| !u.trim().is_empty()) else {
            return Ok(None);
        };
        let timeout = Duration::from_secs(env_parse("MODEL_TIMEOUT_SECS", DEFAULT_MODEL_TIMEOUT_SECS));
        Self::new(url, timeout).map(Some)
    }

    async fn fetch_labels(&self) -> Result<HashMap<u32, String>, ModelError> {
        let response = self
            .client
            .get(format!("{}/labels", self.base_url))
            .send()
            .await?;
        let response = check_status(response).await?;
        let raw: HashMap<String, String> = response.json().await?;
        Ok(parse_label_table(raw))
    }
}

#[async_trait]
impl DetectionModel for RemoteDetectionModel {
    #[tracing::instrument(skip_all, fields(bytes = image.len()))]
    async fn predict(&self, image: Bytes) -> Result<Vec<Detection>, ModelError> {
        let response = self
            .client
            .post(format!("{}/predict", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image)
            .send()
            .await?;
        let response = check_status(response).await?;
        let body: PredictResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Malformed(e.to_string()))?;
        tracing::debug!(count = body.detections.len(), "detections received");
        Ok(body.detections)
    }

    async fn label(&self, class_id: u32) -> Result<Option<String>, ModelError> {
        let labels = self
            .labels
            .get_or_try_init(|| self.fetch_labels())
            .await?;
        Ok(labels.get(&class_id).cloned())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ModelError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(ModelError::Service { status, body })
}

fn parse_label_table(raw: HashMap<String, String>) -> HashMap<u32, String> {
    raw.into_iter()
        .filter_map(|(id, label)| match id.trim().parse::<u32>() {
            Ok(id) => Some((id, label)),
            Err(_) => {
                tracing::warn!(class_id = %id, "ignoring non-numeric class id in label table");
                None
            }
        })
        .collect()
}
