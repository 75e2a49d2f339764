use std::sync::Arc;

use axum::body::Bytes;
use shared_types::ClassificationResult;

use super::model::{Detection, DetectionModel, ModelError};

/// Pick the detection with the highest confidence among those at or above
/// `threshold`. On equal confidence the earliest detection wins.
pub fn select_best(detections: &[Detection], threshold: f64) -> Option<&Detection> {
    detections
        .iter()
        .filter(|d| d.confidence >= threshold)
        .fold(None, |best: Option<&Detection>, d| match best {
            Some(b) if b.confidence >= d.confidence => Some(b),
            _ => Some(d),
        })
}

/// Reduces raw model output to a single [`ClassificationResult`].
pub struct DamageClassifier {
    model: Arc<dyn DetectionModel>,
    threshold: f64,
}

impl DamageClassifier {
    pub fn new(model: Arc<dyn DetectionModel>, threshold: f64) -> Self {
        Self { model, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Classify one photo. Model failures come back as an `Error` result
    /// rather than an `Err`, so intake can still store the report.
    #[tracing::instrument(skip_all, fields(bytes = image.len()))]
    pub async fn classify(&self, image: Bytes) -> ClassificationResult {
        match self.try_classify(image).await {
            Ok(result) => {
                tracing::info!(status = ?result.status, label = ?result.label, confidence = result.confidence, "classified");
                result
            }
            Err(e) => {
                tracing::warn!(error = %e, "damage classification failed");
                ClassificationResult::failed(e.to_string())
            }
        }
    }

    async fn try_classify(&self, image: Bytes) -> Result<ClassificationResult, ModelError> {
        let detections = self.model.predict(image).await?;

        if let Some(bad) = detections
            .iter()
            .find(|d| !(0.0..=1.0).contains(&d.confidence))
        {
            return Err(ModelError::Malformed(format!(
                "confidence {} is outside [0, 1]",
                bad.confidence
            )));
        }

        let Some(best) = select_best(&detections, self.threshold) else {
            return Ok(ClassificationResult::no_detection());
        };

        let label = self
            .model
            .label(best.class_id)
            .await?
            .ok_or_else(|| ModelError::Malformed(format!("unknown class id {}", best.class_id)))?;

        Ok(ClassificationResult::detected(label, best.confidence, best.bbox))
    }
}
