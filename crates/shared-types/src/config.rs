use serde::{Deserialize, Serialize};

/// Feature flags controlling which optional integrations are active.
///
/// Every field defaults to `false` so that a missing or incomplete config
/// file disables all optional features.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FeatureFlags {
    /// Store report photos in S3 instead of the local upload directory.
    #[serde(default)]
    pub s3: bool,
    /// Export traces and logs over OTLP.
    #[serde(default)]
    pub telemetry: bool,
}

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.25;
pub const DEFAULT_MIN_DIMENSION_PX: u32 = 100;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Tunables of the intake and triage pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TriageSettings {
    /// Detections scoring below this are discarded.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(default = "default_min_dimension")]
    pub min_width: u32,
    #[serde(default = "default_min_dimension")]
    pub min_height: u32,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_confidence_threshold() -> f64 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

fn default_min_dimension() -> u32 {
    DEFAULT_MIN_DIMENSION_PX
}

fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

impl Default for TriageSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            min_width: DEFAULT_MIN_DIMENSION_PX,
            min_height: DEFAULT_MIN_DIMENSION_PX,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Top-level config file structure matching `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub features: FeatureFlags,
    #[serde(default)]
    pub triage: TriageSettings,
}
