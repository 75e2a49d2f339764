use shared_types::{AppConfig, FeatureFlags, TriageSettings};
use std::sync::OnceLock;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Path to the config file, relative to the project root.
const CONFIG_PATH: &str = "config.toml";

/// Read `config.toml`, parse it, and store it in the global `OnceLock`.
/// Safe to call multiple times; only the first call has effect.
///
/// If the file is missing or unparseable, every setting takes its default.
pub fn load_config() -> &'static AppConfig {
    CONFIG.get_or_init(|| match std::fs::read_to_string(CONFIG_PATH) {
        Ok(contents) => parse_config(&contents),
        Err(e) => {
            tracing::warn!("{CONFIG_PATH} not found ({e}), using defaults");
            AppConfig::default()
        }
    })
}

fn parse_config(contents: &str) -> AppConfig {
    match toml::from_str::<AppConfig>(contents) {
        Ok(config) => {
            tracing::info!(
                features = ?config.features,
                triage = ?config.triage,
                "loaded {CONFIG_PATH}"
            );
            config
        }
        Err(e) => {
            tracing::warn!("failed to parse {CONFIG_PATH}: {e}, using defaults");
            AppConfig::default()
        }
    }
}

/// Get the loaded feature flags. Returns all-false defaults if
/// `load_config()` hasn't been called yet.
pub fn feature_flags() -> &'static FeatureFlags {
    static DEFAULT: FeatureFlags = FeatureFlags {
        s3: false,
        telemetry: false,
    };
    CONFIG.get().map(|c| &c.features).unwrap_or(&DEFAULT)
}

/// Get the loaded triage settings, or the reference defaults.
pub fn triage_settings() -> TriageSettings {
    CONFIG.get().map(|c| c.triage).unwrap_or_default()
}

/// Read an env var, trying the primary name first then a fallback.
pub fn env_or(primary: &str, fallback: &str) -> Option<String> {
    std::env::var(primary)
        .ok()
        .or_else(|| std::env::var(fallback).ok())
}

/// Read and parse an env var, falling back to `default` when unset or invalid.
pub fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
