use std::sync::Arc;

use axum::extract::FromRef;
use shared_types::{AppError, TriageSettings};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

use crate::config::env_parse;
use crate::repo::{MemoryReportStore, PgReportStore, ReportStore};
use crate::storage::{ImageStore, LocalImageStore, MemoryImageStore, S3ImageStore};
use crate::triage::classifier::DamageClassifier;
use crate::triage::model::{DetectionModel, DisabledModel, RemoteDetectionModel};

/// Shared application state passed to Axum handlers via `State`.
/// Derives `FromRef` so handlers can extract a single collaborator directly.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub store: Arc<dyn ReportStore>,
    pub images: Arc<dyn ImageStore>,
    pub classifier: Arc<DamageClassifier>,
    pub triage: TriageSettings,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ReportStore>,
        images: Arc<dyn ImageStore>,
        model: Arc<dyn DetectionModel>,
        triage: TriageSettings,
    ) -> Self {
        Self {
            store,
            images,
            classifier: Arc::new(DamageClassifier::new(model, triage.confidence_threshold)),
            triage,
        }
    }

    /// Fully in-process state: memory report store and memory image store.
    pub fn in_memory(model: Arc<dyn DetectionModel>, triage: TriageSettings) -> Self {
        Self::new(
            Arc::new(MemoryReportStore::new()),
            Arc::new(MemoryImageStore::new()),
            model,
            triage,
        )
    }

    /// Build state from the loaded config and environment.
    ///
    /// - `REPORT_STORE`: `postgres` (default) or `memory`
    /// - `MODEL_URL`: detection service; unset disables classification
    /// - `features.s3`: S3 image storage, otherwise `UPLOAD_DIR`
    pub async fn from_env(triage: TriageSettings) -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let flags = crate::config::feature_flags();

        let store: Arc<dyn ReportStore> =
            match std::env::var("REPORT_STORE").unwrap_or_default().as_str() {
                "memory" => {
                    tracing::warn!("using in-memory report store, reports will not persist");
                    Arc::new(MemoryReportStore::new())
                }
                _ => {
                    let pool = create_pool()?;
                    run_migrations(&pool).await?;
                    Arc::new(PgReportStore::new(pool))
                }
            };

        let images: Arc<dyn ImageStore> = if flags.s3 {
            let s3 = S3ImageStore::from_env()?;
            s3.ensure_bucket().await;
            Arc::new(s3)
        } else {
            Arc::new(LocalImageStore::from_env())
        };

        let model: Arc<dyn DetectionModel> = match RemoteDetectionModel::from_env()
            .map_err(|e| AppError::internal(e.to_string()))?
        {
            Some(remote) => Arc::new(remote),
            None => {
                tracing::warn!("MODEL_URL not set, damage classification disabled");
                Arc::new(DisabledModel)
            }
        };

        Ok(Self::new(store, images, model, triage))
    }
}

/// Create a new database connection pool from environment variables.
/// Uses `connect_lazy` so no connections open until the first query.
pub fn create_pool() -> Result<Pool<Postgres>, AppError> {
    // Load .env file if present (ignored in production where env vars are set directly).
    let _ = dotenvy::dotenv();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| AppError::internal("DATABASE_URL must be set"))?;
    let max_connections: u32 = env_parse("DATABASE_MAX_CONNECTIONS", 10);

    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect_lazy(&database_url)
        .map_err(|e| AppError::database(format!("Failed to create database pool: {e}")))
}

/// Run database migrations against the given pool.
pub async fn run_migrations(pool: &Pool<Postgres>) -> Result<(), AppError> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to run database migrations: {e}")))
}
