use std::net::SocketAddr;

use server::config::{env_parse, feature_flags, load_config, triage_settings};
use server::db::AppState;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 8080;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let config = load_config();
    let flags = feature_flags();
    tracing::info!(
        s3 = flags.s3,
        telemetry = flags.telemetry,
        threshold = config.triage.confidence_threshold,
        "configuration loaded"
    );

    if flags.telemetry {
        server::telemetry::init_telemetry()?;
    }
    server::health::record_start_time();

    let state = AppState::from_env(triage_settings()).await?;

    let mut router = server::openapi::api_router(state);
    if flags.telemetry {
        router = router.layer(server::telemetry::OtelTraceLayer);
    }

    let router = router
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let port: u16 = env_parse("PORT", DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "road damage API listening, docs at /docs");

    axum::serve(listener, router).await?;
    Ok(())
}
