use axum::{body::Body, http::Request, response::Response};
use opentelemetry::{
    global,
    trace::{SpanKind, TraceContextExt, Tracer},
    Context, KeyValue,
};
use opentelemetry_otlp::{WithExportConfig, WithTonicConfig};
use std::{
    future::Future,
    pin::Pin,
    sync::OnceLock,
    task::{Context as TaskContext, Poll},
};
use tower::{Layer, Service};

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const TRACER_NAME: &str = "road-damage";

/// Keep the LoggerProvider alive for the process lifetime.
static LOGGER_PROVIDER: OnceLock<opentelemetry_sdk::logs::SdkLoggerProvider> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to build OTLP {signal} exporter: {reason}")]
    Exporter { signal: &'static str, reason: String },
    #[error("SIGNOZ_INGESTION_KEY is not a valid gRPC metadata value")]
    InvalidIngestionKey,
}

fn ingestion_metadata() -> Result<Option<opentelemetry_otlp::tonic_types::metadata::MetadataMap>, TelemetryError> {
    let Some(key) = std::env::var("SIGNOZ_INGESTION_KEY").ok().filter(|k| !k.is_empty()) else {
        return Ok(None);
    };
    let mut metadata = opentelemetry_otlp::tonic_types::metadata::MetadataMap::new();
    metadata.insert(
        "signoz-ingestion-key",
        key.parse().map_err(|_| TelemetryError::InvalidIngestionKey)?,
    );
    Ok(Some(metadata))
}

fn tls_config(endpoint: &str) -> Option<opentelemetry_otlp::tonic_types::transport::ClientTlsConfig> {
    endpoint.starts_with("https://").then(|| {
        opentelemetry_otlp::tonic_types::transport::ClientTlsConfig::new().with_native_roots()
    })
}

/// Set up the OpenTelemetry TracerProvider and LoggerProvider and register
/// them globally. Must be called from inside a Tokio runtime.
///
/// Returns `Ok(false)` when `OTEL_EXPORTER_OTLP_ENDPOINT` is unset.
///
/// Reads config from environment:
///   - `OTEL_EXPORTER_OTLP_ENDPOINT`: collector gRPC address
///       Local: `http://localhost:4317`
///       SigNoz Cloud: `https://ingest.{region}.signoz.cloud:443`
///   - `OTEL_SERVICE_NAME`: service name tag (default: `road-damage`)
///   - `SIGNOZ_INGESTION_KEY`: SigNoz Cloud access token (optional for local)
///   - `DEPLOY_ENV`: deployment environment tag (default: `development`)
pub fn init_telemetry() -> Result<bool, TelemetryError> {
    let _ = dotenvy::dotenv();

    let endpoint = match std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        Ok(ep) => ep,
        Err(_) => {
            tracing::info!("OTEL_EXPORTER_OTLP_ENDPOINT not set, skipping OTLP telemetry");
            return Ok(false);
        }
    };

    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| TRACER_NAME.to_string());
    let environment = std::env::var("DEPLOY_ENV").unwrap_or_else(|_| "development".to_string());
    let metadata = ingestion_metadata()?;

    let mut builder = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint);
    if let Some(tls) = tls_config(&endpoint) {
        builder = builder.with_tls_config(tls);
    }
    if let Some(md) = metadata.clone() {
        builder = builder.with_metadata(md);
    }
    let exporter = builder.build().map_err(|e| TelemetryError::Exporter {
        signal: "span",
        reason: e.to_string(),
    })?;

    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(service_name)
        .with_attribute(KeyValue::new("service.version", APP_VERSION))
        .with_attribute(KeyValue::new("deployment.environment", environment))
        .build();

    let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource.clone())
        .build();

    global::set_tracer_provider(provider);

    // -- Log exporter (uses the `log` crate, not the `tracing` subscriber) --
    let mut log_builder = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint);
    if let Some(tls) = tls_config(&endpoint) {
        log_builder = log_builder.with_tls_config(tls);
    }
    if let Some(md) = metadata.clone() {
        log_builder = log_builder.with_metadata(md);
    }
    let log_exporter = log_builder.build().map_err(|e| TelemetryError::Exporter {
        signal: "log",
        reason: e.to_string(),
    })?;

    let logger_provider = LOGGER_PROVIDER.get_or_init(|| {
        opentelemetry_sdk::logs::SdkLoggerProvider::builder()
            .with_batch_exporter(log_exporter)
            .with_resource(resource)
            .build()
    });

    // Bridge the `log` crate into OpenTelemetry.
    let bridge = opentelemetry_appender_log::OpenTelemetryLogBridge::new(logger_provider);
    match log::set_boxed_logger(Box::new(bridge)) {
        Ok(()) => {
            log::set_max_level(log::LevelFilter::Info);
            log::info!("log bridge active");
        }
        Err(_) => tracing::warn!("log bridge skipped, a `log` logger is already set"),
    }

    let mode = if metadata.is_some() { "cloud" } else { "local" };
    tracing::info!(
        version = APP_VERSION,
        endpoint = %endpoint,
        mode,
        "telemetry initialized, traces and logs exporting"
    );
    Ok(true)
}

/// Detect client platform from User-Agent and optional X-Client-Platform header.
///
/// Priority: explicit `X-Client-Platform` header > User-Agent heuristic.
/// Field reporting apps that send no User-Agent show as "native".
fn detect_platform(ua: &str, explicit: Option<&str>) -> &'static str {
    if let Some(p) = explicit {
        return match p {
            "ios" => "ios",
            "android" => "android",
            "web" => "web",
            "dashboard" => "dashboard",
            _ => "unknown",
        };
    }

    if ua == "unknown" || ua.is_empty() {
        return "native";
    }
    if ua.contains("iPhone") || ua.contains("iPad") || ua.contains("CFNetwork") {
        "ios"
    } else if ua.contains("Android") {
        "android"
    } else if ua.contains("Mozilla") || ua.contains("Chrome") || ua.contains("Safari") {
        "web"
    } else {
        "native"
    }
}

/// Collapse report ids in a path so spans group by route:
/// `/api/complaints/A1B2C3D4` becomes `/api/complaints/{report_id}`.
fn route_template(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            let is_report_id = segment.len() == 8
                && segment
                    .chars()
                    .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase());
            if is_report_id {
                "{report_id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Tower layer that creates an OpenTelemetry span for each HTTP request.
///
/// Captures: method, route, user-agent, client platform, request ID and
/// response status.
#[derive(Clone)]
pub struct OtelTraceLayer;

impl<S> Layer<S> for OtelTraceLayer {
    type Service = OtelTraceService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        OtelTraceService { inner }
    }
}

#[derive(Clone)]
pub struct OtelTraceService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for OtelTraceService<S>
where
    S: Service<Request<Body>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let tracer = global::tracer(TRACER_NAME);
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        let user_agent = req
            .headers()
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        let explicit_platform = req
            .headers()
            .get("x-client-platform")
            .and_then(|v| v.to_str().ok());
        let client_platform = detect_platform(&user_agent, explicit_platform);

        let request_id = req
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let route = route_template(&path);
        let attributes = vec![
            KeyValue::new("http.method", method.clone()),
            KeyValue::new("http.target", path),
            KeyValue::new("http.route", route.clone()),
            KeyValue::new("http.user_agent", user_agent),
            KeyValue::new("client.platform", client_platform),
            KeyValue::new("http.request_id", request_id),
        ];

        let span = tracer
            .span_builder(format!("{} {}", &method, &route))
            .with_kind(SpanKind::Server)
            .with_attributes(attributes)
            .start(&tracer);

        let cx = Context::current_with_span(span);
        let mut inner = self.inner.clone();

        let guard = cx.clone().attach();
        let future = inner.call(req);
        drop(guard);

        Box::pin(async move {
            let response = future.await?;

            let span = cx.span();
            let status = response.status();
            span.set_attribute(KeyValue::new("http.status_code", status.as_u16() as i64));

            if status.is_server_error() {
                span.set_status(opentelemetry::trace::Status::error(status.to_string()));
            } else if status.is_client_error() {
                span.set_attribute(KeyValue::new("error.type", "client_error"));
            }

            Ok(response)
        })
    }
}
