use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{Request, StatusCode},
    Router,
};
use image::{DynamicImage, ImageFormat, RgbImage};
use serde_json::Value;
use server::db::AppState;
use server::repo::MemoryReportStore;
use server::storage::MemoryImageStore;
use server::triage::model::{Detection, DetectionModel, ModelError};
use shared_types::{BoundingBox, TriageSettings};
use tower::ServiceExt;

const BOUNDARY: &str = "road-damage-test-boundary";

/// Detection model with canned output and the labels
/// `{0: "pothole", 1: "crack"}`.
pub struct StubModel {
    detections: Result<Vec<Detection>, String>,
    labels: HashMap<u32, String>,
}

impl StubModel {
    pub fn detecting(detections: &[(u32, f64)]) -> Self {
        let detections = detections
            .iter()
            .map(|&(class_id, confidence)| Detection {
                class_id,
                confidence,
                bbox: BoundingBox::from([10.0, 20.0, 110.0, 220.0]),
            })
            .collect();
        Self {
            detections: Ok(detections),
            labels: HashMap::from([(0, "pothole".to_string()), (1, "crack".to_string())]),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            detections: Err(message.to_string()),
            labels: HashMap::new(),
        }
    }
}

#[async_trait]
impl DetectionModel for StubModel {
    async fn predict(&self, _image: Bytes) -> Result<Vec<Detection>, ModelError> {
        self.detections.clone().map_err(|body| ModelError::Service {
            status: 503,
            body,
        })
    }

    async fn label(&self, class_id: u32) -> Result<Option<String>, ModelError> {
        Ok(self.labels.get(&class_id).cloned())
    }
}

/// Build a test router over in-memory report and image stores.
/// The default model reports a single pothole at 0.9. The image store is
/// returned separately so tests can count stored photos.
pub async fn test_app() -> (Router, AppState, Arc<MemoryImageStore>) {
    test_app_with(StubModel::detecting(&[(0, 0.9)])).await
}

pub async fn test_app_with(model: StubModel) -> (Router, AppState, Arc<MemoryImageStore>) {
    let images = Arc::new(MemoryImageStore::new());
    let state = AppState::new(
        Arc::new(MemoryReportStore::new()),
        images.clone(),
        Arc::new(model),
        TriageSettings::default(),
    );
    let router = server::openapi::api_router(state.clone());
    (router, state, images)
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

pub fn png(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Png)
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Jpeg)
}

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([90, 90, 90])))
        .write_to(&mut out, format)
        .unwrap();
    out.into_inner()
}

/// Degrees/minutes/seconds as EXIF rationals.
pub type Dms = [(u32, u32); 3];

/// A JPEG carrying an EXIF GPS block with the given references and values.
pub fn jpeg_with_gps(width: u32, height: u32, lat_ref: &str, lat: Dms, lon_ref: &str, lon: Dms) -> Vec<u8> {
    let jpeg = jpeg(width, height);
    let tiff = gps_tiff(lat_ref, lat, lon_ref, lon);

    let mut app1 = b"Exif\0\0".to_vec();
    app1.extend_from_slice(&tiff);

    let mut out = Vec::with_capacity(jpeg.len() + app1.len() + 4);
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((app1.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(&app1);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// Little-endian TIFF with IFD0 pointing at a GPS IFD holding
/// latitude/longitude and their references.
fn gps_tiff(lat_ref: &str, lat: Dms, lon_ref: &str, lon: Dms) -> Vec<u8> {
    const ASCII: u16 = 2;
    const LONG: u16 = 4;
    const RATIONAL: u16 = 5;

    let gps_ifd: u32 = 8 + 2 + 12 + 4;
    let data_start: u32 = gps_ifd + 2 + 12 * 4 + 4;
    let ascii = |r: &str| [r.as_bytes()[0], 0, 0, 0];

    let entries: [(u16, u16, u32, [u8; 4]); 4] = [
        (1, ASCII, 2, ascii(lat_ref)),
        (2, RATIONAL, 3, data_start.to_le_bytes()),
        (3, ASCII, 2, ascii(lon_ref)),
        (4, RATIONAL, 3, (data_start + 24).to_le_bytes()),
    ];

    let mut out = Vec::new();
    out.extend_from_slice(b"II");
    out.extend_from_slice(&42u16.to_le_bytes());
    out.extend_from_slice(&8u32.to_le_bytes());

    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&0x8825u16.to_le_bytes());
    out.extend_from_slice(&LONG.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&gps_ifd.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());

    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for (tag, ty, count, value) in entries {
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&ty.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&value);
    }
    out.extend_from_slice(&0u32.to_le_bytes());

    for (num, den) in lat.into_iter().chain(lon) {
        out.extend_from_slice(&num.to_le_bytes());
        out.extend_from_slice(&den.to_le_bytes());
    }
    out
}

// ---------------------------------------------------------------------------
// Multipart
// ---------------------------------------------------------------------------

/// One part of a multipart form.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// The text fields of a complete, valid report submission.
pub fn report_fields() -> Vec<(&'static str, &'static str)> {
    vec![
        ("name", "Asha Rao"),
        ("phone", "5550100"),
        ("ward", "Ward 7"),
        ("damage_type", "pothole"),
        ("description", "Deep pothole near the bus stop"),
        ("latitude", "12.9716"),
        ("longitude", "77.5946"),
    ]
}

/// POST a report built from `fields` plus `image` as the photo part.
pub async fn submit_report(
    app: &Router,
    fields: &[(&str, &str)],
    image: &[u8],
) -> (StatusCode, Value) {
    let mut parts: Vec<Part<'_>> = fields.iter().map(|&(k, v)| Part::Text(k, v)).collect();
    parts.push(Part::File("image", "road.jpg", image));
    post_multipart(app, "/api/report", &parts).await
}

/// Submit a valid report and return its id.
pub async fn create_test_report(app: &Router) -> String {
    let (status, body) = submit_report(app, &report_fields(), &jpeg(400, 300)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["report_id"].as_str().unwrap().to_string()
}

pub async fn precheck(app: &Router, image: &[u8]) -> (StatusCode, Value) {
    post_multipart(app, "/api/validate-image", &[Part::File("file", "photo.jpg", image)]).await
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn post_multipart(app: &Router, uri: &str, parts: &[Part<'_>]) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();

    send(app, req).await
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, req).await
}

pub async fn patch_json(app: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("PATCH")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    send(app, req).await
}

/// Send a request through the router and parse the response.
async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body_bytes) = send_raw(app, req).await;

    let body: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&body_bytes).to_string(),
        ))
    };

    (status, body)
}

/// Send a request and return raw bytes + status + headers (for the photo endpoint).
pub async fn send_raw(
    app: &Router,
    req: Request<Body>,
) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(req)
        .await
        .expect("Failed to send request");

    let status = response.status();
    let headers = response.headers().clone();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");

    (status, headers, body_bytes.to_vec())
}
