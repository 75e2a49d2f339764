use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use crate::common::*;

const LAT: Dms = [(12, 1), (58, 1), (1800, 100)];
const LON: Dms = [(77, 1), (35, 1), (2400, 100)];

#[tokio::test]
async fn test_precheck_accepts_large_photo() {
    let (app, _state, images) = test_app().await;

    let (status, resp) = precheck(&app, &jpeg(400, 300)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["validation"]["outcome"], "Accepted");
    assert_eq!(resp["validation"]["width"], 400);
    assert_eq!(resp["validation"]["height"], 300);
    assert_eq!(resp["classification"]["status"], "Success");
    assert_eq!(resp["classification"]["label"], "pothole");
    assert_eq!(resp["classification"]["confidence"], 0.9);
    assert!(resp["geolocation"].is_null());

    // Pre-check never stores anything
    assert!(images.is_empty().await);
}

#[tokio::test]
async fn test_precheck_rejects_small_photo() {
    let (app, _state, _images) = test_app().await;

    let (status, resp) = precheck(&app, &png(50, 50)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["validation"]["outcome"], "Rejected");
    assert_eq!(resp["validation"]["kind"], "InvalidImage");
    assert!(resp["classification"].is_null());
    assert!(resp["geolocation"].is_null());
}

#[tokio::test]
async fn test_precheck_minimum_size_is_accepted() {
    let (app, _state, _images) = test_app().await;

    let (_, resp) = precheck(&app, &png(100, 100)).await;
    assert_eq!(resp["validation"]["outcome"], "Accepted");

    let (_, resp) = precheck(&app, &png(100, 99)).await;
    assert_eq!(resp["validation"]["outcome"], "Rejected");
}

#[tokio::test]
async fn test_precheck_garbage_is_unreadable() {
    let (app, _state, _images) = test_app().await;

    let (status, resp) = precheck(&app, b"definitely not a photo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["validation"]["outcome"], "Rejected");
    assert_eq!(resp["validation"]["kind"], "UnreadableImage");
}

#[tokio::test]
async fn test_precheck_reads_photo_location() {
    let (app, _state, _images) = test_app().await;

    let photo = jpeg_with_gps(400, 300, "N", LAT, "E", LON);
    let (status, resp) = precheck(&app, &photo).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["validation"]["outcome"], "Accepted");

    let lat = resp["geolocation"]["latitude"].as_f64().unwrap();
    let lon = resp["geolocation"]["longitude"].as_f64().unwrap();
    assert!((lat - (12.0 + 58.0 / 60.0 + 18.0 / 3600.0)).abs() < 1e-9);
    assert!((lon - 77.59).abs() < 1e-9);
}

#[tokio::test]
async fn test_precheck_below_threshold_is_no_detection() {
    let (app, _state, _images) = test_app_with(StubModel::detecting(&[(0, 0.2), (1, 0.1)])).await;

    let (_, resp) = precheck(&app, &jpeg(400, 300)).await;
    assert_eq!(resp["classification"]["status"], "NoDetection");
    assert!(resp["classification"]["label"].is_null());
    assert_eq!(resp["classification"]["confidence"], 0.0);
}

#[tokio::test]
async fn test_precheck_model_failure_is_reported() {
    let (app, _state, _images) = test_app_with(StubModel::failing("model offline")).await;

    let (status, resp) = precheck(&app, &jpeg(400, 300)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["validation"]["outcome"], "Accepted");
    assert_eq!(resp["classification"]["status"], "Error");
    assert!(resp["classification"]["message"]
        .as_str()
        .unwrap()
        .contains("model offline"));
}

#[tokio::test]
async fn test_precheck_without_file_is_bad_request() {
    let (app, _state, _images) = test_app().await;

    let (status, resp) = post_multipart(&app, "/api/validate-image", &[Part::Text("note", "hi")]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["kind"], "BadRequest");
}
