use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use pretty_assertions::assert_eq;

use crate::common::*;

#[tokio::test]
async fn test_list_reports_empty() {
    let (app, _state, _images) = test_app().await;

    let (status, resp) = get_json(&app, "/api/complaints").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp, serde_json::json!([]));
}

#[tokio::test]
async fn test_list_reports_newest_first() {
    let (app, _state, _images) = test_app().await;

    let first = create_test_report(&app).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = create_test_report(&app).await;

    let (status, resp) = get_json(&app, "/api/complaints").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = resp
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["report_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![second.as_str(), first.as_str()]);
}

#[tokio::test]
async fn test_get_report_by_id() {
    let (app, _state, _images) = test_app().await;
    let report_id = create_test_report(&app).await;

    let (status, resp) = get_json(&app, &format!("/api/complaints/{report_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["report_id"], report_id);
    assert_eq!(resp["ward"], "Ward 7");
    assert_eq!(resp["status"], "Pending");
}

#[tokio::test]
async fn test_get_report_not_found() {
    let (app, _state, _images) = test_app().await;

    let (status, resp) = get_json(&app, "/api/complaints/0000ABCD").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(resp["kind"], "NotFound");
}

#[tokio::test]
async fn test_get_report_image() {
    let (app, _state, _images) = test_app().await;
    let photo = png(240, 180);
    let (status, resp) = submit_report(&app, &report_fields(), &photo).await;
    assert_eq!(status, StatusCode::CREATED);
    let report_id = resp["report_id"].as_str().unwrap();

    let req = Request::builder()
        .uri(format!("/api/reports/{report_id}/image"))
        .body(Body::empty())
        .unwrap();
    let (status, headers, bytes) = send_raw(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "image/png");
    assert_eq!(bytes, photo);
}

#[tokio::test]
async fn test_get_image_for_unknown_report() {
    let (app, _state, _images) = test_app().await;

    let (status, resp) = get_json(&app, "/api/reports/DEADBEEF/image").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(resp["kind"], "NotFound");
}

#[tokio::test]
async fn test_list_reports_omits_contact_details() {
    let (app, _state, _images) = test_app().await;
    let report_id = create_test_report(&app).await;

    let (status, resp) = get_json(&app, "/api/complaints").await;
    assert_eq!(status, StatusCode::OK);
    let listed = &resp[0];
    assert_eq!(listed["report_id"], report_id.as_str());
    assert_eq!(listed["reporter_name"], "Asha Rao");
    assert!(listed.get("reporter_phone").is_none());
    assert!(listed.get("description").is_none());

    // The single-report view keeps them for the handling official
    let (_, detail) = get_json(&app, &format!("/api/complaints/{report_id}")).await;
    assert_eq!(detail["reporter_phone"], "5550100");
}
