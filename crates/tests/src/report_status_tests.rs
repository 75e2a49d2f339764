use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::*;

#[tokio::test]
async fn test_resolve_report_with_remarks() {
    let (app, _state, _images) = test_app().await;
    let report_id = create_test_report(&app).await;

    let body = json!({ "status": "Resolved", "remarks": "fixed pothole" });
    let uri = format!("/api/complaints/{report_id}");
    let (status, resp) = patch_json(&app, &uri, &body.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["status"], "Resolved");
    assert_eq!(resp["remarks"], "fixed pothole");
    assert!(resp["resolved_at"].is_string());

    let (_, fetched) = get_json(&app, &uri).await;
    assert_eq!(fetched["status"], "Resolved");
    assert_eq!(fetched["resolved_at"], resp["resolved_at"]);
}

#[tokio::test]
async fn test_move_to_in_progress_with_assignee() {
    let (app, _state, _images) = test_app().await;
    let report_id = create_test_report(&app).await;

    let body = json!({ "status": "InProgress", "assigned_to": "Road crew 4" });
    let uri = format!("/api/complaints/{report_id}");
    let (status, resp) = patch_json(&app, &uri, &body.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["status"], "InProgress");
    assert_eq!(resp["assigned_to"], "Road crew 4");
    assert!(resp["resolved_at"].is_null());
}

#[tokio::test]
async fn test_in_progress_display_name_is_accepted() {
    let (app, _state, _images) = test_app().await;
    let report_id = create_test_report(&app).await;

    let uri = format!("/api/complaints/{report_id}");
    let (status, resp) = patch_json(&app, &uri, r#"{"status": "In Progress"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["status"], "InProgress");
}

#[tokio::test]
async fn test_unknown_status_leaves_report_unchanged() {
    let (app, state, _images) = test_app().await;
    let report_id = create_test_report(&app).await;
    let before = state.store.get_by_id(&report_id).await.unwrap();

    let body = json!({ "status": "Closed", "remarks": "should not stick" });
    let uri = format!("/api/complaints/{report_id}");
    let (status, resp) = patch_json(&app, &uri, &body.to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["kind"], "InvalidStatus");

    let after = state.store.get_by_id(&report_id).await.unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_update_nonexistent_report() {
    let (app, state, _images) = test_app().await;
    create_test_report(&app).await;

    let body = json!({ "status": "Resolved" });
    let (status, resp) = patch_json(&app, "/api/complaints/FFFFFFFF", &body.to_string()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(resp["kind"], "NotFound");

    assert_eq!(state.store.get_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_reopening_keeps_resolved_at() {
    let (app, _state, _images) = test_app().await;
    let report_id = create_test_report(&app).await;
    let uri = format!("/api/complaints/{report_id}");

    let (_, resolved) = patch_json(&app, &uri, r#"{"status": "Resolved"}"#).await;
    let resolved_at = resolved["resolved_at"].clone();
    assert!(resolved_at.is_string());

    let (status, reopened) = patch_json(&app, &uri, r#"{"status": "Pending"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reopened["status"], "Pending");
    assert_eq!(reopened["resolved_at"], resolved_at);
}

#[tokio::test]
async fn test_remarks_are_overwritten() {
    let (app, _state, _images) = test_app().await;
    let report_id = create_test_report(&app).await;
    let uri = format!("/api/complaints/{report_id}");

    patch_json(&app, &uri, r#"{"status": "InProgress", "remarks": "crew dispatched"}"#).await;
    let (_, resp) = patch_json(&app, &uri, r#"{"status": "Resolved", "remarks": "patched"}"#).await;
    assert_eq!(resp["remarks"], "patched");

    // Omitted remarks keep the previous value
    let (_, resp) = patch_json(&app, &uri, r#"{"status": "Resolved"}"#).await;
    assert_eq!(resp["remarks"], "patched");
}

#[tokio::test]
async fn test_non_string_status_is_invalid_status() {
    let (app, state, _images) = test_app().await;
    let report_id = create_test_report(&app).await;
    let before = state.store.get_by_id(&report_id).await.unwrap();
    let uri = format!("/api/complaints/{report_id}");

    for body in [r#"{"status": 5}"#, r#"{"status": null}"#, r#"{}"#, r#"{"remarks": "no status"}"#] {
        let (status, resp) = patch_json(&app, &uri, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(resp["kind"], "InvalidStatus", "{body}");
    }

    let after = state.store.get_by_id(&report_id).await.unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_malformed_status_body_is_bad_request() {
    let (app, state, _images) = test_app().await;
    let report_id = create_test_report(&app).await;
    let before = state.store.get_by_id(&report_id).await.unwrap();

    let uri = format!("/api/complaints/{report_id}");
    let (status, resp) = patch_json(&app, &uri, "status=Resolved").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["kind"], "BadRequest");

    let after = state.store.get_by_id(&report_id).await.unwrap();
    assert_eq!(after, before);
}
