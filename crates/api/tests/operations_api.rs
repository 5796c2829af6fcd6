//! HTTP tests for previews, operation lifecycle, and progress.

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;

fn finance_raise_body() -> serde_json::Value {
    json!({
        "selection": { "mode": "department", "department": "Finance" },
        "adjustment": { "adjustment_type": "percentage", "adjustment_value": 10.0 },
    })
}

// ---------------------------------------------------------------------------
// Preview
// ---------------------------------------------------------------------------

#[tokio::test]
async fn preview_returns_rows_and_totals() {
    let app = build_test_app();
    let response = post_json(
        app.router.clone(),
        "/api/v1/adjustments/preview",
        finance_raise_body(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let preview = &json["data"];
    assert_eq!(preview["employee_count"], 3);
    assert_eq!(preview["rows"].as_array().unwrap().len(), 3);
    assert_money(preview["total_cost_impact"].as_f64().unwrap(), 3_300_000.0);
    assert_money(preview["average_change_percentage"].as_f64().unwrap(), 10.0);

    // Nothing persisted, nothing changed.
    assert_eq!(gross(&app, 1).await, 10_000_000.0);
    let list = body_json(get(app.router, "/api/v1/operations").await).await;
    assert!(list["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn preview_rejects_empty_selection() {
    let app = build_test_app();
    let response = post_json(
        app.router,
        "/api/v1/adjustments/preview",
        json!({
            "selection": { "mode": "employees", "employee_ids": [] },
            "adjustment": { "adjustment_type": "fixed_amount", "adjustment_value": 500000.0 },
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let app = build_test_app();
    let response = post_json(
        app.router,
        "/api/v1/adjustments/preview",
        json!({ "selection": { "mode": "everyone" } }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

// ---------------------------------------------------------------------------
// Create / get / list
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_persists_pending_operation() {
    let app = build_test_app();
    let id = create_finance_raise(&app).await;

    let response = get(app.router.clone(), &format!("/api/v1/operations/{id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let detail = &json["data"];
    assert_eq!(detail["operation"]["status"], "created");
    assert_eq!(detail["operation"]["total_employees_affected"], 3);
    assert_eq!(detail["operation"]["created_by"], "hr.admin");
    let items = detail["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|i| i["item_status"] == "pending"));

    assert_eq!(gross(&app, 1).await, 10_000_000.0);
}

#[tokio::test]
async fn create_requires_a_name() {
    let app = build_test_app();
    let mut body = finance_raise_body();
    body["name"] = json!("   ");
    body["effective_date"] = json!("2026-11-01");
    body["created_by"] = json!("hr.admin");

    let response = post_json(app.router, "/api/v1/operations", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_operation_is_404() {
    let app = build_test_app();
    let response = get(app.router, "/api/v1/operations/999").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn list_filters_by_status() {
    let app = build_test_app();
    let executed = executed_finance_raise(&app).await;
    let pending = create_finance_raise(&app).await;

    let json = body_json(get(app.router.clone(), "/api/v1/operations?status=completed").await).await;
    let ids: Vec<i64> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|op| op["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![executed]);

    let json = body_json(get(app.router, "/api/v1/operations").await).await;
    assert_eq!(json["data"][0]["id"], pending);
}

// ---------------------------------------------------------------------------
// Execute / progress
// ---------------------------------------------------------------------------

#[tokio::test]
async fn execute_runs_in_background_and_reports_progress() {
    let app = build_test_app();
    let id = create_finance_raise(&app).await;

    let response = post_json(
        app.router.clone(),
        &format!("/api/v1/operations/{id}/execute"),
        json!({ "executed_by": "hr.lead" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let accepted = body_json(response).await;
    assert_eq!(accepted["data"]["operation_id"], id);
    assert_eq!(accepted["data"]["status"], "executing");
    assert_eq!(accepted["data"]["total_items"], 3);

    let detail = wait_until_finished(&app, id).await;
    assert_eq!(detail["data"]["operation"]["status"], "completed");
    assert_eq!(detail["data"]["operation"]["successful_items"], 3);
    assert_eq!(detail["data"]["operation"]["executed_by"], "hr.lead");

    let progress = body_json(
        get(app.router.clone(), &format!("/api/v1/operations/{id}/progress")).await,
    )
    .await;
    assert_eq!(progress["data"]["status"], "completed");
    assert_eq!(progress["data"]["status_label"], "Completed");
    assert_eq!(progress["data"]["completed"], 3);
    assert_eq!(progress["data"]["percent"], 100.0);

    assert_money(gross(&app, 1).await, 11_000_000.0);
    assert_money(gross(&app, 2).await, 16_500_000.0);
    assert_money(gross(&app, 3).await, 8_800_000.0);
    assert_eq!(gross(&app, 4).await, 20_000_000.0);
}

#[tokio::test]
async fn progress_of_unexecuted_operation_comes_from_history() {
    let app = build_test_app();
    let id = create_finance_raise(&app).await;

    let json = body_json(get(app.router, &format!("/api/v1/operations/{id}/progress")).await).await;

    assert_eq!(json["data"]["status"], "created");
    assert_eq!(json["data"]["status_label"], "Created");
    assert_eq!(json["data"]["total"], 3);
    assert_eq!(json["data"]["completed"], 0);
    assert_eq!(json["data"]["percent"], 0.0);
}

#[tokio::test]
async fn executing_twice_is_a_conflict() {
    let app = build_test_app();
    let id = executed_finance_raise(&app).await;

    let response = post_json(
        app.router.clone(),
        &format!("/api/v1/operations/{id}/execute"),
        json!({ "executed_by": "hr.lead" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_money(gross(&app, 1).await, 11_000_000.0);
}

#[tokio::test]
async fn execute_rejects_blank_actor_and_unknown_ids() {
    let app = build_test_app();
    let id = create_finance_raise(&app).await;

    let response = post_json(
        app.router.clone(),
        &format!("/api/v1/operations/{id}/execute"),
        json!({ "executed_by": " " }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        app.router,
        "/api/v1/operations/999/execute",
        json!({ "executed_by": "hr.lead" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unavailable_store_returns_503() {
    let app = build_test_app();
    let id = create_finance_raise(&app).await;
    app.history.set_unavailable(true);

    let response = post_json(
        app.router,
        &format!("/api/v1/operations/{id}/execute"),
        json!({ "executed_by": "hr.lead" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "STORE_UNAVAILABLE");
}
