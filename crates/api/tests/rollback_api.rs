//! HTTP tests for rollback planning and execution.

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;

#[tokio::test]
async fn plan_of_unexecuted_operation_is_unprocessable() {
    let app = build_test_app();
    let id = create_finance_raise(&app).await;

    let response = get(app.router, &format!("/api/v1/operations/{id}/rollback-plan")).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["code"], "ROLLBACK_INELIGIBLE");
}

#[tokio::test]
async fn plan_lists_applied_items_and_risk() {
    let app = build_test_app();
    let id = executed_finance_raise(&app).await;

    let response = get(app.router, &format!("/api/v1/operations/{id}/rollback-plan")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let plan = &json["data"];
    assert_eq!(plan["operation_id"], id);
    assert_eq!(plan["eligible_items"].as_array().unwrap().len(), 3);
    assert_money(plan["total_reversal_amount"].as_f64().unwrap(), 3_300_000.0);
    assert_eq!(plan["risk_level"], "low");
    assert_eq!(plan["requires_approval"], false);
}

#[tokio::test]
async fn rollback_restores_salaries_in_background() {
    let app = build_test_app();
    let id = executed_finance_raise(&app).await;

    let response = post_json(
        app.router.clone(),
        &format!("/api/v1/operations/{id}/rollback"),
        json!({ "reason": "Wrong percentage", "executed_by": "hr.lead" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let accepted = body_json(response).await;
    assert_eq!(accepted["data"]["source_operation_id"], id);
    assert_eq!(accepted["data"]["risk_level"], "low");
    assert_eq!(accepted["data"]["total_items"], 3);
    let rollback_id = accepted["data"]["operation_id"].as_i64().unwrap();
    assert_ne!(rollback_id, id);

    let detail = wait_until_finished(&app, rollback_id).await;
    let rollback = &detail["data"]["operation"];
    assert_eq!(rollback["status"], "completed");
    assert_eq!(rollback["operation_type"], "rollback");
    assert_eq!(rollback["rollback_of_operation_id"], id);
    assert_eq!(rollback["reason"], "Wrong percentage");

    assert_eq!(gross(&app, 1).await, 10_000_000.0);
    assert_eq!(gross(&app, 2).await, 15_000_000.0);
    assert_eq!(gross(&app, 3).await, 8_000_000.0);

    let source = body_json(get(app.router.clone(), &format!("/api/v1/operations/{id}")).await).await;
    assert!(source["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .all(|i| i["item_status"] == "rolledback"));

    // Everything is reversed; a second rollback is ineligible.
    let response = post_json(
        app.router,
        &format!("/api/v1/operations/{id}/rollback"),
        json!({ "reason": "Again", "executed_by": "hr.lead" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn partial_rollback_reverses_only_selected_items() {
    let app = build_test_app();
    let id = executed_finance_raise(&app).await;
    let plan = body_json(
        get(app.router.clone(), &format!("/api/v1/operations/{id}/rollback-plan")).await,
    )
    .await;
    let first = plan["data"]["eligible_items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["employee_id"] == 1)
        .unwrap()["item_id"]
        .clone();

    let response = post_json(
        app.router.clone(),
        &format!("/api/v1/operations/{id}/rollback"),
        json!({ "reason": "Only employee 1", "executed_by": "hr.lead", "item_ids": [first] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let rollback_id = body_json(response).await["data"]["operation_id"]
        .as_i64()
        .unwrap();
    wait_until_finished(&app, rollback_id).await;

    assert_eq!(gross(&app, 1).await, 10_000_000.0);
    assert_money(gross(&app, 2).await, 16_500_000.0);
}

#[tokio::test]
async fn rollback_requires_a_reason() {
    let app = build_test_app();
    let id = executed_finance_raise(&app).await;

    let response = post_json(
        app.router.clone(),
        &format!("/api/v1/operations/{id}/rollback"),
        json!({ "reason": "", "executed_by": "hr.lead" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_money(gross(&app, 1).await, 11_000_000.0);
}
