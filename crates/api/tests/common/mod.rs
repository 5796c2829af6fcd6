#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use payroll_api::config::ServerConfig;
use payroll_api::router::build_app_router;
use payroll_api::state::AppState;
use payroll_core::employee::{ComponentType, Employee, SalaryComponent};
use payroll_core::types::DbId;
use payroll_engine::memory::{
    InMemoryEmployeeDirectory, InMemoryHistoryStore, InMemoryTemplateStore,
};
use payroll_engine::{EngineConfig, PayrollEngine};
use serde_json::Value;
use tower::ServiceExt;

/// Router plus handles on the in-memory stores behind it.
pub struct TestApp {
    pub router: Router,
    pub directory: Arc<InMemoryEmployeeDirectory>,
    pub history: Arc<InMemoryHistoryStore>,
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        engine: EngineConfig::default(),
    }
}

fn employee(id: DbId, department: &str, position: &str, basic: f64) -> Employee {
    Employee {
        id,
        name: format!("Employee {id}"),
        department: department.to_string(),
        position: position.to_string(),
        components: vec![SalaryComponent::new(ComponentType::BasicSalary, basic)],
    }
}

/// Three Finance analysts (10M, 15M, 8M) and one engineer (20M).
pub fn roster() -> Vec<Employee> {
    vec![
        employee(1, "Finance", "Analyst", 10_000_000.0),
        employee(2, "Finance", "Analyst", 15_000_000.0),
        employee(3, "Finance", "Analyst", 8_000_000.0),
        employee(4, "Engineering", "Engineer", 20_000_000.0),
    ]
}

/// Build the full application router over in-memory stores, with the same
/// middleware stack production uses. Must be called inside a Tokio runtime.
pub fn build_test_app() -> TestApp {
    let directory = Arc::new(InMemoryEmployeeDirectory::new(roster()));
    let history = Arc::new(InMemoryHistoryStore::new());
    let templates = Arc::new(InMemoryTemplateStore::new());
    let config = test_config();

    let engine = PayrollEngine::new(
        directory.clone(),
        history.clone(),
        templates,
        config.engine.clone(),
    );
    let state = AppState::new(engine, config.clone());

    TestApp {
        router: build_app_router(state, &config),
        directory,
        history,
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn send_json(app: Router, method: Method, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send_json(app, Method::POST, uri, body).await
}

pub async fn put_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send_json(app, Method::PUT, uri, body).await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Workflow helpers
// ---------------------------------------------------------------------------

/// Create a 10% raise for the Finance department and return its id.
pub async fn create_finance_raise(app: &TestApp) -> DbId {
    let response = post_json(
        app.router.clone(),
        "/api/v1/operations",
        serde_json::json!({
            "name": "Finance raise",
            "effective_date": "2026-11-01",
            "created_by": "hr.admin",
            "selection": { "mode": "department", "department": "Finance" },
            "adjustment": { "adjustment_type": "percentage", "adjustment_value": 10.0 },
        }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["data"]["operation"]["id"]
        .as_i64()
        .unwrap()
}

/// Poll `GET /operations/{id}` until it leaves `created`/`executing`.
pub async fn wait_until_finished(app: &TestApp, id: DbId) -> Value {
    for _ in 0..200 {
        let uri = format!("/api/v1/operations/{id}");
        let json = body_json(get(app.router.clone(), &uri).await).await;
        let status = json["data"]["operation"]["status"].as_str().unwrap();
        if status != "created" && status != "executing" {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("operation {id} did not finish");
}

/// Create and fully execute the Finance raise.
pub async fn executed_finance_raise(app: &TestApp) -> DbId {
    let id = create_finance_raise(app).await;
    let response = post_json(
        app.router.clone(),
        &format!("/api/v1/operations/{id}/execute"),
        serde_json::json!({ "executed_by": "hr.lead" }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::ACCEPTED);
    wait_until_finished(app, id).await;
    id
}

pub async fn gross(app: &TestApp, id: DbId) -> f64 {
    use payroll_core::store::EmployeeDirectory;
    app.directory
        .get_by_id(id)
        .await
        .unwrap()
        .unwrap()
        .gross_salary()
}

#[track_caller]
pub fn assert_money(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-3,
        "expected {expected}, got {actual}"
    );
}
