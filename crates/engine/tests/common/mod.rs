#![allow(dead_code)]

use std::sync::Arc;

use payroll_core::calculator::{AdjustmentConfig, AdjustmentType};
use payroll_core::employee::{ComponentType, Employee, SalaryComponent};
use payroll_core::operation::OperationMetadata;
use payroll_core::selection::Selection;
use payroll_core::types::DbId;
use payroll_engine::memory::{
    InMemoryEmployeeDirectory, InMemoryHistoryStore, InMemoryTemplateStore,
};
use payroll_engine::{EngineConfig, PayrollEngine};

/// Engine plus handles on its in-memory stores.
pub struct Harness {
    pub engine: PayrollEngine,
    pub directory: Arc<InMemoryEmployeeDirectory>,
    pub history: Arc<InMemoryHistoryStore>,
    pub templates: Arc<InMemoryTemplateStore>,
}

pub fn employee(id: DbId, department: &str, basic: f64) -> Employee {
    Employee {
        id,
        name: format!("Employee {id}"),
        department: department.to_string(),
        position: "Staff".to_string(),
        components: vec![SalaryComponent::new(ComponentType::BasicSalary, basic)],
    }
}

/// Three Finance employees earning 10M, 15M, and 8M.
pub fn finance_roster() -> Vec<Employee> {
    vec![
        employee(1, "Finance", 10_000_000.0),
        employee(2, "Finance", 15_000_000.0),
        employee(3, "Finance", 8_000_000.0),
    ]
}

pub fn harness(employees: Vec<Employee>) -> Harness {
    harness_with_config(employees, EngineConfig::default())
}

pub fn harness_with_config(employees: Vec<Employee>, config: EngineConfig) -> Harness {
    let directory = Arc::new(InMemoryEmployeeDirectory::new(employees));
    let history = Arc::new(InMemoryHistoryStore::new());
    let templates = Arc::new(InMemoryTemplateStore::new());
    let engine = PayrollEngine::new(
        directory.clone(),
        history.clone(),
        templates.clone(),
        config,
    );
    Harness {
        engine,
        directory,
        history,
        templates,
    }
}

pub fn metadata(name: &str) -> OperationMetadata {
    OperationMetadata {
        name: name.to_string(),
        description: None,
        effective_date: chrono::NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
        created_by: "hr.admin".to_string(),
    }
}

pub fn percentage(value: f64) -> AdjustmentConfig {
    AdjustmentConfig::new(AdjustmentType::Percentage, value)
}

pub fn fixed(value: f64) -> AdjustmentConfig {
    AdjustmentConfig::new(AdjustmentType::FixedAmount, value)
}

/// Preview and create an operation over `ids`, returning its id.
pub async fn create_op(h: &Harness, ids: &[DbId], config: &AdjustmentConfig) -> DbId {
    let preview = h
        .engine
        .preview_adjustment(&Selection::from_ids(ids.iter().copied()), config)
        .await
        .unwrap();
    h.engine
        .create_operation(&metadata("Adjustment"), &preview)
        .await
        .unwrap()
}

pub async fn gross(h: &Harness, id: DbId) -> f64 {
    h.engine
        .directory()
        .get_by_id(id)
        .await
        .unwrap()
        .unwrap()
        .gross_salary()
}

/// Overwrite an employee's basic salary outside of any operation.
pub async fn set_basic(h: &Harness, id: DbId, amount: f64) {
    h.engine
        .directory()
        .update_salary_components(id, &[SalaryComponent::new(ComponentType::BasicSalary, amount)])
        .await
        .unwrap();
}

pub fn no_progress(_: payroll_core::operation::ExecutionProgress) {}

#[track_caller]
pub fn assert_money(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-3,
        "expected {expected}, got {actual}"
    );
}
