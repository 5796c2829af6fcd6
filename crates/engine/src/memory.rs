//! In-memory implementations of the store traits.
//!
//! Used by the engine and API test suites and for running the server
//! without a database. The history store enforces the same state machine
//! rules as the PostgreSQL adapter and can be told to fail, to exercise the
//! persistence error paths.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use payroll_core::employee::{Employee, EmployeeFilter, SalaryComponent};
use payroll_core::error::CoreError;
use payroll_core::operation::{
    validate_item_transition, validate_operation_transition, BulkOperation, BulkOperationItem,
    ItemStatus, NewBulkOperation, NewOperationItem, OperationDetail, OperationFilter,
    OperationStatus,
};
use payroll_core::store::{
    ConditionalWrite, EmployeeDirectory, HistoryStore, ItemUpdate, OperationUpdate,
    TemplateStore,
};
use payroll_core::template::{CreateTemplate, OperationTemplate, UpdateTemplate};
use payroll_core::types::{approx_eq, Amount, DbId, Timestamp};
use tokio::sync::RwLock;

fn unavailable() -> CoreError {
    CoreError::Persistence("store unavailable".to_string())
}

// ---------------------------------------------------------------------------
// Employee directory
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryEmployeeDirectory {
    employees: RwLock<BTreeMap<DbId, Employee>>,
    rejected_writes: RwLock<HashSet<DbId>>,
}

impl InMemoryEmployeeDirectory {
    pub fn new(employees: impl IntoIterator<Item = Employee>) -> Self {
        Self {
            employees: RwLock::new(employees.into_iter().map(|e| (e.id, e)).collect()),
            rejected_writes: RwLock::default(),
        }
    }

    pub async fn insert(&self, employee: Employee) {
        self.employees.write().await.insert(employee.id, employee);
    }

    pub async fn remove(&self, id: DbId) -> Option<Employee> {
        self.employees.write().await.remove(&id)
    }

    /// Make every salary write for `id` fail.
    pub async fn reject_writes_for(&self, id: DbId) {
        self.rejected_writes.write().await.insert(id);
    }
}

#[async_trait]
impl EmployeeDirectory for InMemoryEmployeeDirectory {
    async fn list(&self, filter: &EmployeeFilter) -> Result<Vec<Employee>, CoreError> {
        Ok(self
            .employees
            .read()
            .await
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, id: DbId) -> Result<Option<Employee>, CoreError> {
        Ok(self.employees.read().await.get(&id).cloned())
    }

    async fn update_salary_components(
        &self,
        employee_id: DbId,
        components: &[SalaryComponent],
    ) -> Result<(), CoreError> {
        if self.rejected_writes.read().await.contains(&employee_id) {
            return Err(CoreError::Persistence(format!(
                "salary write rejected for employee {employee_id}"
            )));
        }
        let mut employees = self.employees.write().await;
        let employee = employees.get_mut(&employee_id).ok_or(CoreError::NotFound {
            entity: "Employee",
            id: employee_id,
        })?;
        employee.components = components.to_vec();
        Ok(())
    }

    async fn update_salary_components_if(
        &self,
        employee_id: DbId,
        expected_gross: Amount,
        components: &[SalaryComponent],
    ) -> Result<ConditionalWrite, CoreError> {
        if self.rejected_writes.read().await.contains(&employee_id) {
            return Err(CoreError::Persistence(format!(
                "salary write rejected for employee {employee_id}"
            )));
        }
        let mut employees = self.employees.write().await;
        let employee = employees.get_mut(&employee_id).ok_or(CoreError::NotFound {
            entity: "Employee",
            id: employee_id,
        })?;
        let actual = employee.gross_salary();
        if !approx_eq(actual, expected_gross) {
            return Ok(ConditionalWrite::Stale { actual });
        }
        employee.components = components.to_vec();
        Ok(ConditionalWrite::Written)
    }
}

// ---------------------------------------------------------------------------
// History store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct HistoryState {
    next_operation_id: DbId,
    next_item_id: DbId,
    operations: BTreeMap<DbId, BulkOperation>,
    items: BTreeMap<DbId, BulkOperationItem>,
}

#[derive(Default)]
pub struct InMemoryHistoryStore {
    state: RwLock<HistoryState>,
    unavailable: AtomicBool,
    reject_operation_updates: AtomicBool,
    rejected_item_status: RwLock<Option<ItemStatus>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call with `Persistence`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail only operation status updates with `Persistence`.
    pub fn set_reject_operation_updates(&self, reject: bool) {
        self.reject_operation_updates.store(reject, Ordering::SeqCst);
    }

    /// Fail item status updates that move an item to `status` with
    /// `Persistence`; `None` clears it.
    pub async fn set_reject_item_status(&self, status: Option<ItemStatus>) {
        *self.rejected_item_status.write().await = status;
    }

    fn check_available(&self) -> Result<(), CoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn ping(&self) -> Result<(), CoreError> {
        self.check_available()
    }

    async fn create_operation(
        &self,
        operation: &NewBulkOperation,
        items: &[NewOperationItem],
    ) -> Result<DbId, CoreError> {
        self.check_available()?;
        let mut state = self.state.write().await;

        state.next_operation_id += 1;
        let id = state.next_operation_id;
        state.operations.insert(
            id,
            BulkOperation {
                id,
                operation_type: operation.operation_type,
                name: operation.name.clone(),
                description: operation.description.clone(),
                adjustment_type: operation.adjustment_type,
                adjustment_value: operation.adjustment_value,
                effective_date: operation.effective_date,
                status: OperationStatus::Created,
                employee_ids: operation.employee_ids.clone(),
                total_employees_affected: items.len() as i32,
                total_cost_impact: operation.total_cost_impact,
                created_by: operation.created_by.clone(),
                executed_by: None,
                created_at: Utc::now(),
                started_at: None,
                completed_at: None,
                successful_items: 0,
                failed_items: 0,
                rollback_of_operation_id: operation.rollback_of_operation_id,
                reason: operation.reason.clone(),
            },
        );

        for item in items {
            state.next_item_id += 1;
            let item_id = state.next_item_id;
            state.items.insert(
                item_id,
                BulkOperationItem {
                    id: item_id,
                    operation_id: id,
                    employee_id: item.employee_id,
                    employee_name: item.employee_name.clone(),
                    department: item.department.clone(),
                    previous_gross_salary: item.previous_gross_salary,
                    new_gross_salary: item.new_gross_salary,
                    salary_change_amount: item.salary_change_amount,
                    item_status: ItemStatus::Pending,
                    component_changes: item.component_changes.clone(),
                    error: None,
                    reverses_item_id: item.reverses_item_id,
                    processed_at: None,
                },
            );
        }
        Ok(id)
    }

    async fn update_item_status(
        &self,
        item_id: DbId,
        status: ItemStatus,
        update: &ItemUpdate,
    ) -> Result<(), CoreError> {
        self.check_available()?;
        if *self.rejected_item_status.read().await == Some(status) {
            return Err(unavailable());
        }
        let mut state = self.state.write().await;
        let item = state.items.get_mut(&item_id).ok_or(CoreError::NotFound {
            entity: "BulkOperationItem",
            id: item_id,
        })?;
        validate_item_transition(item.item_status, status)?;
        item.item_status = status;
        if status != ItemStatus::Rolledback {
            item.error = update.error.clone();
            item.processed_at = update.processed_at;
        }
        Ok(())
    }

    async fn update_operation_status(
        &self,
        operation_id: DbId,
        status: OperationStatus,
        update: &OperationUpdate,
    ) -> Result<(), CoreError> {
        self.check_available()?;
        if self.reject_operation_updates.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let mut state = self.state.write().await;
        let op = state
            .operations
            .get_mut(&operation_id)
            .ok_or(CoreError::NotFound {
                entity: "BulkOperation",
                id: operation_id,
            })?;
        validate_operation_transition(op.status, status)?;
        op.status = status;
        op.successful_items = update.counts.successful_items;
        op.failed_items = update.counts.failed_items;
        if update.executed_by.is_some() {
            op.executed_by = update.executed_by.clone();
        }
        if update.started_at.is_some() {
            op.started_at = update.started_at;
        }
        if update.completed_at.is_some() {
            op.completed_at = update.completed_at;
        }
        Ok(())
    }

    async fn query_operations(
        &self,
        filter: &OperationFilter,
    ) -> Result<Vec<BulkOperation>, CoreError> {
        self.check_available()?;
        let state = self.state.read().await;
        let mut ops: Vec<BulkOperation> = state
            .operations
            .values()
            .rev()
            .filter(|op| filter.matches(op))
            .cloned()
            .collect();
        if let Some(limit) = filter.limit {
            ops.truncate(limit.max(0) as usize);
        }
        Ok(ops)
    }

    async fn get_operation_by_id(&self, id: DbId) -> Result<Option<OperationDetail>, CoreError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state.operations.get(&id).map(|op| OperationDetail {
            operation: op.clone(),
            items: state
                .items
                .values()
                .filter(|i| i.operation_id == id)
                .cloned()
                .collect(),
        }))
    }

    async fn get_item(&self, item_id: DbId) -> Result<Option<BulkOperationItem>, CoreError> {
        self.check_available()?;
        Ok(self.state.read().await.items.get(&item_id).cloned())
    }
}

// ---------------------------------------------------------------------------
// Template store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TemplateState {
    next_id: DbId,
    templates: BTreeMap<DbId, OperationTemplate>,
}

#[derive(Default)]
pub struct InMemoryTemplateStore {
    state: RwLock<TemplateState>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn create(&self, input: &CreateTemplate) -> Result<OperationTemplate, CoreError> {
        let mut state = self.state.write().await;
        state.next_id += 1;
        let now = Utc::now();
        let template = OperationTemplate {
            id: state.next_id,
            name: input.name.trim().to_string(),
            description: input.description.clone(),
            operation_type: input.operation_type,
            adjustment_type: input.adjustment_type,
            adjustment_value: input.adjustment_value,
            department_filter: input.department_filter.clone(),
            position_filter: input.position_filter.clone(),
            default_reason: input.default_reason.clone(),
            is_favorite: input.is_favorite,
            usage_count: 0,
            created_by: input.created_by.clone(),
            created_at: now,
            updated_at: now,
            last_used_at: None,
        };
        state.templates.insert(template.id, template.clone());
        Ok(template)
    }

    async fn get(&self, id: DbId) -> Result<Option<OperationTemplate>, CoreError> {
        Ok(self.state.read().await.templates.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<OperationTemplate>, CoreError> {
        Ok(self.state.read().await.templates.values().cloned().collect())
    }

    async fn update(
        &self,
        id: DbId,
        input: &UpdateTemplate,
    ) -> Result<Option<OperationTemplate>, CoreError> {
        let mut state = self.state.write().await;
        let Some(template) = state.templates.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &input.name {
            template.name = name.trim().to_string();
        }
        if input.description.is_some() {
            template.description = input.description.clone();
        }
        if let Some(t) = input.adjustment_type {
            template.adjustment_type = t;
        }
        if let Some(v) = input.adjustment_value {
            template.adjustment_value = v;
        }
        if input.department_filter.is_some() {
            template.department_filter = input.department_filter.clone();
        }
        if input.position_filter.is_some() {
            template.position_filter = input.position_filter.clone();
        }
        if input.default_reason.is_some() {
            template.default_reason = input.default_reason.clone();
        }
        template.updated_at = Utc::now();
        Ok(Some(template.clone()))
    }

    async fn delete(&self, id: DbId) -> Result<bool, CoreError> {
        Ok(self.state.write().await.templates.remove(&id).is_some())
    }

    async fn record_usage(&self, id: DbId, used_at: Timestamp) -> Result<(), CoreError> {
        let mut state = self.state.write().await;
        let template = state.templates.get_mut(&id).ok_or(CoreError::NotFound {
            entity: "OperationTemplate",
            id,
        })?;
        template.usage_count += 1;
        template.last_used_at = Some(used_at);
        Ok(())
    }

    async fn set_favorite(&self, id: DbId, is_favorite: bool) -> Result<(), CoreError> {
        let mut state = self.state.write().await;
        let template = state.templates.get_mut(&id).ok_or(CoreError::NotFound {
            entity: "OperationTemplate",
            id,
        })?;
        template.is_favorite = is_favorite;
        template.updated_at = Utc::now();
        Ok(())
    }
}
