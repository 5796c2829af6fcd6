//! Collaborator traits for the data this subsystem reads and writes.
//!
//! Implemented for PostgreSQL in the db crate and in memory in the engine
//! crate. Implementations report storage failures as
//! [`CoreError::Persistence`] and missing rows as [`CoreError::NotFound`]
//! (or `Ok(None)` where the signature allows it).

use async_trait::async_trait;

use crate::employee::{Employee, EmployeeFilter, SalaryComponent};
use crate::error::CoreError;
use crate::operation::{
    BulkOperation, BulkOperationItem, ItemStatus, NewBulkOperation, NewOperationItem,
    OperationCounts, OperationDetail, OperationFilter, OperationStatus,
};
use crate::template::{CreateTemplate, OperationTemplate, UpdateTemplate};
use crate::types::{Amount, DbId, Timestamp};

/// Source of employees and their salary components.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    async fn list(&self, filter: &EmployeeFilter) -> Result<Vec<Employee>, CoreError>;

    async fn get_by_id(&self, id: DbId) -> Result<Option<Employee>, CoreError>;

    /// Replace the employee's salary components.
    async fn update_salary_components(
        &self,
        employee_id: DbId,
        components: &[SalaryComponent],
    ) -> Result<(), CoreError>;

    /// Replace the employee's salary components only while their gross
    /// salary still equals `expected_gross`. The comparison and the write
    /// are atomic with respect to other writers of the same employee.
    async fn update_salary_components_if(
        &self,
        employee_id: DbId,
        expected_gross: Amount,
        components: &[SalaryComponent],
    ) -> Result<ConditionalWrite, CoreError>;
}

/// Result of [`EmployeeDirectory::update_salary_components_if`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConditionalWrite {
    Written,
    /// Nothing was written; the gross salary had moved to `actual`.
    Stale { actual: Amount },
}

/// Details written alongside an item status change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemUpdate {
    pub error: Option<String>,
    pub processed_at: Option<Timestamp>,
}

/// Details written alongside an operation status change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationUpdate {
    pub counts: OperationCounts,
    pub executed_by: Option<String>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

/// Durable record of operations and their items.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Cheap reachability check.
    async fn ping(&self) -> Result<(), CoreError>;

    /// Persist an operation in `created` status with all items `pending`.
    /// Either everything is stored or nothing is.
    async fn create_operation(
        &self,
        operation: &NewBulkOperation,
        items: &[NewOperationItem],
    ) -> Result<DbId, CoreError>;

    /// Move an item to `status`, enforcing the item state machine.
    async fn update_item_status(
        &self,
        item_id: DbId,
        status: ItemStatus,
        update: &ItemUpdate,
    ) -> Result<(), CoreError>;

    /// Move an operation to `status`, enforcing the operation state machine.
    async fn update_operation_status(
        &self,
        operation_id: DbId,
        status: OperationStatus,
        update: &OperationUpdate,
    ) -> Result<(), CoreError>;

    /// Operations matching `filter`, newest first.
    async fn query_operations(
        &self,
        filter: &OperationFilter,
    ) -> Result<Vec<BulkOperation>, CoreError>;

    async fn get_operation_by_id(&self, id: DbId) -> Result<Option<OperationDetail>, CoreError>;

    async fn get_item(&self, item_id: DbId) -> Result<Option<BulkOperationItem>, CoreError>;
}

/// Persistence for reusable templates.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn create(&self, input: &CreateTemplate) -> Result<OperationTemplate, CoreError>;

    async fn get(&self, id: DbId) -> Result<Option<OperationTemplate>, CoreError>;

    async fn list(&self) -> Result<Vec<OperationTemplate>, CoreError>;

    async fn update(
        &self,
        id: DbId,
        input: &UpdateTemplate,
    ) -> Result<Option<OperationTemplate>, CoreError>;

    /// Returns `true` if a row was removed.
    async fn delete(&self, id: DbId) -> Result<bool, CoreError>;

    /// Increment `usage_count` and stamp `last_used_at`.
    async fn record_usage(&self, id: DbId, used_at: Timestamp) -> Result<(), CoreError>;

    async fn set_favorite(&self, id: DbId, is_favorite: bool) -> Result<(), CoreError>;
}
