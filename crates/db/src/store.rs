//! PostgreSQL implementations of the `payroll-core` store traits.
//!
//! Every multi-statement write runs in one transaction. Status changes lock
//! the row (`SELECT ... FOR UPDATE`) and check the state machine before
//! writing, so concurrent writers cannot skip a transition.

use std::collections::HashMap;

use async_trait::async_trait;
use payroll_core::employee::{gross_salary, Employee, EmployeeFilter, SalaryComponent};
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

use crate::models::bulk_operation::encode_component_changes;
use crate::models::employee::{EmployeeRow, SalaryComponentRow};
use crate::models::status::{self, ItemStatusId, OperationStatusId};
use crate::repositories::{BulkOperationItemRepo, BulkOperationRepo, EmployeeRepo, TemplateRepo};
use crate::DbPool;

/// Map a database error to the domain's persistence error.
fn db_err(e: sqlx::Error) -> CoreError {
    tracing::error!(error = %e, "Database error");
    CoreError::Persistence(e.to_string())
}

// ---------------------------------------------------------------------------
// Employees
// ---------------------------------------------------------------------------

pub struct PgEmployeeDirectory {
    pool: DbPool,
}

impl PgEmployeeDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn hydrate(&self, rows: Vec<EmployeeRow>) -> Result<Vec<Employee>, CoreError> {
        let ids: Vec<DbId> = rows.iter().map(|r| r.id).collect();
        let mut components: HashMap<DbId, Vec<SalaryComponentRow>> = HashMap::new();
        for component in EmployeeRepo::components_for(&self.pool, &ids)
            .await
            .map_err(db_err)?
        {
            components
                .entry(component.employee_id)
                .or_default()
                .push(component);
        }
        rows.into_iter()
            .map(|row| {
                let owned = components.remove(&row.id).unwrap_or_default();
                row.into_domain(owned)
            })
            .collect()
    }
}

#[async_trait]
impl EmployeeDirectory for PgEmployeeDirectory {
    async fn list(&self, filter: &EmployeeFilter) -> Result<Vec<Employee>, CoreError> {
        let rows = EmployeeRepo::list(&self.pool, filter)
            .await
            .map_err(db_err)?;
        self.hydrate(rows).await
    }

    async fn get_by_id(&self, id: DbId) -> Result<Option<Employee>, CoreError> {
        let Some(row) = EmployeeRepo::find_by_id(&self.pool, id)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };
        Ok(self.hydrate(vec![row]).await?.pop())
    }

    async fn update_salary_components(
        &self,
        employee_id: DbId,
        components: &[SalaryComponent],
    ) -> Result<(), CoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        if !EmployeeRepo::lock(&mut *tx, employee_id)
            .await
            .map_err(db_err)?
        {
            return Err(CoreError::NotFound {
                entity: "Employee",
                id: employee_id,
            });
        }
        EmployeeRepo::replace_components(&mut *tx, employee_id, components)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)
    }

    async fn update_salary_components_if(
        &self,
        employee_id: DbId,
        expected_gross: Amount,
        components: &[SalaryComponent],
    ) -> Result<ConditionalWrite, CoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        if !EmployeeRepo::lock(&mut *tx, employee_id)
            .await
            .map_err(db_err)?
        {
            return Err(CoreError::NotFound {
                entity: "Employee",
                id: employee_id,
            });
        }

        let current = EmployeeRepo::components_of(&mut *tx, employee_id)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(SalaryComponentRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;
        let actual = gross_salary(&current);
        if !approx_eq(actual, expected_gross) {
            // Dropping the transaction rolls back and releases the lock.
            return Ok(ConditionalWrite::Stale { actual });
        }

        EmployeeRepo::replace_components(&mut *tx, employee_id, components)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(ConditionalWrite::Written)
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

pub struct PgHistoryStore {
    pool: DbPool,
}

impl PgHistoryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn ping(&self) -> Result<(), CoreError> {
        crate::health_check(&self.pool).await.map_err(db_err)
    }

    async fn create_operation(
        &self,
        operation: &NewBulkOperation,
        items: &[NewOperationItem],
    ) -> Result<DbId, CoreError> {
        let encoded = items
            .iter()
            .map(|i| encode_component_changes(&i.component_changes))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let id = BulkOperationRepo::create(&mut *tx, operation)
            .await
            .map_err(db_err)?;
        for (item, changes) in items.iter().zip(&encoded) {
            BulkOperationItemRepo::create(&mut *tx, id, item, changes)
                .await
                .map_err(db_err)?;
        }
        tx.commit().await.map_err(db_err)?;
        Ok(id)
    }

    async fn update_item_status(
        &self,
        item_id: DbId,
        status: ItemStatus,
        update: &ItemUpdate,
    ) -> Result<(), CoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let current = BulkOperationItemRepo::lock_status(&mut *tx, item_id)
            .await
            .map_err(db_err)?
            .ok_or(CoreError::NotFound {
                entity: "BulkOperationItem",
                id: item_id,
            })?;
        validate_item_transition(status::item_status(current)?, status)?;

        let status_id = ItemStatusId::from(status).id();
        let written = if status == ItemStatus::Rolledback {
            BulkOperationItemRepo::set_status(&mut *tx, item_id, status_id).await
        } else {
            BulkOperationItemRepo::update_outcome(&mut *tx, item_id, status_id, update).await
        };
        written.map_err(db_err)?;
        tx.commit().await.map_err(db_err)
    }

    async fn update_operation_status(
        &self,
        operation_id: DbId,
        status: OperationStatus,
        update: &OperationUpdate,
    ) -> Result<(), CoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let current = BulkOperationRepo::lock_status(&mut *tx, operation_id)
            .await
            .map_err(db_err)?
            .ok_or(CoreError::NotFound {
                entity: "BulkOperation",
                id: operation_id,
            })?;
        validate_operation_transition(status::operation_status(current)?, status)?;

        BulkOperationRepo::update_status(
            &mut *tx,
            operation_id,
            OperationStatusId::from(status).id(),
            update,
        )
        .await
        .map_err(db_err)?;
        tx.commit().await.map_err(db_err)
    }

    async fn query_operations(
        &self,
        filter: &OperationFilter,
    ) -> Result<Vec<BulkOperation>, CoreError> {
        BulkOperationRepo::query(&self.pool, filter)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|row| row.into_domain())
            .collect()
    }

    async fn get_operation_by_id(&self, id: DbId) -> Result<Option<OperationDetail>, CoreError> {
        let Some(row) = BulkOperationRepo::find_by_id(&self.pool, id)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };
        let items = BulkOperationItemRepo::list_by_operation(&self.pool, id)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|r| r.into_domain())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(OperationDetail {
            operation: row.into_domain()?,
            items,
        }))
    }

    async fn get_item(&self, item_id: DbId) -> Result<Option<BulkOperationItem>, CoreError> {
        BulkOperationItemRepo::find_by_id(&self.pool, item_id)
            .await
            .map_err(db_err)?
            .map(|r| r.into_domain())
            .transpose()
    }
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

pub struct PgTemplateStore {
    pool: DbPool,
}

impl PgTemplateStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn template_not_found(id: DbId) -> CoreError {
    CoreError::NotFound {
        entity: "OperationTemplate",
        id,
    }
}

#[async_trait]
impl TemplateStore for PgTemplateStore {
    async fn create(&self, input: &CreateTemplate) -> Result<OperationTemplate, CoreError> {
        TemplateRepo::create(&self.pool, input)
            .await
            .map_err(db_err)?
            .into_domain()
    }

    async fn get(&self, id: DbId) -> Result<Option<OperationTemplate>, CoreError> {
        TemplateRepo::find_by_id(&self.pool, id)
            .await
            .map_err(db_err)?
            .map(|r| r.into_domain())
            .transpose()
    }

    async fn list(&self) -> Result<Vec<OperationTemplate>, CoreError> {
        TemplateRepo::list(&self.pool)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|r| r.into_domain())
            .collect()
    }

    async fn update(
        &self,
        id: DbId,
        input: &UpdateTemplate,
    ) -> Result<Option<OperationTemplate>, CoreError> {
        TemplateRepo::update(&self.pool, id, input)
            .await
            .map_err(db_err)?
            .map(|r| r.into_domain())
            .transpose()
    }

    async fn delete(&self, id: DbId) -> Result<bool, CoreError> {
        TemplateRepo::delete(&self.pool, id).await.map_err(db_err)
    }

    async fn record_usage(&self, id: DbId, used_at: Timestamp) -> Result<(), CoreError> {
        if TemplateRepo::record_usage(&self.pool, id, used_at)
            .await
            .map_err(db_err)?
        {
            Ok(())
        } else {
            Err(template_not_found(id))
        }
    }

    async fn set_favorite(&self, id: DbId, is_favorite: bool) -> Result<(), CoreError> {
        if TemplateRepo::set_favorite(&self.pool, id, is_favorite)
            .await
            .map_err(db_err)?
        {
            Ok(())
        } else {
            Err(template_not_found(id))
        }
    }
}
