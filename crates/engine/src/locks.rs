//! Per-employee exclusivity for salary writes.
//!
//! Every item (forward or rollback) holds its employee's lock for the whole
//! read-check-write-record sequence, so the `previous_gross_salary` captured
//! on the item is still valid when the write lands. One item never holds
//! more than one lock, so lock ordering cannot deadlock.

use std::collections::HashMap;
use std::sync::Arc;

use payroll_core::types::DbId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of one async mutex per employee id.
///
/// Shared via `Arc` by every engine that writes to the same
/// employee directory.
#[derive(Default)]
pub struct EmployeeLocks {
    locks: Mutex<HashMap<DbId, Arc<Mutex<()>>>>,
}

impl EmployeeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to one employee.
    pub async fn acquire(&self, employee_id: DbId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.locks.lock().await;
            Arc::clone(map.entry(employee_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Drop registry entries nobody is holding or waiting on.
    pub async fn prune(&self) -> usize {
        let mut map = self.locks.lock().await;
        let before = map.len();
        map.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - map.len()
    }

    /// Number of employees with a registry entry.
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_employee_is_serialized() {
        let locks = Arc::new(EmployeeLocks::new());
        let guard = locks.acquire(1).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _g = locks.acquire(1).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_employees_do_not_block() {
        let locks = EmployeeLocks::new();
        let _a = locks.acquire(1).await;
        let _b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(2))
            .await
            .expect("second employee should not wait");
    }

    #[tokio::test]
    async fn prune_removes_idle_entries() {
        let locks = EmployeeLocks::new();
        let held = locks.acquire(1).await;
        drop(locks.acquire(2).await);
        assert_eq!(locks.len().await, 2);
        assert_eq!(locks.prune().await, 1);
        assert_eq!(locks.len().await, 1);
        drop(held);
    }
}
