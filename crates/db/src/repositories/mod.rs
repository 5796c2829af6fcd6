//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` (or a transaction connection) as the first
//! argument and return `sqlx::Error`.

pub mod bulk_operation_item_repo;
pub mod bulk_operation_repo;
pub mod employee_repo;
pub mod template_repo;

pub use bulk_operation_item_repo::BulkOperationItemRepo;
pub use bulk_operation_repo::BulkOperationRepo;
pub use employee_repo::EmployeeRepo;
pub use template_repo::TemplateRepo;
