//! Row structs and conversions.
//!
//! Each submodule contains a `FromRow` struct matching the database row and
//! a conversion into the `payroll-core` domain type. Conversions fail with
//! `CoreError::Internal` when a stored value does not decode.

pub mod bulk_operation;
pub mod employee;
pub mod status;
pub mod template;
