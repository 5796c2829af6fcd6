//! Domain core of the bulk salary adjustment backend.
//!
//! Pure types and algorithms (selection, calculation, preview, state
//! machine rules, rollback risk scoring, analytics aggregation) plus the
//! collaborator traits the engine and the database adapters share.

pub mod analytics;
pub mod calculator;
pub mod employee;
pub mod error;
pub mod operation;
pub mod preview;
pub mod rollback;
pub mod selection;
pub mod store;
pub mod template;
pub mod types;
