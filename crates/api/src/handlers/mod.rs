pub mod adjustments;
pub mod analytics;
pub mod operations;
pub mod rollback;
pub mod templates;
