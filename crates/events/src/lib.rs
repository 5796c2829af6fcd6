//! Operation event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`OperationEvent`]: the event envelope published by the engine while
//!   bulk operations are created and executed.

pub mod bus;

pub use bus::{EventBus, OperationEvent};
