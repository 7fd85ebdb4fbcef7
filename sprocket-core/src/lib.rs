//! Core domain models and types for Sprocket
//!
//! This crate contains the fundamental types used throughout the Sprocket
//! engine. It has minimal dependencies and defines the domain language of
//! the system: the context a task runs with, the result envelope it
//! produces, the persisted execution record, and the structured error a
//! handler raises.

pub mod context;
pub mod error;
pub mod record;
pub mod result;

// Re-export commonly used types at the crate root
pub use context::TaskContext;
pub use error::TaskError;
pub use record::{ExecutionRecord, ExecutionStatus};
pub use result::{TaskResult, TaskStatus};
