//! Capability and persistence seams for the Sprocket engine
//!
//! This crate defines the traits the engine is generic over: the
//! [`TaskHandler`] capability contract implemented by each pluggable task
//! type, and the [`ExecutionRepository`] contract consumed for execution
//! record persistence. Keeping the seams in their own crate lets handler
//! and storage implementations depend on the contracts without pulling in
//! the engine.

pub mod handler;
pub mod repository;

pub use handler::{HandlerDescriptor, TaskHandler};
pub use repository::{ExecutionRepository, StorageError};
