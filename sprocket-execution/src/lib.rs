//! Sprocket execution engine
//!
//! The execution core: resolves a handler from the registry, drives the
//! validate → before → execute → after lifecycle for one attempt, stamps
//! timing, persists start and terminal records through the repository
//! seam, and normalizes every failure into the structured error taxonomy.
//! Asynchronous dispatch wraps the same flow in a fixed-size worker pool.

pub mod dispatch;
pub mod engine;
pub mod error;

pub use dispatch::{DispatchConfig, DispatchPool, ExecutionHandle};
pub use engine::{EngineMetrics, ExecutionEngine};
pub use error::EngineError;
