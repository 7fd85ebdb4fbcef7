//! Execution record storage implementations for Sprocket
//!
//! Provides the in-memory reference implementation of the
//! [`sprocket_interfaces::ExecutionRepository`] contract, plus testing
//! fakes for exercising the engine's persistence behavior.

pub mod memory;
pub mod testing;

pub use memory::InMemoryExecutionRepository;
