//! Concurrent handler registry for the Sprocket engine
//!
//! Maps task-type names to handler instances. The registry is an explicit
//! object passed to whoever constructs an engine, so multiple isolated
//! engines can coexist in one process.

pub mod registry;

pub use registry::HandlerRegistry;
