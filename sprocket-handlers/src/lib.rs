//! Sample task handler implementations
//!
//! Two concrete handlers demonstrating the polymorphic capability
//! contract: batch data aggregation and notification delivery. They are
//! ordinary registry entries; the engine knows nothing about them.

pub mod data_processing;
pub mod notification;

pub use data_processing::DataProcessingHandler;
pub use notification::NotificationHandler;
