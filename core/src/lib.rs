pub mod clock;
pub mod config;
pub mod dashboard;
pub mod enrollment_analytics;
pub mod error;
pub mod membership;
pub mod record;
pub mod store;
pub mod subject;
pub mod target_registry;
pub mod types;
