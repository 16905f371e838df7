// Generation job queue engine for the aria music catalogue.
// Producers insert pending rows; the scheduler drains them through
// registered handlers and writes terminal states back durably.

pub mod config;
pub mod db;
pub mod errors;
pub mod executor;
pub mod models;
pub mod queue;
pub mod recovery;
pub mod registry;
pub mod scheduler;
pub mod store;
