//! GitHub webhook receiver: auto-triage of newly opened issues.

pub mod events;
pub mod handler;
pub mod signature;
