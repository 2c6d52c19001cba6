pub mod activity;
pub mod agent;
pub mod api;
pub mod audit;
pub mod batch;
pub mod config;
pub mod deployments;
pub mod error;
pub mod platform;
pub mod preferences;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod templates;
pub mod triage;
pub mod webhook;

#[cfg(test)]
mod testing;
