//! Depscan Server Library
//!
//! Uploads dependency manifests to a scanning provider, tracks each scan
//! until it completes and notifies the submitter about vulnerabilities.

pub mod background_jobs;
pub mod config;
pub mod notifier;
pub mod provider;
pub mod reconciler;
pub mod scan_store;
pub mod server;
pub mod sqlite_persistence;
pub mod uploads;

#[cfg(test)]
mod test_support;

// Re-export commonly used types for convenience
pub use scan_store::{ScanStore, SqliteScanStore};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerState};
