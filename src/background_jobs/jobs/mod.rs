//! Specific background job implementations.

pub mod scan_status_check;

pub use scan_status_check::ScanStatusCheckJob;
