//! SQLite schema for the scan job database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

// =============================================================================
// Version 1 - Scan jobs
// =============================================================================

const SCAN_JOBS_TABLE_V1: Table = Table {
    name: "scan_jobs",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("ci_upload_id", &SqlType::Text, non_null = true),
        sqlite_column!("notify_target", &SqlType::Text, non_null = true),
        sqlite_column!("status", &SqlType::Text, non_null = true),
        sqlite_column!("files_submitted", &SqlType::Integer, non_null = true),
        sqlite_column!("vulnerabilities_found", &SqlType::Integer),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
        sqlite_column!("completed_at", &SqlType::Integer),
    ],
    indices: &[
        ("idx_scan_jobs_status", "status"),
        ("idx_scan_jobs_ci_upload_id", "ci_upload_id"),
    ],
};

/// All versioned schemas for the scan job database.
///
/// Version 1: scan_jobs table
pub const SCAN_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[SCAN_JOBS_TABLE_V1],
    migration: None,
}];
