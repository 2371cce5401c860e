//! Shared constants for end-to-end tests
//!
//! When the fake provider's credentials or the default batch metadata change,
//! update only this file.

// ============================================================================
// Fake Provider Credentials
// ============================================================================

pub const PROVIDER_USER: &str = "ci-bot";

pub const PROVIDER_PASS: &str = "ci-bot-secret";

/// Token the fake provider hands out on a successful login
pub const PROVIDER_TOKEN: &str = "fake-jwt-token";

// ============================================================================
// Batch Metadata
// ============================================================================

pub const REPOSITORY_NAME: &str = "depscan-e2e";

pub const COMMIT_NAME: &str = "e2e-commit";

/// First `ciUploadId` issued by the fake provider
pub const FIRST_UPLOAD_ID: u64 = 1000;

// ============================================================================
// Notification Targets
// ============================================================================

pub const DEV_EMAIL: &str = "dev@example.com";

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for the server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// HTTP request timeout for test client (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server readiness (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Maximum time to wait for a triggered background job (milliseconds)
pub const JOB_COMPLETION_TIMEOUT_MS: u64 = 5000;
