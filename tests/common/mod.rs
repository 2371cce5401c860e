//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestServer, TestClient, DEV_EMAIL};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_upload() {
//!     let server = TestServer::spawn().await;
//!     let client = TestClient::new(server.base_url.clone());
//!
//!     let response = client.upload(&[("go.sum", "")], Some(DEV_EMAIL)).await;
//!     assert_eq!(response.status(), StatusCode::OK);
//! }
//! ```

mod client;
mod constants;
mod fake_provider;
mod mail_relay;

// Public API - this is what tests import
#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use constants::*;
#[allow(unused_imports)]
pub use fake_provider::{FakeProvider, RecordedFinalize, RecordedUpload};
#[allow(unused_imports)]
pub use mail_relay::{FakeMailRelay, RelayedMail};
#[allow(unused_imports)]
pub use server::{TestServer, TestServerOptions, SCAN_STATUS_CHECK_JOB_ID};
