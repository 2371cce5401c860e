//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per server endpoint. When API routes or
//! request formats change, update only this file.

use super::constants::*;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    pub async fn home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Home request failed")
    }

    /// POST /api/dependencies/upload with one `files` part per entry
    pub async fn upload(&self, files: &[(&str, &str)], email: Option<&str>) -> Response {
        let mut form = Form::new();
        for (name, data) in files {
            form = form.part(
                "files",
                Part::bytes(data.as_bytes().to_vec()).file_name(name.to_string()),
            );
        }
        if let Some(email) = email {
            form = form.text("email", email.to_string());
        }

        self.client
            .post(format!("{}/api/dependencies/upload", self.base_url))
            .multipart(form)
            .send()
            .await
            .expect("Upload request failed")
    }

    pub async fn list_jobs(&self, status: Option<&str>) -> Response {
        let mut request = self
            .client
            .get(format!("{}/api/dependencies/jobs", self.base_url));
        if let Some(status) = status {
            request = request.query(&[("status", status)]);
        }
        request.send().await.expect("List jobs request failed")
    }

    pub async fn get_job(&self, job_id: &str) -> Response {
        self.client
            .get(format!("{}/api/dependencies/jobs/{}", self.base_url, job_id))
            .send()
            .await
            .expect("Get job request failed")
    }

    pub async fn admin_list_jobs(&self) -> Response {
        self.client
            .get(format!("{}/admin/jobs", self.base_url))
            .send()
            .await
            .expect("Admin list jobs request failed")
    }

    pub async fn admin_trigger_job(&self, job_id: &str) -> Response {
        self.client
            .post(format!("{}/admin/jobs/{}/trigger", self.base_url, job_id))
            .send()
            .await
            .expect("Admin trigger job request failed")
    }
}
