//! HTTP client for the Debricked open API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::{debug, warn};

use super::models::{LoginResponse, StatusResponse, UploadResponse};
use super::{AuthToken, ProviderError, ScanProgress, ScanProvider, UploadFile};
use crate::config::ProviderSettings;

/// reqwest implementation of [`ScanProvider`].
pub struct DebrickedClient {
    client: reqwest::Client,
    api_url: String,
    login_url: String,
    username: String,
    password: String,
    repository_name: String,
    commit_name: String,
}

impl DebrickedClient {
    pub fn new(settings: &ProviderSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            login_url: settings.login_url.clone(),
            username: settings.username.clone(),
            password: settings.password.clone(),
            repository_name: settings.repository_name.clone(),
            commit_name: settings.commit_name.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path)
    }
}

fn transport(err: reqwest::Error) -> ProviderError {
    ProviderError::Transport(err.to_string())
}

#[async_trait]
impl ScanProvider for DebrickedClient {
    async fn authenticate(&self) -> Result<AuthToken, ProviderError> {
        let response = self
            .client
            .post(&self.login_url)
            .form(&[
                ("_username", self.username.as_str()),
                ("_password", self.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Auth(e.to_string()))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(ProviderError::Auth(format!(
                "login returned status {}",
                response.status()
            )));
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Auth(format!("invalid login response: {}", e)))?;
        Ok(AuthToken::new(body.token))
    }

    async fn submit_file(
        &self,
        token: &AuthToken,
        file: &UploadFile,
        existing_upload_id: Option<&str>,
    ) -> Result<String, ProviderError> {
        let file_part = Part::bytes(file.data.clone())
            .file_name(file.file_name.clone())
            .mime_str("application/octet-stream")
            .map_err(transport)?;

        let mut form = Form::new()
            .part("fileData", file_part)
            .text("repositoryName", self.repository_name.clone())
            .text("commitName", self.commit_name.clone());
        if let Some(upload_id) = existing_upload_id {
            form = form.text("ciUploadId", upload_id.to_string());
        }

        debug!(
            "Submitting {} ({} bytes), batch {:?}",
            file.file_name,
            file.data.len(),
            existing_upload_id
        );

        let response = self
            .client
            .post(self.endpoint("uploads/dependencies/files"))
            .bearer_auth(token.as_str())
            .header(reqwest::header::ACCEPT, "*/*")
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(ProviderError::Rejected {
                status: response.status().as_u16(),
            });
        }

        let body: UploadResponse = response.json().await.map_err(transport)?;
        body.upload_id().ok_or_else(|| {
            ProviderError::Transport("upload response carries no ciUploadId".to_string())
        })
    }

    async fn finalize_submission(
        &self,
        token: &AuthToken,
        upload_id: &str,
    ) -> Result<(), ProviderError> {
        let form = Form::new()
            .text("ciUploadId", upload_id.to_string())
            .text("returnCommitData", "false");

        let response = self
            .client
            .post(self.endpoint("finishes/dependencies/files/uploads"))
            .bearer_auth(token.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProviderError::Finalize(e.to_string()))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(ProviderError::Finalize(format!(
                "status {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn fetch_status(
        &self,
        token: &AuthToken,
        upload_id: &str,
    ) -> Result<ScanProgress, ProviderError> {
        let response = self
            .client
            .get(self.endpoint("ci/upload/status"))
            .query(&[("ciUploadId", upload_id)])
            .bearer_auth(token.as_str())
            .header(reqwest::header::ACCEPT, "*/*")
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            warn!(
                "Status check for upload {} returned {}",
                upload_id,
                response.status()
            );
            return Err(ProviderError::Status(format!(
                "status {} for upload {}",
                response.status(),
                upload_id
            )));
        }

        let body: StatusResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Status(format!("invalid status response: {}", e)))?;
        Ok(body.into())
    }
}
