use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub logging_level: Option<String>,
    pub vulnerability_threshold: Option<u64>,
    pub scan_check_interval_sec: Option<u64>,
    pub max_upload_size_mb: Option<usize>,

    pub provider: Option<ProviderConfig>,
    pub notifier: Option<NotifierConfig>,
}

/// `[provider]` table.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_url: Option<String>,
    pub login_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub repository_name: Option<String>,
    pub commit_name: Option<String>,
    pub timeout_sec: Option<u64>,
}

/// `[notifier]` table.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct NotifierConfig {
    pub mail_relay_url: Option<String>,
    pub timeout_sec: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
