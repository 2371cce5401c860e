mod file_config;

pub use file_config::{FileConfig, NotifierConfig, ProviderConfig};

use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_LOGIN_URL: &str = "https://debricked.com/api/login_check";
pub const DEFAULT_API_URL: &str = "https://debricked.com/api/1.0/open/";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub max_upload_size_mb: usize,
    pub provider_api_url: Option<String>,
    pub provider_login_url: Option<String>,
    pub provider_username: Option<String>,
    pub provider_password: Option<String>,
    pub provider_repository_name: Option<String>,
    pub provider_commit_name: Option<String>,
    pub provider_timeout_sec: u64,
    pub vulnerability_threshold: u64,
    pub scan_check_interval_sec: u64,
    pub mail_relay_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    /// Body limit of the upload route.
    pub max_upload_size_mb: usize,

    /// A completed scan notifies only when its count is strictly above this.
    pub vulnerability_threshold: u64,
    pub scan_check_interval_sec: u64,

    pub provider: ProviderSettings,
    pub notifier: NotifierSettings,
}

/// Connection settings for the scanning provider.
#[derive(Clone)]
pub struct ProviderSettings {
    pub api_url: String,
    pub login_url: String,
    pub username: String,
    pub password: String,
    pub repository_name: String,
    pub commit_name: String,
    pub timeout_sec: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            login_url: DEFAULT_LOGIN_URL.to_string(),
            username: String::new(),
            password: String::new(),
            repository_name: "repo6".to_string(),
            commit_name: "commit6".to_string(),
            timeout_sec: 60,
        }
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_url", &self.api_url)
            .field("login_url", &self.login_url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("repository_name", &self.repository_name)
            .field("commit_name", &self.commit_name)
            .field("timeout_sec", &self.timeout_sec)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct NotifierSettings {
    /// Without a relay, notifications are only logged.
    pub mail_relay_url: Option<String>,
    pub timeout_sec: u64,
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self {
            mail_relay_url: None,
            timeout_sec: 30,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());
        let vulnerability_threshold = file
            .vulnerability_threshold
            .unwrap_or(cli.vulnerability_threshold);
        let scan_check_interval_sec = file
            .scan_check_interval_sec
            .unwrap_or(cli.scan_check_interval_sec);
        if scan_check_interval_sec == 0 {
            bail!("scan_check_interval_sec must be greater than zero");
        }
        let max_upload_size_mb = file.max_upload_size_mb.unwrap_or(cli.max_upload_size_mb);
        if max_upload_size_mb == 0 {
            bail!("max_upload_size_mb must be greater than zero");
        }

        let defaults = ProviderSettings::default();
        let provider_file = file.provider.unwrap_or_default();
        let provider = ProviderSettings {
            api_url: provider_file
                .api_url
                .or_else(|| cli.provider_api_url.clone())
                .unwrap_or(defaults.api_url),
            login_url: provider_file
                .login_url
                .or_else(|| cli.provider_login_url.clone())
                .unwrap_or(defaults.login_url),
            username: provider_file
                .username
                .or_else(|| cli.provider_username.clone())
                .unwrap_or_default(),
            password: provider_file
                .password
                .or_else(|| cli.provider_password.clone())
                .unwrap_or_default(),
            repository_name: provider_file
                .repository_name
                .or_else(|| cli.provider_repository_name.clone())
                .unwrap_or(defaults.repository_name),
            commit_name: provider_file
                .commit_name
                .or_else(|| cli.provider_commit_name.clone())
                .unwrap_or(defaults.commit_name),
            timeout_sec: provider_file.timeout_sec.unwrap_or(cli.provider_timeout_sec),
        };

        let notifier_file = file.notifier.unwrap_or_default();
        let notifier = NotifierSettings {
            mail_relay_url: notifier_file
                .mail_relay_url
                .or_else(|| cli.mail_relay_url.clone()),
            timeout_sec: notifier_file
                .timeout_sec
                .unwrap_or(NotifierSettings::default().timeout_sec),
        };

        Ok(Self {
            db_dir,
            port,
            logging_level,
            max_upload_size_mb,
            vulnerability_threshold,
            scan_check_interval_sec,
            provider,
            notifier,
        })
    }

    pub fn scan_db_path(&self) -> PathBuf {
        self.db_dir.join("scan.db")
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
