use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use std::{fmt::Debug, path::PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use depscan_server::background_jobs::create_scheduler;
use depscan_server::background_jobs::jobs::ScanStatusCheckJob;
use depscan_server::config;
use depscan_server::notifier::{LogNotifier, MailRelayNotifier, Notifier};
use depscan_server::provider::{DebrickedClient, ScanProvider};
use depscan_server::reconciler::ScanReconciler;
use depscan_server::scan_store::{ScanStore, SqliteScanStore};
use depscan_server::server::{run_server, RequestsLoggingLevel, ServerConfig, ServerState};
use depscan_server::uploads::UploadManager;

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

fn parse_dir(s: &str) -> Result<PathBuf, String> {
    let path = parse_path(s)?;
    if !path.exists() {
        return Err(format!("Directory does not exist: {}", s));
    }
    if !path.is_dir() {
        return Err(format!("Path is not a directory: {}", s));
    }
    Ok(path)
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding scan.db. Can also be specified in config file.
    #[clap(long, value_parser = parse_dir)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 8080)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Largest accepted upload request, in megabytes.
    #[clap(long, default_value_t = 50)]
    pub max_upload_size_mb: usize,

    /// Base URL of the provider's open API.
    #[clap(long)]
    pub provider_api_url: Option<String>,

    #[clap(long)]
    pub provider_login_url: Option<String>,

    #[clap(long)]
    pub provider_username: Option<String>,

    #[clap(long)]
    pub provider_password: Option<String>,

    /// Repository name attached to every submitted file.
    #[clap(long)]
    pub provider_repository_name: Option<String>,

    /// Commit name attached to every submitted file.
    #[clap(long)]
    pub provider_commit_name: Option<String>,

    /// Timeout in seconds for provider requests.
    #[clap(long, default_value_t = 60)]
    pub provider_timeout_sec: u64,

    /// Completed scans notify only when they found more vulnerabilities than this.
    #[clap(long, default_value_t = 0)]
    pub vulnerability_threshold: u64,

    /// Seconds between two checks of the pending scan jobs.
    #[clap(long, default_value_t = 5)]
    pub scan_check_interval_sec: u64,

    /// HTTP mail relay endpoint. Without it notifications are only logged.
    #[clap(long)]
    pub mail_relay_url: Option<String>,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_dir: args.db_dir.clone(),
            port: args.port,
            logging_level: args.logging_level.clone(),
            max_upload_size_mb: args.max_upload_size_mb,
            provider_api_url: args.provider_api_url.clone(),
            provider_login_url: args.provider_login_url.clone(),
            provider_username: args.provider_username.clone(),
            provider_password: args.provider_password.clone(),
            provider_repository_name: args.provider_repository_name.clone(),
            provider_commit_name: args.provider_commit_name.clone(),
            provider_timeout_sec: args.provider_timeout_sec,
            vulnerability_threshold: args.vulnerability_threshold,
            scan_check_interval_sec: args.scan_check_interval_sec,
            mail_relay_url: args.mail_relay_url.clone(),
        }
    }
}

fn make_notifier(settings: &config::NotifierSettings) -> Result<Arc<dyn Notifier>> {
    match &settings.mail_relay_url {
        Some(url) => {
            info!("Mail relay configured at {}", url);
            Ok(Arc::new(MailRelayNotifier::new(
                url.clone(),
                settings.timeout_sec,
            )?))
        }
        None => {
            info!("No mail relay configured, notifications will only be logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  db_dir: {:?}", app_config.db_dir);
    info!("  port: {}", app_config.port);
    info!("  provider: {:?}", app_config.provider);
    info!(
        "  vulnerability_threshold: {}",
        app_config.vulnerability_threshold
    );
    info!(
        "  scan_check_interval_sec: {}",
        app_config.scan_check_interval_sec
    );

    info!("Opening scan database at {:?}...", app_config.scan_db_path());
    let scan_store: Arc<dyn ScanStore> = Arc::new(SqliteScanStore::new(app_config.scan_db_path())?);
    let provider: Arc<dyn ScanProvider> = Arc::new(DebrickedClient::new(&app_config.provider)?);
    let notifier = make_notifier(&app_config.notifier)?;

    let upload_manager = Arc::new(UploadManager::new(
        provider.clone(),
        scan_store.clone(),
        notifier.clone(),
    ));
    let reconciler = Arc::new(ScanReconciler::new(
        provider,
        scan_store.clone(),
        notifier.clone(),
        app_config.vulnerability_threshold,
    ));

    let shutdown_token = CancellationToken::new();
    let (mut scheduler, scheduler_handle) = create_scheduler(shutdown_token.clone());
    scheduler
        .register_job(Arc::new(ScanStatusCheckJob::new(
            reconciler,
            Duration::from_secs(app_config.scan_check_interval_sec),
        )))
        .await;
    let scheduler_task = tokio::spawn(async move { scheduler.run().await });

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        max_upload_size_mb: app_config.max_upload_size_mb,
    };
    let state = ServerState::new(
        server_config,
        upload_manager,
        scan_store,
        notifier,
        Some(scheduler_handle),
    );

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, initiating graceful shutdown");
                signal_token.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    info!("Ready to serve at port {}!", app_config.port);
    let result = run_server(state, shutdown_token.clone()).await;
    info!("HTTP server stopped: {:?}", result);

    // An in-flight status check is allowed to finish before exit.
    shutdown_token.cancel();
    if let Err(e) = scheduler_task.await {
        error!("Scheduler task failed: {}", e);
    }
    info!("Scheduler stopped");

    result
}
