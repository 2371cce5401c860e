use axum::extract::FromRef;

use crate::background_jobs::SchedulerHandle;
use crate::notifier::Notifier;
use crate::scan_store::ScanStore;
use crate::uploads::UploadManager;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedUploadManager = Arc<UploadManager>;
pub type GuardedScanStore = Arc<dyn ScanStore>;
pub type GuardedNotifier = Arc<dyn Notifier>;
pub type OptionalSchedulerHandle = Option<SchedulerHandle>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub hash: String,
    pub upload_manager: GuardedUploadManager,
    pub scan_store: GuardedScanStore,
    pub notifier: GuardedNotifier,
    pub scheduler_handle: OptionalSchedulerHandle,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        upload_manager: GuardedUploadManager,
        scan_store: GuardedScanStore,
        notifier: GuardedNotifier,
        scheduler_handle: OptionalSchedulerHandle,
    ) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            hash: env!("GIT_HASH").to_string(),
            upload_manager,
            scan_store,
            notifier,
            scheduler_handle,
        }
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedUploadManager {
    fn from_ref(input: &ServerState) -> Self {
        input.upload_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedScanStore {
    fn from_ref(input: &ServerState) -> Self {
        input.scan_store.clone()
    }
}

impl FromRef<ServerState> for GuardedNotifier {
    fn from_ref(input: &ServerState) -> Self {
        input.notifier.clone()
    }
}

impl FromRef<ServerState> for OptionalSchedulerHandle {
    fn from_ref(input: &ServerState) -> Self {
        input.scheduler_handle.clone()
    }
}
