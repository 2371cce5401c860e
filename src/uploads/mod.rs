mod manager;

pub use manager::{FileFailure, UploadError, UploadManager, UploadOutcome};
