use std::{path::PathBuf, sync::Arc, time::Duration};

use aps_client::ModelService;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024 * 1024;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Shared per-process state handed to every handler. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub models: Arc<dyn ModelService>,
    pub max_upload_bytes: usize,
    pub request_timeout: Duration,
    pub static_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(models: Arc<dyn ModelService>) -> Self {
        Self {
            models,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            static_dir: None,
        }
    }

    pub fn with_limits(mut self, max_upload_bytes: usize, request_timeout: Duration) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    pub fn bucket(&self) -> &str {
        self.models.bucket()
    }
}
