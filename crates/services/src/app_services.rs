use std::sync::Arc;

use storage::{Backend, ProgressStore, Storage};
use tracing::{error, info};

use crate::error::AppServicesError;
use crate::progress_service::ProgressService;

/// Assembles app-facing services on top of an initialized store.
#[derive(Clone)]
pub struct AppServices {
    progress: Arc<ProgressService>,
}

impl AppServices {
    /// Open the configured backend and run its startup check.
    ///
    /// A failed `initialize` is logged and tolerated; requests will then
    /// surface the storage error individually.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` only if the backend cannot be opened at all.
    pub async fn open(backend: &Backend) -> Result<Self, AppServicesError> {
        let storage = Storage::open(backend).await?;
        Ok(Self::with_store(storage.progress).await)
    }

    /// Build services around an existing store, initializing it first.
    pub async fn with_store(store: Arc<dyn ProgressStore>) -> Self {
        match store.initialize().await {
            Ok(()) => info!(backend = store.describe(), "progress store ready"),
            Err(err) => {
                error!(backend = store.describe(), error = %err, "failed to initialize progress store");
            }
        }
        Self {
            progress: Arc::new(ProgressService::new(store)),
        }
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }
}
