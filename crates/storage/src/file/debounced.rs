use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use progress_core::{PartialUpdate, ProgressDocument};
use tracing::{debug, error};

use super::FileProgressStore;
use crate::repository::{ProgressStore, StorageError};

/// File store that coalesces bursts of updates into one write.
///
/// Updates are staged in memory. The first update after an idle period
/// schedules a single flush `window` later; updates arriving before it fires
/// join the same batch without pushing the flush back. A crash loses at most
/// one window of updates.
///
/// Each timer carries a ticket. An explicit [`flush`](ProgressStore::flush)
/// retires the outstanding ticket, so a timer that wakes afterwards does not
/// cut the next window short.
pub struct DebouncedFileStore {
    shared: Arc<Shared>,
}

struct Shared {
    file: FileProgressStore,
    window: Duration,
    staging: Mutex<Staging>,
    // Held across the whole take-and-write so batches reach disk in order.
    flush_lock: tokio::sync::Mutex<()>,
}

#[derive(Default)]
struct Staging {
    pending: PartialUpdate,
    /// Ticket of the timer that owns the current batch, if any.
    scheduled: Option<u64>,
    next_ticket: u64,
}

impl DebouncedFileStore {
    #[must_use]
    pub fn new(file: FileProgressStore, window: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                file,
                window,
                staging: Mutex::new(Staging::default()),
                flush_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.shared.window
    }

    /// The underlying file store.
    #[must_use]
    pub fn file(&self) -> &FileProgressStore {
        &self.shared.file
    }

    /// Number of staged item updates not yet written.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.shared
            .staging
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .len()
    }
}

impl Shared {
    /// Write the staged batch. With `ticket` set, only if that timer still
    /// owns the batch.
    async fn flush_pending(&self, ticket: Option<u64>) -> Result<(), StorageError> {
        let _flush = self.flush_lock.lock().await;
        let batch = {
            let mut staging = self
                .staging
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            if ticket.is_some() && staging.scheduled != ticket {
                return Ok(());
            }
            staging.scheduled = None;
            std::mem::take(&mut staging.pending)
        };
        if batch.is_empty() {
            return Ok(());
        }
        let count = batch.len();
        self.file.merge(&batch).await?;
        debug!(items = count, "flushed staged progress updates");
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for DebouncedFileStore {
    async fn initialize(&self) -> Result<(), StorageError> {
        self.shared.file.initialize().await
    }

    async fn load(&self) -> Result<ProgressDocument, StorageError> {
        // Blocks flushes so a batch is never both off the staging area and off disk.
        let _flush = self.shared.flush_lock.lock().await;
        let mut document = self.shared.file.load().await?;
        let staging = self
            .shared
            .staging
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        document.merge(&staging.pending);
        Ok(document)
    }

    async fn merge(&self, update: &PartialUpdate) -> Result<(), StorageError> {
        let schedule = {
            let mut staging = self
                .shared
                .staging
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            staging.pending.absorb(update.clone());
            if staging.scheduled.is_some() || staging.pending.is_empty() {
                None
            } else {
                staging.next_ticket += 1;
                staging.scheduled = Some(staging.next_ticket);
                staging.scheduled
            }
        };

        if let Some(ticket) = schedule {
            let shared = Arc::clone(&self.shared);
            tokio::spawn(async move {
                tokio::time::sleep(shared.window).await;
                if let Err(err) = shared.flush_pending(Some(ticket)).await {
                    error!(error = %err, "failed to write staged progress; batch dropped");
                }
            });
        }
        Ok(())
    }

    async fn flush(&self) -> Result<(), StorageError> {
        self.shared.flush_pending(None).await
    }

    fn describe(&self) -> &'static str {
        "debounced-file"
    }
}
