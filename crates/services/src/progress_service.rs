use std::sync::Arc;

use progress_core::{PartialUpdate, ProgressDocument};
use serde_json::Value;
use storage::ProgressStore;
use tracing::debug;

use crate::error::ProgressServiceError;

/// Validates incoming progress updates and hands them to the store.
#[derive(Clone)]
pub struct ProgressService {
    store: Arc<dyn ProgressStore>,
}

impl ProgressService {
    #[must_use]
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn backend(&self) -> &'static str {
        self.store.describe()
    }

    /// Load the full progress document.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the store cannot be read.
    pub async fn load(&self) -> Result<ProgressDocument, ProgressServiceError> {
        Ok(self.store.load().await?)
    }

    /// Validate a raw JSON body and merge it into the document.
    ///
    /// Invalid input is rejected before the store is touched.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Validation` for bodies that are not an
    /// object of booleans, and `ProgressServiceError::Storage` if the merge
    /// cannot be persisted.
    pub async fn record(&self, body: Value) -> Result<PartialUpdate, ProgressServiceError> {
        let update = PartialUpdate::from_value(body)?;
        self.apply(&update).await?;
        Ok(update)
    }

    /// Merge an already-validated update.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the merge cannot be persisted.
    pub async fn apply(&self, update: &PartialUpdate) -> Result<(), ProgressServiceError> {
        self.store.merge(update).await?;
        debug!(changed = update.len(), backend = self.backend(), "progress merged");
        Ok(())
    }

    /// Write out anything the store is still holding in memory.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the flush fails.
    pub async fn flush(&self) -> Result<(), ProgressServiceError> {
        Ok(self.store.flush().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use storage::InMemoryProgressStore;

    fn service() -> (ProgressService, InMemoryProgressStore) {
        let repo = InMemoryProgressStore::new();
        (ProgressService::new(Arc::new(repo.clone())), repo)
    }

    #[tokio::test]
    async fn record_merges_valid_body() {
        let (service, repo) = service();
        let update = service.record(json!({"a": true})).await.unwrap();
        assert_eq!(update.len(), 1);
        assert_eq!(repo.load().await.unwrap().get("a"), Some(true));
    }

    #[tokio::test]
    async fn invalid_bodies_leave_the_document_unchanged() {
        let (service, repo) = service();
        service.record(json!({"a": true})).await.unwrap();

        for body in [json!(["a"]), json!("a"), json!({"b": 1}), Value::Null] {
            let err = service.record(body).await.unwrap_err();
            assert!(err.is_validation());
        }

        let doc = repo.load().await.unwrap();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.get("a"), Some(true));
    }

    #[tokio::test]
    async fn empty_body_is_idempotent() {
        let (service, _) = service();
        service.record(json!({"a": false})).await.unwrap();
        let before = service.load().await.unwrap();
        service.record(json!({})).await.unwrap();
        assert_eq!(service.load().await.unwrap(), before);
    }
}
