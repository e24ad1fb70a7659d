use async_trait::async_trait;
use chrono::Utc;
use progress_core::{ItemId, PartialUpdate, ProgressDocument};
use sqlx::Row;
use tracing::{debug, info};

use super::{SqliteProgressStore, schema};
use crate::repository::{ProgressStore, StorageError};

#[async_trait]
impl ProgressStore for SqliteProgressStore {
    async fn initialize(&self) -> Result<(), StorageError> {
        schema::ensure(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM progress_items")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Read(e.to_string()))?;
        info!(items, "sqlite progress store ready");
        Ok(())
    }

    async fn load(&self) -> Result<ProgressDocument, StorageError> {
        let rows = sqlx::query("SELECT item_id, done FROM progress_items")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Read(e.to_string()))?;

        rows.iter()
            .map(|row| -> Result<(ItemId, bool), StorageError> {
                let corrupt = |e: sqlx::Error| StorageError::Corrupt(e.to_string());
                let item_id: String = row.try_get("item_id").map_err(corrupt)?;
                let done: bool = row.try_get("done").map_err(corrupt)?;
                let id = ItemId::new(item_id)?;
                Ok((id, done))
            })
            .collect()
    }

    async fn merge(&self, update: &PartialUpdate) -> Result<(), StorageError> {
        if update.is_empty() {
            return Ok(());
        }
        let write = |e: sqlx::Error| StorageError::Write(e.to_string());
        let stamp = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await.map_err(write)?;
        for (id, done) in update.iter() {
            sqlx::query(
                "INSERT INTO progress_items (item_id, done, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(item_id) DO UPDATE SET done = excluded.done, updated_at = excluded.updated_at",
            )
            .bind(id.as_str())
            .bind(done)
            .bind(&stamp)
            .execute(&mut *tx)
            .await
            .map_err(write)?;
        }
        tx.commit().await.map_err(write)?;
        debug!(changed = update.len(), "progress rows upserted");
        Ok(())
    }

    fn describe(&self) -> &'static str {
        "sqlite"
    }
}
