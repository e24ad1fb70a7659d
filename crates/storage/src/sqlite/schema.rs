use sqlx::SqlitePool;

use super::SqliteInitError;

/// Tracked in `PRAGMA user_version`; bump together with a new step below.
pub const SCHEMA_VERSION: i64 = 1;

pub(super) async fn ensure(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    let mut tx = pool.begin().await?;
    let found: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(&mut *tx)
        .await?;

    if found > SCHEMA_VERSION {
        return Err(SqliteInitError::SchemaTooNew {
            found,
            supported: SCHEMA_VERSION,
        });
    }
    if found == SCHEMA_VERSION {
        return Ok(());
    }

    if found < 1 {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS progress_items (
                item_id TEXT PRIMARY KEY NOT NULL CHECK (length(item_id) > 0),
                done INTEGER NOT NULL CHECK (done IN (0, 1)),
                updated_at TEXT NOT NULL
            ) WITHOUT ROWID
            ",
        )
        .execute(&mut *tx)
        .await?;
    }

    // PRAGMA does not take bound parameters.
    sqlx::query(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}
