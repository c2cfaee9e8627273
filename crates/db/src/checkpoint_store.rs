//! Checkpoint store backed by the `relay_state` table.
//!
//! One row per relay key; the whole [`StateDocument`] is stored as JSONB and
//! replaced on every write.

use async_trait::async_trait;
use logrelay_core::{CheckpointStore, StateDocument, StoreError};

use crate::DbPool;

pub struct PgCheckpointStore {
    pool: DbPool,
    key: String,
}

impl PgCheckpointStore {
    pub fn new(pool: DbPool, key: impl Into<String>) -> Self {
        Self {
            pool,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl CheckpointStore for PgCheckpointStore {
    /// A missing row reads as the default document (start of stream).
    async fn read(&self) -> Result<StateDocument, StoreError> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT document FROM relay_state WHERE key = $1")
                .bind(&self.key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Read {
                    key: self.key.clone(),
                    source: Box::new(e),
                })?;

        match row {
            Some((document,)) => {
                serde_json::from_value(document).map_err(|e| StoreError::Corrupt {
                    key: self.key.clone(),
                    source: e,
                })
            }
            None => {
                tracing::debug!(key = %self.key, "No stored checkpoint, starting from scratch");
                Ok(StateDocument::default())
            }
        }
    }

    async fn write(&self, document: &StateDocument) -> Result<(), StoreError> {
        let value = serde_json::to_value(document).map_err(|e| StoreError::Write {
            key: self.key.clone(),
            source: Box::new(e),
        })?;

        sqlx::query(
            "INSERT INTO relay_state (key, document) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET \
                 document   = EXCLUDED.document, \
                 updated_at = now()",
        )
        .bind(&self.key)
        .bind(&value)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Write {
            key: self.key.clone(),
            source: Box::new(e),
        })?;

        tracing::debug!(
            key = %self.key,
            cursor = document.checkpoint.cursor_id.as_ref().map_or("start", |c| c.as_str()),
            "Checkpoint written"
        );
        Ok(())
    }
}
