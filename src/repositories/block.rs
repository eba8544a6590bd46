//! BlockRepository - Per-chat block entries of personal chats

use super::Read;
use crate::core::BlockPolicy;
use crate::entities::{BlockEntry, to_millis};
use chrono::{DateTime, Utc};
use sqlx::{Error, SqlitePool};
use tracing::{debug, instrument};

pub struct BlockRepository {
    connection_pool: SqlitePool,
}

impl BlockRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    /// Records that `blocked_by` blocked `blocked_id` in `chat_id`.
    ///
    /// Returns `false` when the entry already existed; the existing row is left
    /// untouched.
    #[instrument(skip(self), fields(chat_id = %chat_id, blocked_id = %blocked_id))]
    pub async fn insert_if_absent(
        &self,
        chat_id: i32,
        blocked_id: i32,
        blocked_by: i32,
        now: &DateTime<Utc>,
    ) -> Result<bool, Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO blocked_users (chat_id, blocked_id, blocked_by, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (chat_id, blocked_id) DO NOTHING
            "#,
        )
        .bind(chat_id)
        .bind(blocked_id)
        .bind(blocked_by)
        .bind(to_millis(now))
        .execute(&self.connection_pool)
        .await?;
        debug!("Block insert affected {} rows", result.rows_affected());
        Ok(result.rows_affected() == 1)
    }

    /// Removes the entry, returning whether one existed
    #[instrument(skip(self), fields(chat_id = %chat_id, blocked_id = %blocked_id))]
    pub async fn delete(&self, chat_id: i32, blocked_id: i32) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM blocked_users WHERE chat_id = ? AND blocked_id = ?")
            .bind(chat_id)
            .bind(blocked_id)
            .execute(&self.connection_pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Whether `user_id` has lost send capability in `chat_id` under `policy`
    #[instrument(skip(self), fields(chat_id = %chat_id, user_id = %user_id))]
    pub async fn is_gated(
        &self,
        chat_id: i32,
        user_id: i32,
        policy: BlockPolicy,
    ) -> Result<bool, Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM blocked_users
                WHERE chat_id = ?1 AND (blocked_id = ?2 OR (?3 AND blocked_by = ?2))
            )
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(policy == BlockPolicy::Symmetric)
        .fetch_one(&self.connection_pool)
        .await
    }

    #[instrument(skip(self), fields(chat_id = %chat_id))]
    pub async fn find_many_by_chat_id(&self, chat_id: &i32) -> Result<Vec<BlockEntry>, Error> {
        sqlx::query_as::<_, BlockEntry>(
            r#"
            SELECT chat_id, blocked_id, blocked_by, created_at
            FROM blocked_users
            WHERE chat_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(chat_id)
        .fetch_all(&self.connection_pool)
        .await
    }
}

/// Lookup by composite key `(chat_id, blocked_id)`
impl Read<BlockEntry, (i32, i32)> for BlockRepository {
    async fn read(&self, id: &(i32, i32)) -> Result<Option<BlockEntry>, Error> {
        let (chat_id, blocked_id) = id;
        sqlx::query_as::<_, BlockEntry>(
            r#"
            SELECT chat_id, blocked_id, blocked_by, created_at
            FROM blocked_users
            WHERE chat_id = ? AND blocked_id = ?
            "#,
        )
        .bind(chat_id)
        .bind(blocked_id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}
