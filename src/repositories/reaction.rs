//! ReactionRepository - (message, user, emoji) triples

use crate::entities::{Reaction, to_millis};
use chrono::{DateTime, Utc};
use sqlx::{Error, SqlitePool};
use tracing::{debug, instrument};

pub struct ReactionRepository {
    connection_pool: SqlitePool,
}

impl ReactionRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    /// Inserts the triple unless it is already present.
    ///
    /// `Ok(None)` means the same user already reacted with the same emoji; the
    /// UNIQUE constraint makes this hold under concurrent requests too.
    #[instrument(skip(self), fields(message_id = %message_id, user_id = %user_id))]
    pub async fn insert_if_absent(
        &self,
        message_id: i32,
        user_id: i32,
        emoji: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Reaction>, Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO reactions (message_id, user_id, emoji, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (message_id, user_id, emoji) DO NOTHING
            "#,
        )
        .bind(message_id)
        .bind(user_id)
        .bind(emoji)
        .bind(to_millis(&now))
        .execute(&self.connection_pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!("Duplicate reaction");
            return Ok(None);
        }
        Ok(Some(Reaction {
            reaction_id: result.last_insert_rowid() as i32,
            message_id,
            user_id,
            emoji: emoji.to_string(),
            created_at: now,
        }))
    }

    /// Removes the triple, returning whether it existed
    #[instrument(skip(self), fields(message_id = %message_id, user_id = %user_id))]
    pub async fn delete(&self, message_id: i32, user_id: i32, emoji: &str) -> Result<bool, Error> {
        let result =
            sqlx::query("DELETE FROM reactions WHERE message_id = ? AND user_id = ? AND emoji = ?")
                .bind(message_id)
                .bind(user_id)
                .bind(emoji)
                .execute(&self.connection_pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn find_many_by_message_id(&self, message_id: &i32) -> Result<Vec<Reaction>, Error> {
        sqlx::query_as::<_, Reaction>(
            r#"
            SELECT reaction_id, message_id, user_id, emoji, created_at
            FROM reactions
            WHERE message_id = ?
            ORDER BY reaction_id ASC
            "#,
        )
        .bind(message_id)
        .fetch_all(&self.connection_pool)
        .await
    }
}
