//! MemberRepository - Chat membership rows

use super::Read;
use crate::entities::ChatMember;
use sqlx::{Error, SqlitePool};
use tracing::instrument;

pub struct MemberRepository {
    connection_pool: SqlitePool,
}

impl MemberRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    #[instrument(skip(self), fields(chat_id = %chat_id))]
    pub async fn find_many_by_chat_id(&self, chat_id: &i32) -> Result<Vec<ChatMember>, Error> {
        sqlx::query_as::<_, ChatMember>(
            r#"
            SELECT chat_id, user_id, is_admin, joined_at
            FROM chat_members
            WHERE chat_id = ?
            ORDER BY joined_at ASC, user_id ASC
            "#,
        )
        .bind(chat_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Distinct identities sharing at least one chat with `user_id`, excluding it
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn find_co_member_ids(&self, user_id: &i32) -> Result<Vec<i32>, Error> {
        sqlx::query_scalar::<_, i32>(
            r#"
            SELECT DISTINCT other.user_id
            FROM chat_members mine
            INNER JOIN chat_members other ON other.chat_id = mine.chat_id
            WHERE mine.user_id = ? AND other.user_id != mine.user_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.connection_pool)
        .await
    }
}

/// Lookup by composite key `(chat_id, user_id)`
impl Read<ChatMember, (i32, i32)> for MemberRepository {
    #[instrument(skip(self), fields(chat_id = %id.0, user_id = %id.1))]
    async fn read(&self, id: &(i32, i32)) -> Result<Option<ChatMember>, Error> {
        let (chat_id, user_id) = id;
        sqlx::query_as::<_, ChatMember>(
            r#"
            SELECT chat_id, user_id, is_admin, joined_at
            FROM chat_members
            WHERE chat_id = ? AND user_id = ?
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}
