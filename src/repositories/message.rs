//! MessageRepository - Message rows and their lifecycle flags
//!
//! All flag transitions are conditional `UPDATE`s on the current flags; the
//! affected-row count tells the caller whether the transition happened.

use super::Read;
use crate::core::BlockPolicy;
use crate::dtos::CreateMessageDTO;
use crate::entities::{Message, to_millis};
use chrono::{DateTime, Utc};
use sqlx::{Error, Sqlite, SqlitePool};
use tracing::{debug, info, instrument};

const MESSAGE_COLUMNS: &str = "message_id, chat_id, sender_id, content, reply_to_id, \
     forwarded_from_chat_id, forwarded_from_message_id, is_edited, is_deleted, is_pinned, \
     created_at, updated_at, read_at";

// MESSAGE REPO
pub struct MessageRepository {
    connection_pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    /// Inserts the message only if, at write time, the sender is still a member
    /// of the chat and is not gated by a block entry.
    ///
    /// `Ok(None)` means the guard failed and nothing was written.
    #[instrument(skip(self, data), fields(chat_id = %data.chat_id, sender_id = %data.sender_id))]
    pub async fn create_if_permitted(
        &self,
        data: &CreateMessageDTO,
        policy: BlockPolicy,
    ) -> Result<Option<Message>, Error> {
        debug!("Inserting message");
        let now_ms = to_millis(&data.created_at);
        let result = sqlx::query(
            r#"
            INSERT INTO messages (
                chat_id, sender_id, content, reply_to_id,
                forwarded_from_chat_id, forwarded_from_message_id, created_at, updated_at
            )
            SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7
            WHERE EXISTS (SELECT 1 FROM chat_members WHERE chat_id = ?1 AND user_id = ?2)
              AND NOT EXISTS (
                  SELECT 1 FROM blocked_users
                  WHERE chat_id = ?1 AND (blocked_id = ?2 OR (?8 AND blocked_by = ?2))
              )
            "#,
        )
        .bind(data.chat_id)
        .bind(data.sender_id)
        .bind(&data.content)
        .bind(data.reply_to_id)
        .bind(data.forwarded_from_chat_id)
        .bind(data.forwarded_from_message_id)
        .bind(now_ms)
        .bind(policy == BlockPolicy::Symmetric)
        .execute(&self.connection_pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!("Message insert refused by membership/block guard");
            return Ok(None);
        }

        let message_id = result.last_insert_rowid() as i32;
        info!("Message created with id {}", message_id);
        Ok(Some(Message {
            message_id,
            chat_id: data.chat_id,
            sender_id: data.sender_id,
            content: data.content.clone(),
            reply_to_id: data.reply_to_id,
            forwarded_from_chat_id: data.forwarded_from_chat_id,
            forwarded_from_message_id: data.forwarded_from_message_id,
            is_edited: false,
            is_deleted: false,
            is_pinned: false,
            created_at: data.created_at,
            updated_at: data.created_at,
            read_at: None,
        }))
    }

    /// Page of visible messages, oldest first.
    ///
    /// Ordered on `message_id`, which never changes and only grows, so a caller
    /// paging forward while new messages arrive sees no duplicates or gaps.
    #[instrument(skip(self), fields(chat_id = %chat_id))]
    pub async fn find_many_paginated(
        &self,
        chat_id: &i32,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, Error> {
        sqlx::query_as::<_, Message>(&format!(
            r#"
            SELECT {}
            FROM messages
            WHERE chat_id = ? AND is_deleted = 0
            ORDER BY message_id ASC
            LIMIT ? OFFSET ?
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(chat_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Pinned and still visible messages of a chat
    #[instrument(skip(self), fields(chat_id = %chat_id))]
    pub async fn find_pinned(&self, chat_id: &i32) -> Result<Vec<Message>, Error> {
        sqlx::query_as::<_, Message>(&format!(
            r#"
            SELECT {}
            FROM messages
            WHERE chat_id = ? AND is_pinned = 1 AND is_deleted = 0
            ORDER BY message_id ASC
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(chat_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Replaces the content if the message is visible, authored by `sender_id`
    /// and `created_at >= edited_after`. Returns the affected-row count.
    #[instrument(skip(self, content), fields(message_id = %message_id, sender_id = %sender_id))]
    pub async fn update_content_within_window(
        &self,
        message_id: i32,
        sender_id: i32,
        content: &str,
        now: &DateTime<Utc>,
        edited_after: &DateTime<Utc>,
    ) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET content = ?, is_edited = 1, updated_at = ?
            WHERE message_id = ?
              AND sender_id = ?
              AND is_deleted = 0
              AND created_at >= ?
            "#,
        )
        .bind(content)
        .bind(to_millis(now))
        .bind(message_id)
        .bind(sender_id)
        .bind(to_millis(edited_after))
        .execute(&self.connection_pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Active -> Deleted. Zero rows means the message was already deleted.
    #[instrument(skip(self), fields(message_id = %message_id))]
    pub async fn soft_delete(&self, message_id: i32, now: &DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query(
            "UPDATE messages SET is_deleted = 1, updated_at = ? WHERE message_id = ? AND is_deleted = 0",
        )
        .bind(to_millis(now))
        .bind(message_id)
        .execute(&self.connection_pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Deletes every visible message of `sender_id` in the chat, returning the ids
    #[instrument(skip(self), fields(chat_id = %chat_id, sender_id = %sender_id))]
    pub async fn soft_delete_by_sender(
        &self,
        chat_id: i32,
        sender_id: i32,
        now: &DateTime<Utc>,
    ) -> Result<Vec<i32>, Error> {
        sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE messages SET is_deleted = 1, updated_at = ?
            WHERE chat_id = ? AND sender_id = ? AND is_deleted = 0
            RETURNING message_id
            "#,
        )
        .bind(to_millis(now))
        .bind(chat_id)
        .bind(sender_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Deletes the listed messages that belong to the chat and are still
    /// visible. Ids from other chats are ignored.
    #[instrument(skip(self, message_ids), fields(chat_id = %chat_id, count = message_ids.len()))]
    pub async fn soft_delete_many(
        &self,
        chat_id: i32,
        message_ids: &[i32],
        now: &DateTime<Utc>,
    ) -> Result<Vec<i32>, Error> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut query_builder = sqlx::QueryBuilder::<Sqlite>::new("UPDATE messages SET is_deleted = 1, updated_at = ");
        query_builder.push_bind(to_millis(now));
        query_builder.push(" WHERE chat_id = ");
        query_builder.push_bind(chat_id);
        query_builder.push(" AND is_deleted = 0 AND message_id IN (");
        let mut separated = query_builder.separated(", ");
        for id in message_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") RETURNING message_id");

        query_builder
            .build_query_scalar::<i32>()
            .fetch_all(&self.connection_pool)
            .await
    }

    /// Deletes visible messages created in `[start, end]`
    #[instrument(skip(self), fields(chat_id = %chat_id))]
    pub async fn soft_delete_by_date_range(
        &self,
        chat_id: i32,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
        now: &DateTime<Utc>,
    ) -> Result<Vec<i32>, Error> {
        sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE messages SET is_deleted = 1, updated_at = ?
            WHERE chat_id = ? AND is_deleted = 0 AND created_at >= ? AND created_at <= ?
            RETURNING message_id
            "#,
        )
        .bind(to_millis(now))
        .bind(chat_id)
        .bind(to_millis(start))
        .bind(to_millis(end))
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Sets the pin flag on a visible message. Zero rows means the message
    /// is deleted (or gone).
    #[instrument(skip(self), fields(message_id = %message_id, pinned = %pinned))]
    pub async fn set_pinned(
        &self,
        message_id: i32,
        pinned: bool,
        now: &DateTime<Utc>,
    ) -> Result<u64, Error> {
        let result = sqlx::query(
            "UPDATE messages SET is_pinned = ?, updated_at = ? WHERE message_id = ? AND is_deleted = 0",
        )
        .bind(pinned)
        .bind(to_millis(now))
        .bind(message_id)
        .execute(&self.connection_pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Stamps the read time once, and never for the author
    #[instrument(skip(self), fields(message_id = %message_id, reader_id = %reader_id))]
    pub async fn mark_read(
        &self,
        message_id: i32,
        reader_id: i32,
        now: &DateTime<Utc>,
    ) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET read_at = ?
            WHERE message_id = ? AND sender_id != ? AND read_at IS NULL AND is_deleted = 0
            "#,
        )
        .bind(to_millis(now))
        .bind(message_id)
        .bind(reader_id)
        .execute(&self.connection_pool)
        .await?;
        Ok(result.rows_affected())
    }
}

/// Reads the row whatever its state; callers decide what is visible
impl Read<Message, i32> for MessageRepository {
    #[instrument(skip(self), fields(message_id = %id))]
    async fn read(&self, id: &i32) -> Result<Option<Message>, Error> {
        sqlx::query_as::<_, Message>(&format!(
            "SELECT {} FROM messages WHERE message_id = ?",
            MESSAGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}
