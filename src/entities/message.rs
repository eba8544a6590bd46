//! Message entity - Chat message with lifecycle flags
//!
//! Lifecycle: Active -> Edited (self-loop) -> Deleted (terminal).
//! Pinned is an orthogonal flag, meaningless once the message is deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Message {
    pub message_id: i32,
    pub chat_id: i32,
    pub sender_id: i32,
    // opaque payload, never interpreted by the server
    pub content: String,
    pub reply_to_id: Option<i32>,
    pub forwarded_from_chat_id: Option<i32>,
    pub forwarded_from_message_id: Option<i32>,
    pub is_edited: bool,
    pub is_deleted: bool,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, SqliteRow> for Message {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            message_id: row.try_get("message_id")?,
            chat_id: row.try_get("chat_id")?,
            sender_id: row.try_get("sender_id")?,
            content: row.try_get("content")?,
            reply_to_id: row.try_get("reply_to_id")?,
            forwarded_from_chat_id: row.try_get("forwarded_from_chat_id")?,
            forwarded_from_message_id: row.try_get("forwarded_from_message_id")?,
            is_edited: row.try_get("is_edited")?,
            is_deleted: row.try_get("is_deleted")?,
            is_pinned: row.try_get("is_pinned")?,
            created_at: super::timestamp_column(row, "created_at")?,
            updated_at: super::timestamp_column(row, "updated_at")?,
            read_at: super::optional_timestamp_column(row, "read_at")?,
        })
    }
}
