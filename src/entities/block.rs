//! BlockEntry entity - Gate on message creation inside a personal chat

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BlockEntry {
    pub chat_id: i32,
    pub blocked_id: i32,
    pub blocked_by: i32,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for BlockEntry {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            chat_id: row.try_get("chat_id")?,
            blocked_id: row.try_get("blocked_id")?,
            blocked_by: row.try_get("blocked_by")?,
            created_at: super::timestamp_column(row, "created_at")?,
        })
    }
}
