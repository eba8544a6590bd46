//! ChatMember entity - Roster row with the binary admin flag

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChatMember {
    pub chat_id: i32,
    pub user_id: i32,
    pub is_admin: bool,
    pub joined_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for ChatMember {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            chat_id: row.try_get("chat_id")?,
            user_id: row.try_get("user_id")?,
            is_admin: row.try_get("is_admin")?,
            joined_at: super::timestamp_column(row, "joined_at")?,
        })
    }
}
