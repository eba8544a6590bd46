//! Reaction entity - One (message, identity, emoji) triple

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Reaction {
    pub reaction_id: i32,
    pub message_id: i32,
    pub user_id: i32,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for Reaction {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            reaction_id: row.try_get("reaction_id")?,
            message_id: row.try_get("message_id")?,
            user_id: row.try_get("user_id")?,
            emoji: row.try_get("emoji")?,
            created_at: super::timestamp_column(row, "created_at")?,
        })
    }
}
