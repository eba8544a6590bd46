//! Chat entity - Aggregate root for members, messages and block entries

use super::enums::ChatKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Chat {
    pub chat_id: i32,
    pub kind: ChatKind,
    pub name: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    pub fn is_personal(&self) -> bool {
        self.kind == ChatKind::Personal
    }

    /// Symmetric key that makes (a, b) and (b, a) collide on the UNIQUE index
    pub fn personal_key(a: i32, b: i32) -> String {
        format!("{}:{}", a.min(b), a.max(b))
    }
}

impl<'r> FromRow<'r, SqliteRow> for Chat {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let kind: String = row.try_get("chat_kind")?;
        Ok(Self {
            chat_id: row.try_get("chat_id")?,
            kind: kind.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            created_at: super::timestamp_column(row, "created_at")?,
            updated_at: super::timestamp_column(row, "updated_at")?,
        })
    }
}
