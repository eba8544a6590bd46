//! Entities module - Domain entities persisted in the store
//!
//! Every entity maps one table. Timestamps are stored as INTEGER Unix
//! milliseconds so window and range checks stay integer comparisons in SQL;
//! the `FromRow` impls convert them back to `DateTime<Utc>`.

pub mod block;
pub mod chat;
pub mod enums;
pub mod member;
pub mod message;
pub mod reaction;
pub mod user;

// Re-exports
pub use block::BlockEntry;
pub use chat::Chat;
pub use enums::{ChatKind, UserStatus};
pub use member::ChatMember;
pub use message::Message;
pub use reaction::Reaction;
pub use user::User;

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

/// Converts a stored millisecond timestamp into a `DateTime<Utc>`
pub fn from_millis(millis: i64) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| sqlx::Error::Decode(
        format!("timestamp out of range: {}", millis).into(),
    ))
}

/// Converts a `DateTime<Utc>` into the stored millisecond representation
pub fn to_millis(instant: &DateTime<Utc>) -> i64 {
    instant.timestamp_millis()
}

pub(crate) fn timestamp_column(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    from_millis(row.try_get::<i64, _>(column)?)
}

pub(crate) fn optional_timestamp_column(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    row.try_get::<Option<i64>, _>(column)?
        .map(from_millis)
        .transpose()
}
