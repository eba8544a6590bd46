//! ChatRepository - Chats and their creation transactions
//!
//! Chat creation writes the chat row and its member rows in one transaction, so
//! a chat never exists without its members.

use super::Read;
use crate::entities::{Chat, ChatKind, to_millis};
use chrono::{DateTime, Utc};
use sqlx::{Error, Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, instrument};

const CHAT_COLUMNS: &str = "chat_id, chat_kind, name, description, created_at, updated_at";

/// Creation transactions read before they write, so the write lock is taken
/// at BEGIN and concurrent creators queue on busy_timeout
const BEGIN_WRITE: &str = "BEGIN IMMEDIATE";

/// Result of the personal chat creation transaction
#[derive(Debug)]
pub enum PersonalChatOutcome {
    Created(Chat),
    /// A personal chat for this unordered pair already exists
    AlreadyExists,
    /// One of the two identities is unknown
    UnknownIdentity,
}

/// Result of the group chat creation transaction
#[derive(Debug)]
pub enum GroupChatOutcome {
    Created(Chat),
    UnknownIdentity,
}

// CHAT REPOSITORY
pub struct ChatRepository {
    connection_pool: SqlitePool,
}

impl ChatRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    /// Creates the personal chat between `creator_id` and `target_id`.
    ///
    /// Uniqueness of the unordered pair is enforced by the UNIQUE `personal_key`
    /// column, so two concurrent requests (in either direction) cannot both win.
    #[instrument(skip(self), fields(creator = %creator_id, target = %target_id))]
    pub async fn create_personal(
        &self,
        creator_id: i32,
        target_id: i32,
        now: DateTime<Utc>,
    ) -> Result<PersonalChatOutcome, Error> {
        debug!("Creating personal chat");
        let mut tx = self.connection_pool.begin_with(BEGIN_WRITE).await?;

        if count_users(&mut tx, &[creator_id, target_id]).await? != 2 {
            tx.rollback().await?;
            return Ok(PersonalChatOutcome::UnknownIdentity);
        }

        let now_ms = to_millis(&now);
        let result = sqlx::query(
            r#"
            INSERT INTO chats (chat_kind, name, description, personal_key, created_at, updated_at)
            VALUES (?, NULL, NULL, ?, ?, ?)
            ON CONFLICT (personal_key) DO NOTHING
            "#,
        )
        .bind(ChatKind::Personal.as_str())
        .bind(Chat::personal_key(creator_id, target_id))
        .bind(now_ms)
        .bind(now_ms)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            debug!("Personal chat already exists");
            return Ok(PersonalChatOutcome::AlreadyExists);
        }
        let chat_id = result.last_insert_rowid() as i32;

        // both participants are plain members, personal chats have no admins
        for user_id in [creator_id, target_id] {
            insert_member(&mut tx, chat_id, user_id, false, now_ms).await?;
        }
        tx.commit().await?;

        info!("Personal chat created with id {}", chat_id);
        Ok(PersonalChatOutcome::Created(Chat {
            chat_id,
            kind: ChatKind::Personal,
            name: None,
            description: None,
            created_at: now,
            updated_at: now,
        }))
    }

    /// Creates a group chat. `member_ids` must not contain the creator and must
    /// be free of duplicates; the creator is added as the only admin.
    #[instrument(skip(self, name, description, member_ids), fields(creator = %creator_id, members = member_ids.len()))]
    pub async fn create_group(
        &self,
        creator_id: i32,
        name: Option<&str>,
        description: Option<&str>,
        member_ids: &[i32],
        now: DateTime<Utc>,
    ) -> Result<GroupChatOutcome, Error> {
        debug!("Creating group chat");
        let mut tx = self.connection_pool.begin_with(BEGIN_WRITE).await?;

        let mut everyone = Vec::with_capacity(member_ids.len() + 1);
        everyone.push(creator_id);
        everyone.extend_from_slice(member_ids);
        if count_users(&mut tx, &everyone).await? != everyone.len() as i64 {
            tx.rollback().await?;
            return Ok(GroupChatOutcome::UnknownIdentity);
        }

        let now_ms = to_millis(&now);
        let result = sqlx::query(
            r#"
            INSERT INTO chats (chat_kind, name, description, personal_key, created_at, updated_at)
            VALUES (?, ?, ?, NULL, ?, ?)
            "#,
        )
        .bind(ChatKind::Group.as_str())
        .bind(name)
        .bind(description)
        .bind(now_ms)
        .bind(now_ms)
        .execute(&mut *tx)
        .await?;
        let chat_id = result.last_insert_rowid() as i32;

        insert_member(&mut tx, chat_id, creator_id, true, now_ms).await?;
        for user_id in member_ids {
            insert_member(&mut tx, chat_id, *user_id, false, now_ms).await?;
        }
        tx.commit().await?;

        info!("Group chat created with id {}", chat_id);
        Ok(GroupChatOutcome::Created(Chat {
            chat_id,
            kind: ChatKind::Group,
            name: name.map(str::to_string),
            description: description.map(str::to_string),
            created_at: now,
            updated_at: now,
        }))
    }

    /// All chats the user is a member of, most recent first
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn find_many_by_user_id(&self, user_id: &i32) -> Result<Vec<Chat>, Error> {
        debug!("Listing chats for user");
        sqlx::query_as::<_, Chat>(
            r#"
            SELECT c.chat_id, c.chat_kind, c.name, c.description, c.created_at, c.updated_at
            FROM chats c
            INNER JOIN chat_members m ON m.chat_id = c.chat_id
            WHERE m.user_id = ?
            ORDER BY c.chat_id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.connection_pool)
        .await
    }
}

impl Read<Chat, i32> for ChatRepository {
    #[instrument(skip(self), fields(chat_id = %id))]
    async fn read(&self, id: &i32) -> Result<Option<Chat>, Error> {
        debug!("Reading chat by id");
        sqlx::query_as::<_, Chat>(&format!(
            "SELECT {} FROM chats WHERE chat_id = ?",
            CHAT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}

async fn count_users(tx: &mut Transaction<'_, Sqlite>, user_ids: &[i32]) -> Result<i64, Error> {
    let mut query_builder =
        sqlx::QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM users WHERE user_id IN (");
    let mut separated = query_builder.separated(", ");
    for id in user_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
    query_builder
        .build_query_scalar::<i64>()
        .fetch_one(&mut **tx)
        .await
}

async fn insert_member(
    tx: &mut Transaction<'_, Sqlite>,
    chat_id: i32,
    user_id: i32,
    is_admin: bool,
    joined_at: i64,
) -> Result<(), Error> {
    sqlx::query("INSERT INTO chat_members (chat_id, user_id, is_admin, joined_at) VALUES (?, ?, ?, ?)")
        .bind(chat_id)
        .bind(user_id)
        .bind(is_admin)
        .bind(joined_at)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
