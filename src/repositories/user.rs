//! UserRepository - Identities known to the chat core

use super::Read;
use crate::entities::User;
use sqlx::{Error, SqlitePool};
use tracing::instrument;

pub struct UserRepository {
    connection_pool: SqlitePool,
}

impl UserRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }
}

impl Read<User, i32> for UserRepository {
    #[instrument(skip(self), fields(user_id = %id))]
    async fn read(&self, id: &i32) -> Result<Option<User>, Error> {
        sqlx::query_as::<_, User>("SELECT user_id, username FROM users WHERE user_id = ?")
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}
