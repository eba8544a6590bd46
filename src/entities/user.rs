//! User entity - Identity mirrored from the external auth collaborator

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct User {
    pub user_id: i32,
    pub username: String,
}
