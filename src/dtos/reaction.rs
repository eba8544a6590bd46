//! Reaction DTOs

use crate::entities::Reaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ReactionDTO {
    pub reaction_id: i32,
    pub message_id: i32,
    pub user_id: i32,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

impl From<Reaction> for ReactionDTO {
    fn from(value: Reaction) -> Self {
        Self {
            reaction_id: value.reaction_id,
            message_id: value.message_id,
            user_id: value.user_id,
            emoji: value.emoji,
            created_at: value.created_at,
        }
    }
}

/// Body of both `POST` and `DELETE /messages/{id}/reactions`
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct ReactionRequestDTO {
    #[validate(length(min = 1, message = "Emoji is required"))]
    pub emoji: String,
}
