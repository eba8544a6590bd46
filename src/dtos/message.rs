//! Message DTOs - Data Transfer Objects for messages

use crate::entities::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Message descriptor as seen by clients. Deleted messages are never
/// converted into this shape.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MessageDTO {
    pub message_id: i32,
    pub chat_id: i32,
    pub sender_id: i32,
    pub content: String,
    pub reply_to_id: Option<i32>,
    pub forwarded_from_chat_id: Option<i32>,
    pub forwarded_from_message_id: Option<i32>,
    pub is_edited: bool,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl From<Message> for MessageDTO {
    fn from(value: Message) -> Self {
        Self {
            message_id: value.message_id,
            chat_id: value.chat_id,
            sender_id: value.sender_id,
            content: value.content,
            reply_to_id: value.reply_to_id,
            forwarded_from_chat_id: value.forwarded_from_chat_id,
            forwarded_from_message_id: value.forwarded_from_message_id,
            is_edited: value.is_edited,
            is_pinned: value.is_pinned,
            created_at: value.created_at,
            updated_at: value.updated_at,
            read_at: value.read_at,
        }
    }
}

/// Input for a new message (no message_id yet); built by the
/// service layer, never deserialized from clients
#[derive(Debug, Clone)]
pub struct CreateMessageDTO {
    pub chat_id: i32,
    pub sender_id: i32,
    pub content: String,
    pub reply_to_id: Option<i32>,
    pub forwarded_from_chat_id: Option<i32>,
    pub forwarded_from_message_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct SendMessageDTO {
    #[validate(length(min = 1, max = 5000, message = "Message content must be between 1 and 5000 characters"))]
    pub content: String,

    #[serde(default)]
    pub reply_to: Option<i32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct EditMessageDTO {
    #[validate(length(min = 1, max = 5000, message = "Message content must be between 1 and 5000 characters"))]
    pub content: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ForwardMessageDTO {
    pub message_id: i32,
    pub target_chat_id: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct DeleteSelectedDTO {
    #[validate(length(min = 1, message = "No message ids given"))]
    pub message_ids: Vec<i32>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DeleteByDateDTO {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Outcome of the bulk deletions
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DeletedMessagesDTO {
    pub deleted_count: usize,
    pub message_ids: Vec<i32>,
}

impl From<Vec<i32>> for DeletedMessagesDTO {
    fn from(message_ids: Vec<i32>) -> Self {
        Self {
            deleted_count: message_ids.len(),
            message_ids,
        }
    }
}
