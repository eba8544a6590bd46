//! Chat DTOs - Data Transfer Objects for chats, members and blocks

use crate::entities::{BlockEntry, Chat, ChatKind, ChatMember};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChatDTO {
    pub chat_id: i32,
    pub kind: ChatKind,
    pub name: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Chat> for ChatDTO {
    fn from(value: Chat) -> Self {
        Self {
            chat_id: value.chat_id,
            kind: value.kind,
            name: value.name,
            description: value.description,
            created_at: value.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MemberDTO {
    pub user_id: i32,
    pub is_admin: bool,
    pub joined_at: DateTime<Utc>,
}

impl From<ChatMember> for MemberDTO {
    fn from(value: ChatMember) -> Self {
        Self {
            user_id: value.user_id,
            is_admin: value.is_admin,
            joined_at: value.joined_at,
        }
    }
}

/// Chat descriptor plus roster, returned by `GET /chats/{id}`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChatDetailsDTO {
    #[serde(flatten)]
    pub chat: ChatDTO,
    pub members: Vec<MemberDTO>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreatePersonalChatDTO {
    pub target_user_id: i32,
}

/// Group chat creation request; the creator is implicit
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateGroupChatDTO {
    #[validate(length(max = 100, message = "Group name must be at most 100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    #[validate(length(min = 1, message = "A group needs at least one other member"))]
    pub member_ids: Vec<i32>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BlockUserDTO {
    pub target_user_id: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BlockEntryDTO {
    pub user_id: i32,
    pub blocked_by: i32,
    pub created_at: DateTime<Utc>,
}

impl From<BlockEntry> for BlockEntryDTO {
    fn from(value: BlockEntry) -> Self {
        Self {
            user_id: value.blocked_id,
            blocked_by: value.blocked_by,
            created_at: value.created_at,
        }
    }
}
