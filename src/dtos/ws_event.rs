//! WebSocket Event DTOs - Data Transfer Objects for WebSocket events
//!
//! Server frames serialize as `{ "type": "new_message", "data": { ... } }`.
//! Client frames are flat: `{ "type": "join_chat", "chat_id": 4 }`.

use crate::core::error::ErrorKind;
use crate::dtos::MessageDTO;
use crate::entities::UserStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tagged union of WebSocket events. Purely notificational: receiving one
/// grants nothing.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum WsEvent {
    NewMessage {
        chat_id: i32,
        message: MessageDTO,
        timestamp: DateTime<Utc>,
    },
    MessageEdited {
        chat_id: i32,
        message: MessageDTO,
        timestamp: DateTime<Utc>,
    },
    MessageDeleted {
        chat_id: i32,
        message_id: i32,
        timestamp: DateTime<Utc>,
    },
    ReactionAdded {
        chat_id: i32,
        message_id: i32,
        user_id: i32,
        emoji: String,
        timestamp: DateTime<Utc>,
    },
    ReactionRemoved {
        chat_id: i32,
        message_id: i32,
        user_id: i32,
        emoji: String,
        timestamp: DateTime<Utc>,
    },
    MessagePinned {
        chat_id: i32,
        message_id: i32,
        user_id: i32,
        timestamp: DateTime<Utc>,
    },
    MessageUnpinned {
        chat_id: i32,
        message_id: i32,
        user_id: i32,
        timestamp: DateTime<Utc>,
    },
    /// Emitted in the target chat; `message` is the new copy
    MessageForwarded {
        chat_id: i32,
        source_chat_id: i32,
        source_message_id: i32,
        message: MessageDTO,
        timestamp: DateTime<Utc>,
    },
    UserTyping {
        chat_id: i32,
        user_id: i32,
        timestamp: DateTime<Utc>,
    },
    UserStatus {
        user_id: i32,
        status: UserStatus,
        timestamp: DateTime<Utc>,
    },
    RoomJoined {
        chat_id: i32,
        timestamp: DateTime<Utc>,
    },
    RoomLeft {
        chat_id: i32,
        timestamp: DateTime<Utc>,
    },
    Error {
        code: ErrorKind,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl WsEvent {
    /// Chat whose room this event is published to, if any
    pub fn chat_id(&self) -> Option<i32> {
        match self {
            WsEvent::NewMessage { chat_id, .. }
            | WsEvent::MessageEdited { chat_id, .. }
            | WsEvent::MessageDeleted { chat_id, .. }
            | WsEvent::ReactionAdded { chat_id, .. }
            | WsEvent::ReactionRemoved { chat_id, .. }
            | WsEvent::MessagePinned { chat_id, .. }
            | WsEvent::MessageUnpinned { chat_id, .. }
            | WsEvent::MessageForwarded { chat_id, .. }
            | WsEvent::UserTyping { chat_id, .. }
            | WsEvent::RoomJoined { chat_id, .. }
            | WsEvent::RoomLeft { chat_id, .. } => Some(*chat_id),
            WsEvent::UserStatus { .. } | WsEvent::Error { .. } => None,
        }
    }
}

/// Frames a client may send on the live channel
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    JoinChat { chat_id: i32 },
    LeaveChat { chat_id: i32 },
    Typing { chat_id: i32 },
}
