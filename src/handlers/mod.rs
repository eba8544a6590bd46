//! Handlers module - Endpoint HTTP
//!
//! Thin handlers: they extract user, path and body, validate the DTO and
//! delegate to `services`. No domain rule lives here.

pub mod chat;
pub mod message;
pub mod reaction;

pub use chat::{
    block_user, create_group_chat, create_personal_chat, get_chat, list_blocked, list_chats,
    list_members, unblock_user,
};
pub use message::{
    delete_message, delete_messages_by_date, delete_my_messages, delete_selected_messages,
    edit_message, forward_message, get_message, list_messages, mark_read, send_message,
};
pub use reaction::{
    add_reaction, list_pinned, list_reactions, pin_message, remove_reaction, unpin_message,
};

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

/// Root endpoint - health check
pub async fn root(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, "Server is running!")
}
