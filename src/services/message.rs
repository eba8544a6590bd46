//! Message services - Message store operations
//!
//! State machine: Active -> Edited (self-loop) -> Deleted (terminal). Every
//! mutation is one conditional write; when it touches no row the reason is
//! classified afterwards from the current state of the row.

use crate::core::{AppError, AppState, check_capability};
use crate::dtos::{CreateMessageDTO, MessageDTO, WsEvent};
use crate::entities::Message;
use crate::repositories::Read;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

pub const MAX_CONTENT_CHARS: usize = 5000;

fn validate_content(content: &str) -> Result<(), AppError> {
    if content.trim().is_empty() {
        return Err(AppError::invalid_input("Message content cannot be empty"));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(AppError::invalid_input(
            "Message content must be at most 5000 characters",
        ));
    }
    Ok(())
}

/// Loads a message that is not soft-deleted. Deleted and missing messages are
/// indistinguishable to callers.
pub(crate) async fn visible_message(state: &AppState, message_id: i32) -> Result<Message, AppError> {
    state
        .msg
        .read(&message_id)
        .await?
        .filter(|m| !m.is_deleted)
        .ok_or_else(|| AppError::not_found("Message not found"))
}

fn page_bounds(state: &AppState, limit: Option<u32>, offset: Option<u32>) -> Result<(i64, i64), AppError> {
    let limit = limit.unwrap_or(state.policy.default_page_size);
    if limit == 0 || limit > state.policy.max_page_size {
        return Err(AppError::invalid_input("limit is out of range")
            .with_details(format!("must be between 1 and {}", state.policy.max_page_size)));
    }
    Ok((limit as i64, offset.unwrap_or(0) as i64))
}

#[instrument(skip(state, content), fields(chat_id = %chat_id, author_id = %author_id))]
pub async fn send_message(
    state: &AppState,
    chat_id: i32,
    author_id: i32,
    content: String,
    reply_to: Option<i32>,
) -> Result<Message, AppError> {
    validate_content(&content)?;
    check_capability(state, chat_id, author_id)
        .await?
        .require_can_send()?;

    if let Some(reply_id) = reply_to {
        let target = state.msg.read(&reply_id).await?;
        if !target.is_some_and(|m| m.chat_id == chat_id && !m.is_deleted) {
            warn!(reply_id, "Reply target not in this chat");
            return Err(AppError::invalid_input(
                "Reply target must be a message of the same chat",
            ));
        }
    }

    let data = CreateMessageDTO {
        chat_id,
        sender_id: author_id,
        content,
        reply_to_id: reply_to,
        forwarded_from_chat_id: None,
        forwarded_from_message_id: None,
        created_at: state.now(),
    };
    let message = state
        .msg
        .create_if_permitted(&data, state.policy.block_policy)
        .await?
        // membership or block changed since the capability check
        .ok_or_else(|| AppError::forbidden("You cannot send messages in this chat"))?;

    state.presence.publish_to_room(WsEvent::NewMessage {
        chat_id,
        message: MessageDTO::from(message.clone()),
        timestamp: message.created_at,
    });
    info!(message_id = message.message_id, "Message sent");
    Ok(message)
}

#[instrument(skip(state))]
pub async fn get_message(state: &AppState, message_id: i32, user_id: i32) -> Result<Message, AppError> {
    let message = visible_message(state, message_id).await?;
    check_capability(state, message.chat_id, user_id)
        .await?
        .require_member()?;
    Ok(message)
}

/// Page of visible messages in creation order
#[instrument(skip(state))]
pub async fn list_messages(
    state: &AppState,
    chat_id: i32,
    user_id: i32,
    limit: Option<u32>,
    offset: Option<u32>,
) -> Result<Vec<Message>, AppError> {
    let (limit, offset) = page_bounds(state, limit, offset)?;
    check_capability(state, chat_id, user_id)
        .await?
        .require_member()?;
    let messages = state.msg.find_many_paginated(&chat_id, limit, offset).await?;
    debug!("Returning {} messages", messages.len());
    Ok(messages)
}

/// Replaces the content of a message.
///
/// The author, visibility and window conditions are checked by the UPDATE
/// itself; `now - created_at == edit_window` still succeeds.
#[instrument(skip(state, content))]
pub async fn edit_message(
    state: &AppState,
    message_id: i32,
    actor_id: i32,
    content: String,
) -> Result<Message, AppError> {
    validate_content(&content)?;
    let message = visible_message(state, message_id).await?;
    check_capability(state, message.chat_id, actor_id)
        .await?
        .require_member()?;

    let now = state.now();
    let edited_after = now - state.policy.edit_window;
    let updated = state
        .msg
        .update_content_within_window(message_id, actor_id, &content, &now, &edited_after)
        .await?;

    if updated == 0 {
        return Err(classify_failed_edit(state, message_id, actor_id).await);
    }

    let message = visible_message(state, message_id).await?;
    state.presence.publish_to_room(WsEvent::MessageEdited {
        chat_id: message.chat_id,
        message: MessageDTO::from(message.clone()),
        timestamp: now,
    });
    info!("Message edited");
    Ok(message)
}

async fn classify_failed_edit(state: &AppState, message_id: i32, actor_id: i32) -> AppError {
    match state.msg.read(&message_id).await {
        Ok(Some(m)) if m.is_deleted => AppError::not_found("Message not found"),
        Ok(Some(m)) if m.sender_id != actor_id => {
            warn!("Edit attempted by someone other than the author");
            AppError::forbidden("Only the author can edit this message")
        }
        Ok(Some(_)) => {
            warn!("Edit window expired");
            AppError::edit_window_expired("The edit window for this message has expired")
        }
        Ok(None) => AppError::not_found("Message not found"),
        Err(e) => e.into(),
    }
}

/// Soft-deletes one message. Allowed to its author and to chat admins.
#[instrument(skip(state))]
pub async fn delete_message(state: &AppState, message_id: i32, actor_id: i32) -> Result<(), AppError> {
    let message = visible_message(state, message_id).await?;
    let capability = check_capability(state, message.chat_id, actor_id)
        .await?
        .require_member()?;
    if message.sender_id != actor_id && !capability.is_admin() {
        warn!("Delete attempted by non-author non-admin");
        return Err(AppError::forbidden("You cannot delete this message"));
    }

    let now = state.now();
    if state.msg.soft_delete(message_id, &now).await? == 0 {
        // lost the race against another delete
        return Err(AppError::not_found("Message not found"));
    }

    state.presence.publish_to_room(WsEvent::MessageDeleted {
        chat_id: message.chat_id,
        message_id,
        timestamp: now,
    });
    info!("Message deleted");
    Ok(())
}

fn publish_deleted(state: &AppState, chat_id: i32, message_ids: &[i32], timestamp: DateTime<Utc>) {
    for message_id in message_ids {
        state.presence.publish_to_room(WsEvent::MessageDeleted {
            chat_id,
            message_id: *message_id,
            timestamp,
        });
    }
}

/// Self-service purge of the actor's own messages in a chat
#[instrument(skip(state))]
pub async fn delete_all_by_author(
    state: &AppState,
    chat_id: i32,
    actor_id: i32,
) -> Result<Vec<i32>, AppError> {
    check_capability(state, chat_id, actor_id)
        .await?
        .require_member()?;
    let now = state.now();
    let deleted = state.msg.soft_delete_by_sender(chat_id, actor_id, &now).await?;
    publish_deleted(state, chat_id, &deleted, now);
    info!(count = deleted.len(), "Author messages deleted");
    Ok(deleted)
}

/// Admin deletion of arbitrary messages of a chat
#[instrument(skip(state, message_ids))]
pub async fn delete_by_ids(
    state: &AppState,
    chat_id: i32,
    actor_id: i32,
    message_ids: &[i32],
) -> Result<Vec<i32>, AppError> {
    if message_ids.is_empty() {
        return Err(AppError::invalid_input("No message ids given"));
    }
    check_capability(state, chat_id, actor_id)
        .await?
        .require_admin()?;
    let now = state.now();
    let deleted = state.msg.soft_delete_many(chat_id, message_ids, &now).await?;
    publish_deleted(state, chat_id, &deleted, now);
    info!(count = deleted.len(), "Selected messages deleted");
    Ok(deleted)
}

/// Admin deletion of every message created in `[start, end]`
#[instrument(skip(state))]
pub async fn delete_by_date_range(
    state: &AppState,
    chat_id: i32,
    actor_id: i32,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<i32>, AppError> {
    if start > end {
        return Err(AppError::invalid_input("start must not be after end"));
    }
    check_capability(state, chat_id, actor_id)
        .await?
        .require_admin()?;
    let now = state.now();
    let deleted = state
        .msg
        .soft_delete_by_date_range(chat_id, &start, &end, &now)
        .await?;
    publish_deleted(state, chat_id, &deleted, now);
    info!(count = deleted.len(), "Messages in range deleted");
    Ok(deleted)
}

/// Stamps the read time. Repeated calls and calls by the author are no-ops.
#[instrument(skip(state))]
pub async fn mark_read(state: &AppState, message_id: i32, reader_id: i32) -> Result<Message, AppError> {
    let message = visible_message(state, message_id).await?;
    check_capability(state, message.chat_id, reader_id)
        .await?
        .require_member()?;
    let updated = state.msg.mark_read(message_id, reader_id, &state.now()).await?;
    debug!(updated, "Read receipt processed");
    visible_message(state, message_id).await
}

/// Copies a message of `source_chat_id` into `target_chat_id` with provenance
#[instrument(skip(state))]
pub async fn forward_message(
    state: &AppState,
    message_id: i32,
    source_chat_id: i32,
    target_chat_id: i32,
    actor_id: i32,
) -> Result<Message, AppError> {
    check_capability(state, source_chat_id, actor_id)
        .await?
        .require_member()?;
    let original = visible_message(state, message_id).await?;
    if original.chat_id != source_chat_id {
        return Err(AppError::not_found("Message not found"));
    }
    check_capability(state, target_chat_id, actor_id)
        .await?
        .require_can_send()?;

    let data = CreateMessageDTO {
        chat_id: target_chat_id,
        sender_id: actor_id,
        content: original.content,
        reply_to_id: None,
        forwarded_from_chat_id: Some(source_chat_id),
        forwarded_from_message_id: Some(message_id),
        created_at: state.now(),
    };
    let message = state
        .msg
        .create_if_permitted(&data, state.policy.block_policy)
        .await?
        .ok_or_else(|| AppError::forbidden("You cannot send messages in this chat"))?;

    state.presence.publish_to_room(WsEvent::MessageForwarded {
        chat_id: target_chat_id,
        source_chat_id,
        source_message_id: message_id,
        message: MessageDTO::from(message.clone()),
        timestamp: message.created_at,
    });
    info!(new_message_id = message.message_id, "Message forwarded");
    Ok(message)
}
