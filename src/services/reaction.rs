//! Reaction services - Reactions and pins, the per-message overlays

use crate::core::{AppError, AppState, check_capability};
use crate::dtos::WsEvent;
use crate::entities::{Message, Reaction};
use crate::repositories::Read;
use crate::services::message::visible_message;
use tracing::{info, instrument, warn};

/// Emoji length limit, counted in UTF-16 code units
pub const MAX_EMOJI_UNITS: usize = 10;

fn validate_emoji(emoji: &str) -> Result<(), AppError> {
    if emoji.trim().is_empty() {
        return Err(AppError::invalid_input("Emoji is required"));
    }
    if emoji.encode_utf16().count() > MAX_EMOJI_UNITS {
        return Err(AppError::invalid_input("Emoji is too long"));
    }
    Ok(())
}

/// Adds a reaction. Reacting twice with the same emoji is a Conflict.
#[instrument(skip(state))]
pub async fn add_reaction(
    state: &AppState,
    message_id: i32,
    user_id: i32,
    emoji: &str,
) -> Result<Reaction, AppError> {
    validate_emoji(emoji)?;
    let message = visible_message(state, message_id).await?;
    check_capability(state, message.chat_id, user_id)
        .await?
        .require_member()?;

    let reaction = state
        .reaction
        .insert_if_absent(message_id, user_id, emoji, state.now())
        .await?
        .ok_or_else(|| AppError::conflict("You already reacted with this emoji"))?;

    state.presence.publish_to_room(WsEvent::ReactionAdded {
        chat_id: message.chat_id,
        message_id,
        user_id,
        emoji: reaction.emoji.clone(),
        timestamp: reaction.created_at,
    });
    info!("Reaction added");
    Ok(reaction)
}

#[instrument(skip(state))]
pub async fn remove_reaction(
    state: &AppState,
    message_id: i32,
    user_id: i32,
    emoji: &str,
) -> Result<(), AppError> {
    validate_emoji(emoji)?;
    let message = visible_message(state, message_id).await?;
    check_capability(state, message.chat_id, user_id)
        .await?
        .require_member()?;

    if !state.reaction.delete(message_id, user_id, emoji).await? {
        return Err(AppError::not_found("Reaction not found"));
    }

    state.presence.publish_to_room(WsEvent::ReactionRemoved {
        chat_id: message.chat_id,
        message_id,
        user_id,
        emoji: emoji.to_string(),
        timestamp: state.now(),
    });
    info!("Reaction removed");
    Ok(())
}

#[instrument(skip(state))]
pub async fn list_reactions(
    state: &AppState,
    message_id: i32,
    user_id: i32,
) -> Result<Vec<Reaction>, AppError> {
    let message = visible_message(state, message_id).await?;
    check_capability(state, message.chat_id, user_id)
        .await?
        .require_member()?;
    Ok(state.reaction.find_many_by_message_id(&message_id).await?)
}

/// Pins or unpins a message; chat admins only, never on a deleted message
#[instrument(skip(state))]
pub async fn set_pinned(
    state: &AppState,
    message_id: i32,
    actor_id: i32,
    pinned: bool,
) -> Result<Message, AppError> {
    let message = state
        .msg
        .read(&message_id)
        .await?
        .ok_or_else(|| AppError::not_found("Message not found"))?;
    check_capability(state, message.chat_id, actor_id)
        .await?
        .require_admin()?;

    let now = state.now();
    if message.is_deleted || state.msg.set_pinned(message_id, pinned, &now).await? == 0 {
        warn!("Pin change on a deleted message");
        return Err(AppError::invalid_operation(
            "Deleted messages cannot be pinned or unpinned",
        ));
    }

    let event = if pinned {
        WsEvent::MessagePinned {
            chat_id: message.chat_id,
            message_id,
            user_id: actor_id,
            timestamp: now,
        }
    } else {
        WsEvent::MessageUnpinned {
            chat_id: message.chat_id,
            message_id,
            user_id: actor_id,
            timestamp: now,
        }
    };
    state.presence.publish_to_room(event);
    info!(pinned, "Pin state changed");
    visible_message(state, message_id).await
}

pub async fn pin_message(state: &AppState, message_id: i32, actor_id: i32) -> Result<Message, AppError> {
    set_pinned(state, message_id, actor_id, true).await
}

pub async fn unpin_message(state: &AppState, message_id: i32, actor_id: i32) -> Result<Message, AppError> {
    set_pinned(state, message_id, actor_id, false).await
}

/// Pinned messages of a chat that are still visible
#[instrument(skip(state))]
pub async fn list_pinned(state: &AppState, chat_id: i32, user_id: i32) -> Result<Vec<Message>, AppError> {
    check_capability(state, chat_id, user_id)
        .await?
        .require_member()?;
    Ok(state.msg.find_pinned(&chat_id).await?)
}
