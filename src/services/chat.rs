//! Chat services - Membership & access ledger
//!
//! Chat creation, rosters and the block list of personal chats.

use crate::core::{AppError, AppState, check_capability};
use crate::entities::{BlockEntry, Chat, ChatMember};
use crate::repositories::{GroupChatOutcome, PersonalChatOutcome, Read};
use tracing::{debug, info, instrument, warn};

#[instrument(skip(state))]
pub async fn list_chats(state: &AppState, user_id: i32) -> Result<Vec<Chat>, AppError> {
    debug!("Listing chats for user");
    let chats = state.chat.find_many_by_user_id(&user_id).await?;
    info!("Successfully retrieved {} chats", chats.len());
    Ok(chats)
}

/// Creates the personal chat between `creator_id` and `target_id`
#[instrument(skip(state))]
pub async fn create_personal_chat(
    state: &AppState,
    creator_id: i32,
    target_id: i32,
) -> Result<Chat, AppError> {
    if creator_id == target_id {
        warn!("Personal chat with oneself requested");
        return Err(AppError::invalid_input(
            "A personal chat needs two different users",
        ));
    }

    match state
        .chat
        .create_personal(creator_id, target_id, state.now())
        .await?
    {
        PersonalChatOutcome::Created(chat) => Ok(chat),
        PersonalChatOutcome::AlreadyExists => {
            warn!("Personal chat already exists");
            Err(AppError::conflict("A personal chat between these users already exists"))
        }
        PersonalChatOutcome::UnknownIdentity => Err(AppError::not_found("User not found")),
    }
}

/// Creates a group chat with `creator_id` as its only admin.
///
/// The creator is dropped from `member_ids` if listed and duplicates are
/// ignored; at least one other participant must remain.
#[instrument(skip(state, name, description))]
pub async fn create_group_chat(
    state: &AppState,
    creator_id: i32,
    name: Option<String>,
    description: Option<String>,
    member_ids: Vec<i32>,
) -> Result<Chat, AppError> {
    let mut others: Vec<i32> = member_ids
        .into_iter()
        .filter(|id| *id != creator_id)
        .collect();
    others.sort_unstable();
    others.dedup();

    if others.is_empty() {
        warn!("Group chat requested without other members");
        return Err(AppError::invalid_input(
            "A group chat needs at least one member besides the creator",
        ));
    }

    let name = name.filter(|n| !n.trim().is_empty());
    let description = description.filter(|d| !d.trim().is_empty());

    match state
        .chat
        .create_group(
            creator_id,
            name.as_deref(),
            description.as_deref(),
            &others,
            state.now(),
        )
        .await?
    {
        GroupChatOutcome::Created(chat) => Ok(chat),
        GroupChatOutcome::UnknownIdentity => Err(AppError::not_found("User not found")),
    }
}

/// Chat descriptor and roster, for members only
#[instrument(skip(state))]
pub async fn get_chat(
    state: &AppState,
    chat_id: i32,
    user_id: i32,
) -> Result<(Chat, Vec<ChatMember>), AppError> {
    let capability = check_capability(state, chat_id, user_id)
        .await?
        .require_member()?;
    let members = state.member.find_many_by_chat_id(&chat_id).await?;
    Ok((capability.chat, members))
}

#[instrument(skip(state))]
pub async fn list_members(
    state: &AppState,
    chat_id: i32,
    user_id: i32,
) -> Result<Vec<ChatMember>, AppError> {
    check_capability(state, chat_id, user_id)
        .await?
        .require_member()?;
    Ok(state.member.find_many_by_chat_id(&chat_id).await?)
}

pub async fn is_member(state: &AppState, chat_id: i32, user_id: i32) -> Result<bool, AppError> {
    Ok(check_capability(state, chat_id, user_id).await?.is_member())
}

/// Whether `user_id` is currently gated from sending in `chat_id`
pub async fn is_blocked(state: &AppState, chat_id: i32, user_id: i32) -> Result<bool, AppError> {
    Ok(check_capability(state, chat_id, user_id).await?.blocked)
}

/// Blocks `target_id` in a personal chat.
///
/// Returns `true` if a new entry was written, `false` if the target was
/// already blocked (acknowledged all the same).
#[instrument(skip(state))]
pub async fn block_user(
    state: &AppState,
    chat_id: i32,
    target_id: i32,
    actor_id: i32,
) -> Result<bool, AppError> {
    let capability = check_capability(state, chat_id, actor_id)
        .await?
        .require_member()?;
    if !capability.chat.is_personal() {
        return Err(AppError::invalid_operation(
            "Blocking is only available in personal chats",
        ));
    }
    if target_id == actor_id {
        return Err(AppError::invalid_input("You cannot block yourself"));
    }
    if state.member.read(&(chat_id, target_id)).await?.is_none() {
        return Err(AppError::not_found("User is not part of this chat"));
    }

    let created = state
        .block
        .insert_if_absent(chat_id, target_id, actor_id, &state.now())
        .await?;
    info!(created, "User blocked");
    Ok(created)
}

#[instrument(skip(state))]
pub async fn unblock_user(
    state: &AppState,
    chat_id: i32,
    target_id: i32,
    actor_id: i32,
) -> Result<(), AppError> {
    let capability = check_capability(state, chat_id, actor_id)
        .await?
        .require_member()?;
    if !capability.chat.is_personal() {
        return Err(AppError::invalid_operation(
            "Blocking is only available in personal chats",
        ));
    }
    if state.block.read(&(chat_id, target_id)).await?.is_none() {
        return Err(AppError::not_found("User is not blocked in this chat"));
    }
    if target_id == actor_id {
        warn!("Blocked user tried to lift their own block");
        return Err(AppError::forbidden("You cannot lift a block placed on you"));
    }

    if !state.block.delete(chat_id, target_id).await? {
        return Err(AppError::not_found("User is not blocked in this chat"));
    }
    info!("User unblocked");
    Ok(())
}

#[instrument(skip(state))]
pub async fn list_blocked(
    state: &AppState,
    chat_id: i32,
    user_id: i32,
) -> Result<Vec<BlockEntry>, AppError> {
    check_capability(state, chat_id, user_id)
        .await?
        .require_member()?;
    Ok(state.block.find_many_by_chat_id(&chat_id).await?)
}
