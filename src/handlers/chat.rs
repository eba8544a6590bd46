//! Chat handlers - Chats, rosters and blocks

use crate::core::{ApiJson, AppError, AppState};
use crate::dtos::{
    BlockEntryDTO, BlockUserDTO, ChatDTO, ChatDetailsDTO, CreateGroupChatDTO,
    CreatePersonalChatDTO, MemberDTO,
};
use crate::entities::User;
use crate::services::chat as chat_service;
use axum::{
    Extension,
    extract::{Json, Path, State},
    http::StatusCode,
};
use axum_macros::debug_handler;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_chats(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<Vec<ChatDTO>>, AppError> {
    let chats = chat_service::list_chats(&state, current_user.user_id).await?;
    Ok(Json(chats.into_iter().map(ChatDTO::from).collect()))
}

#[debug_handler]
#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn create_personal_chat(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>, // set by authentication
    ApiJson(body): ApiJson<CreatePersonalChatDTO>,
) -> Result<(StatusCode, Json<ChatDTO>), AppError> {
    let chat =
        chat_service::create_personal_chat(&state, current_user.user_id, body.target_user_id)
            .await?;
    Ok((StatusCode::CREATED, Json(ChatDTO::from(chat))))
}

#[debug_handler]
#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn create_group_chat(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    ApiJson(body): ApiJson<CreateGroupChatDTO>,
) -> Result<(StatusCode, Json<ChatDTO>), AppError> {
    body.validate()?;
    let chat = chat_service::create_group_chat(
        &state,
        current_user.user_id,
        body.name,
        body.description,
        body.member_ids,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(ChatDTO::from(chat))))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn get_chat(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(chat_id): Path<i32>,
) -> Result<Json<ChatDetailsDTO>, AppError> {
    let (chat, members) = chat_service::get_chat(&state, chat_id, current_user.user_id).await?;
    Ok(Json(ChatDetailsDTO {
        chat: ChatDTO::from(chat),
        members: members.into_iter().map(MemberDTO::from).collect(),
    }))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_members(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(chat_id): Path<i32>,
) -> Result<Json<Vec<MemberDTO>>, AppError> {
    let members = chat_service::list_members(&state, chat_id, current_user.user_id).await?;
    Ok(Json(members.into_iter().map(MemberDTO::from).collect()))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn block_user(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(chat_id): Path<i32>,
    ApiJson(body): ApiJson<BlockUserDTO>,
) -> Result<Json<Value>, AppError> {
    let created =
        chat_service::block_user(&state, chat_id, body.target_user_id, current_user.user_id)
            .await?;
    Ok(Json(json!({
        "chat_id": chat_id,
        "user_id": body.target_user_id,
        "blocked": true,
        "already_blocked": !created,
    })))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn unblock_user(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path((chat_id, target_id)): Path<(i32, i32)>,
) -> Result<StatusCode, AppError> {
    chat_service::unblock_user(&state, chat_id, target_id, current_user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_blocked(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(chat_id): Path<i32>,
) -> Result<Json<Vec<BlockEntryDTO>>, AppError> {
    let entries = chat_service::list_blocked(&state, chat_id, current_user.user_id).await?;
    Ok(Json(entries.into_iter().map(BlockEntryDTO::from).collect()))
}
