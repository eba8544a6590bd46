//! Reaction handlers - Reactions and pinned messages

use crate::core::{ApiJson, AppError, AppState};
use crate::dtos::{MessageDTO, ReactionDTO, ReactionRequestDTO};
use crate::entities::User;
use crate::services::reaction as reaction_service;
use axum::{
    Extension,
    extract::{Json, Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_reactions(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(message_id): Path<i32>,
) -> Result<Json<Vec<ReactionDTO>>, AppError> {
    let reactions =
        reaction_service::list_reactions(&state, message_id, current_user.user_id).await?;
    Ok(Json(reactions.into_iter().map(ReactionDTO::from).collect()))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn add_reaction(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(message_id): Path<i32>,
    ApiJson(body): ApiJson<ReactionRequestDTO>,
) -> Result<(StatusCode, Json<ReactionDTO>), AppError> {
    body.validate()?;
    let reaction =
        reaction_service::add_reaction(&state, message_id, current_user.user_id, &body.emoji)
            .await?;
    Ok((StatusCode::CREATED, Json(ReactionDTO::from(reaction))))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn remove_reaction(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(message_id): Path<i32>,
    ApiJson(body): ApiJson<ReactionRequestDTO>,
) -> Result<StatusCode, AppError> {
    body.validate()?;
    reaction_service::remove_reaction(&state, message_id, current_user.user_id, &body.emoji)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn pin_message(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(message_id): Path<i32>,
) -> Result<Json<MessageDTO>, AppError> {
    let message = reaction_service::pin_message(&state, message_id, current_user.user_id).await?;
    Ok(Json(MessageDTO::from(message)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn unpin_message(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(message_id): Path<i32>,
) -> Result<Json<MessageDTO>, AppError> {
    let message =
        reaction_service::unpin_message(&state, message_id, current_user.user_id).await?;
    Ok(Json(MessageDTO::from(message)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_pinned(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(chat_id): Path<i32>,
) -> Result<Json<Vec<MessageDTO>>, AppError> {
    let messages = reaction_service::list_pinned(&state, chat_id, current_user.user_id).await?;
    Ok(Json(messages.into_iter().map(MessageDTO::from).collect()))
}
