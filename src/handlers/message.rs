//! Message handlers - Sending, reading, editing and deleting messages

use crate::core::{ApiJson, ApiQuery, AppError, AppState};
use crate::dtos::{
    DeleteByDateDTO, DeleteSelectedDTO, DeletedMessagesDTO, EditMessageDTO, ForwardMessageDTO,
    MessageDTO, PaginationQuery, SendMessageDTO,
};
use crate::entities::User;
use crate::services::message as message_service;
use axum::{
    Extension,
    extract::{Json, Path, State},
    http::StatusCode,
};
use axum_macros::debug_handler;
use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(chat_id): Path<i32>,
    ApiQuery(query): ApiQuery<PaginationQuery>,
) -> Result<Json<Vec<MessageDTO>>, AppError> {
    let messages = message_service::list_messages(
        &state,
        chat_id,
        current_user.user_id,
        query.limit,
        query.offset,
    )
    .await?;
    Ok(Json(messages.into_iter().map(MessageDTO::from).collect()))
}

#[debug_handler]
#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(chat_id): Path<i32>,
    ApiJson(body): ApiJson<SendMessageDTO>,
) -> Result<(StatusCode, Json<MessageDTO>), AppError> {
    body.validate()?;
    let message = message_service::send_message(
        &state,
        chat_id,
        current_user.user_id,
        body.content,
        body.reply_to,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(MessageDTO::from(message))))
}

/// Purges the caller's own messages in the chat
#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn delete_my_messages(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(chat_id): Path<i32>,
) -> Result<Json<DeletedMessagesDTO>, AppError> {
    let deleted =
        message_service::delete_all_by_author(&state, chat_id, current_user.user_id).await?;
    Ok(Json(DeletedMessagesDTO::from(deleted)))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn delete_selected_messages(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(chat_id): Path<i32>,
    ApiJson(body): ApiJson<DeleteSelectedDTO>,
) -> Result<Json<DeletedMessagesDTO>, AppError> {
    body.validate()?;
    let deleted = message_service::delete_by_ids(
        &state,
        chat_id,
        current_user.user_id,
        &body.message_ids,
    )
    .await?;
    Ok(Json(DeletedMessagesDTO::from(deleted)))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn delete_messages_by_date(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(chat_id): Path<i32>,
    ApiJson(body): ApiJson<DeleteByDateDTO>,
) -> Result<Json<DeletedMessagesDTO>, AppError> {
    let deleted = message_service::delete_by_date_range(
        &state,
        chat_id,
        current_user.user_id,
        body.start,
        body.end,
    )
    .await?;
    Ok(Json(DeletedMessagesDTO::from(deleted)))
}

#[debug_handler]
#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn forward_message(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(chat_id): Path<i32>,
    ApiJson(body): ApiJson<ForwardMessageDTO>,
) -> Result<(StatusCode, Json<MessageDTO>), AppError> {
    let message = message_service::forward_message(
        &state,
        body.message_id,
        chat_id,
        body.target_chat_id,
        current_user.user_id,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(MessageDTO::from(message))))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn get_message(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(message_id): Path<i32>,
) -> Result<Json<MessageDTO>, AppError> {
    let message = message_service::get_message(&state, message_id, current_user.user_id).await?;
    Ok(Json(MessageDTO::from(message)))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn edit_message(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(message_id): Path<i32>,
    ApiJson(body): ApiJson<EditMessageDTO>,
) -> Result<Json<MessageDTO>, AppError> {
    body.validate()?;
    let message =
        message_service::edit_message(&state, message_id, current_user.user_id, body.content)
            .await?;
    Ok(Json(MessageDTO::from(message)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(message_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    message_service::delete_message(&state, message_id, current_user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(message_id): Path<i32>,
) -> Result<Json<MessageDTO>, AppError> {
    let message = message_service::mark_read(&state, message_id, current_user.user_id).await?;
    Ok(Json(MessageDTO::from(message)))
}
