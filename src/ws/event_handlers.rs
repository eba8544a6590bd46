//! WebSocket Event Handlers - Handlers for client frames
//!
//! Join and typing re-check membership against the store on every frame; a
//! connection being authenticated says nothing about the chats it may see.

use crate::core::{AppError, AppState, check_capability};
use crate::dtos::{ClientFrame, WsEvent};
use crate::ws::usermap::InternalSignal;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, instrument, warn};

/// Handles one parsed client frame
///
/// Failures are reported to this connection as an `error` frame; they never
/// close it.
#[instrument(skip(state, internal_tx), fields(user_id))]
pub async fn process_frame(
    state: &AppState,
    user_id: i32,
    frame: ClientFrame,
    internal_tx: &UnboundedSender<InternalSignal>,
) {
    let result = match frame {
        ClientFrame::JoinChat { chat_id } => join_chat(state, user_id, chat_id, internal_tx).await,
        ClientFrame::LeaveChat { chat_id } => {
            info!(chat_id, "Leaving chat room");
            let _ = internal_tx.send(InternalSignal::RemoveChat(chat_id));
            Ok(())
        }
        ClientFrame::Typing { chat_id } => typing(state, user_id, chat_id).await,
    };

    if let Err(e) = result {
        warn!("Client frame rejected: {}", e);
        let _ = internal_tx.send(error_signal(state, &e));
    }
}

async fn join_chat(
    state: &AppState,
    user_id: i32,
    chat_id: i32,
    internal_tx: &UnboundedSender<InternalSignal>,
) -> Result<(), AppError> {
    check_capability(state, chat_id, user_id)
        .await?
        .require_member()?;
    info!(chat_id, "Joining chat room");
    let _ = internal_tx.send(InternalSignal::AddChat(chat_id));
    Ok(())
}

async fn typing(state: &AppState, user_id: i32, chat_id: i32) -> Result<(), AppError> {
    check_capability(state, chat_id, user_id)
        .await?
        .require_member()?;
    state.presence.publish_to_room(WsEvent::UserTyping {
        chat_id,
        user_id,
        timestamp: state.now(),
    });
    Ok(())
}

pub fn error_signal(state: &AppState, error: &AppError) -> InternalSignal {
    InternalSignal::Event(Arc::new(WsEvent::Error {
        code: error.kind(),
        message: error.message().to_string(),
        timestamp: state.now(),
    }))
}
