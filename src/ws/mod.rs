//! WebSocket Module - Real-time delivery over WebSocket
//!
//! This module handles the live connections between clients and the server:
//! - HTTP -> WebSocket upgrade
//! - Connection registry and per-chat rooms
//! - Connection handling (sender/receiver split, heartbeat)
//! - Handlers for client frames

pub mod chatmap;
pub mod connection;
pub mod event_handlers;
pub mod presence;
pub mod usermap;

// Re-exports pubblici
pub use connection::handle_socket;
pub use presence::{Presence, RoomBus};

use crate::{AppState, entities::User};
use axum::{
    Extension,
    extract::{State, ws::WebSocketUpgrade},
    response::Response,
};
use std::sync::Arc;

/// Events buffered per room before a slow subscriber starts lagging
pub const BROADCAST_CHANNEL_CAPACITY: usize = 256;

/// Entry point for WebSocket upgrade requests
/// Steps:
/// 1. Take user_id from authentication (the middleware already verified the token)
/// 2. Upgrade HTTP -> WebSocket
/// 3. Hand the connection to handle_socket
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>, // set by authentication
) -> Response {
    let user_id = current_user.user_id;

    // a failed upgrade is answered with an error response
    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}
