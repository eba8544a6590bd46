//! Courier - chat message lifecycle and real-time delivery
//!
//! Exposes the main modules to the binary and to the tests.

pub mod core;
pub mod dtos;
pub mod entities;
pub mod handlers;
pub mod repositories;
pub mod services;
pub mod ws;

// Main type re-exports
pub use core::{AppError, AppState, auth, config};
pub use handlers::root;

use axum::{
    Router, middleware,
    routing::{any, get, post},
};
use std::sync::Arc;

/// Builds the application router
///
/// Every route except `/` goes through `authentication_middleware`.
pub fn create_router(state: Arc<AppState>) -> Router {
    use core::authentication_middleware;
    use ws::ws_handler;

    Router::new()
        .route("/", get(root))
        .nest("/chats", configure_chat_routes(state.clone()))
        .nest("/messages", configure_message_routes(state.clone()))
        .route(
            "/ws",
            any(ws_handler).layer(middleware::from_fn_with_state(
                state.clone(),
                authentication_middleware,
            )),
        )
        .with_state(state)
}

/// Chat-scoped routes
fn configure_chat_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use handlers::*;

    Router::new()
        .route("/", get(list_chats))
        .route("/personal", post(create_personal_chat))
        .route("/group", post(create_group_chat))
        .route("/{chat_id}", get(get_chat))
        .route("/{chat_id}/members", get(list_members))
        .route("/{chat_id}/block", post(block_user))
        .route("/{chat_id}/block/{user_id}", axum::routing::delete(unblock_user))
        .route("/{chat_id}/blocked", get(list_blocked))
        .route(
            "/{chat_id}/messages",
            get(list_messages)
                .post(send_message)
                .delete(delete_my_messages),
        )
        .route(
            "/{chat_id}/messages/selected",
            axum::routing::delete(delete_selected_messages),
        )
        .route(
            "/{chat_id}/messages/by-date",
            axum::routing::delete(delete_messages_by_date),
        )
        .route("/{chat_id}/pinned", get(list_pinned))
        .route("/{chat_id}/forward", post(forward_message))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

/// Routes acting on a single message
fn configure_message_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use handlers::*;

    Router::new()
        .route(
            "/{message_id}",
            get(get_message).patch(edit_message).delete(delete_message),
        )
        .route("/{message_id}/read", post(mark_read))
        .route(
            "/{message_id}/reactions",
            get(list_reactions)
                .post(add_reaction)
                .delete(remove_reaction),
        )
        .route(
            "/{message_id}/pin",
            post(pin_message).delete(unpin_message),
        )
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}
