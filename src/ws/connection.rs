//! WebSocket Connection Management
//!
//! Each connection runs a reader (client frames, pongs) and a writer (room
//! events, personal events, heartbeat pings). The writer owns the room
//! subscriptions, so leaving the writer loop leaves every room at once.

use crate::entities::UserStatus;
use crate::{
    AppState,
    dtos::{ClientFrame, WsEvent},
    ws::{
        event_handlers::{error_signal, process_frame},
        usermap::InternalSignal,
    },
};
use crate::core::AppError;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::time::{MissedTickBehavior, interval};
use tokio_stream::StreamMap;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, error, info, instrument, warn};

#[instrument(skip(ws, state), fields(user_id))]
pub async fn handle_socket(ws: WebSocket, state: Arc<AppState>, user_id: i32) {
    info!("WebSocket connection established");

    // Split the socket into sender and receiver halves
    let (ws_tx, ws_rx) = ws.split();

    // Unbounded channel feeding the write task
    let (int_tx, int_rx) = unbounded_channel::<InternalSignal>();

    let connection_id = state.presence.next_connection_id();
    let came_online = state.presence.register(user_id, connection_id, int_tx.clone());
    info!(connection_id, "User registered as online");
    if came_online {
        announce_status(&state, user_id, UserStatus::Online).await;
    }

    // set by the reader on every Pong, cleared by the writer on every Ping
    let alive = Arc::new(AtomicBool::new(true));

    let listener = tokio::spawn(listen_ws(
        user_id,
        ws_rx,
        int_tx,
        state.clone(),
        alive.clone(),
    ));

    write_ws(user_id, ws_tx, int_rx, state.clone(), alive).await;
    listener.abort();

    // Cleanup
    if state.presence.unregister(user_id, connection_id) {
        announce_status(&state, user_id, UserStatus::Offline).await;
    }
    info!(connection_id, "Connection closed");
}

/// Sends `user_status` to every online identity sharing a chat with `user_id`
async fn announce_status(state: &AppState, user_id: i32, status: UserStatus) {
    match state.member.find_co_member_ids(&user_id).await {
        Ok(audience) => {
            state
                .presence
                .announce_status(user_id, status, &audience, state.now());
        }
        Err(e) => error!("Failed to load co-members for status change: {:?}", e),
    }
}

#[instrument(skip(websocket_tx, internal_rx, state, alive), fields(user_id))]
pub async fn write_ws(
    user_id: i32,
    mut websocket_tx: SplitSink<WebSocket, Message>,
    mut internal_rx: UnboundedReceiver<InternalSignal>,
    state: Arc<AppState>,
    alive: Arc<AtomicBool>,
) {
    info!("Write task started");

    let mut stream_map: StreamMap<i32, BroadcastStream<Arc<WsEvent>>> = StreamMap::new();
    let mut heartbeat = interval(state.heartbeat_interval);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    heartbeat.tick().await; // Consume the immediate first tick

    'external: loop {
        tokio::select! {
            Some((chat_id, result)) = tokio_stream::StreamExt::next(&mut stream_map) => {
                match result {
                    Ok(event) => {
                        // typists do not get their own indicator back
                        if let WsEvent::UserTyping { user_id: typist, .. } = event.as_ref() {
                            if *typist == user_id {
                                continue;
                            }
                        }
                        if send_event(&mut websocket_tx, &event).await.is_err() {
                            warn!("Failed to send event, closing connection");
                            break 'external;
                        }
                    }
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        warn!(chat_id, skipped, "Subscriber lagged, events dropped");
                    }
                }
            }

            _ = heartbeat.tick() => {
                if !alive.swap(false, Ordering::AcqRel) {
                    warn!("Previous ping not answered, closing connection");
                    break 'external;
                }
                if websocket_tx.send(Message::Ping(Default::default())).await.is_err() {
                    warn!("Failed to send ping, closing connection");
                    break 'external;
                }
            }

            signal = internal_rx.recv() => {
                match signal {
                    Some(InternalSignal::Shutdown) => {
                        info!("Shutdown signal received");
                        break 'external;
                    }
                    Some(InternalSignal::AddChat(chat_id)) => {
                        info!(chat_id, "Adding chat subscription");
                        let rx = state.presence.subscribe(chat_id);
                        stream_map.insert(chat_id, BroadcastStream::new(rx));
                        let joined = WsEvent::RoomJoined { chat_id, timestamp: state.now() };
                        if send_event(&mut websocket_tx, &joined).await.is_err() {
                            break 'external;
                        }
                    }
                    Some(InternalSignal::RemoveChat(chat_id)) => {
                        info!(chat_id, "Removing chat subscription");
                        if stream_map.remove(&chat_id).is_none() {
                            debug!(chat_id, "Not subscribed, nothing to leave");
                            continue;
                        }
                        state.presence.release_room(chat_id);
                        let left = WsEvent::RoomLeft { chat_id, timestamp: state.now() };
                        if send_event(&mut websocket_tx, &left).await.is_err() {
                            break 'external;
                        }
                    }
                    Some(InternalSignal::Event(event)) => {
                        if send_event(&mut websocket_tx, &event).await.is_err() {
                            warn!("Failed to send personal event, closing connection");
                            break 'external;
                        }
                    }
                    None => {
                        info!("Internal channel closed");
                        break 'external;
                    }
                }
            }
        }
    }

    // leave every room this connection had joined
    let joined: Vec<i32> = stream_map.keys().copied().collect();
    drop(stream_map);
    for chat_id in joined {
        state.presence.release_room(chat_id);
    }

    let _ = websocket_tx.send(Message::Close(None)).await;
    info!("Write task terminated");
}

async fn send_event(
    websocket_tx: &mut SplitSink<WebSocket, Message>,
    event: &WsEvent,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event).map_err(|e| {
        error!("Failed to serialize event: {:?}", e);
        axum::Error::new(e)
    })?;
    websocket_tx.send(Message::Text(Utf8Bytes::from(json))).await
}

#[instrument(skip(websocket_rx, internal_tx, state, alive), fields(user_id))]
pub async fn listen_ws(
    user_id: i32,
    mut websocket_rx: SplitStream<WebSocket>,
    internal_tx: UnboundedSender<InternalSignal>,
    state: Arc<AppState>,
    alive: Arc<AtomicBool>,
) {
    info!("Listen task started");

    while let Some(msg_result) = StreamExt::next(&mut websocket_rx).await {
        let msg = match msg_result {
            Ok(m) => m,
            Err(e) => {
                warn!("WebSocket error: {:?}", e);
                break;
            }
        };

        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientFrame>(&text) {
                Ok(frame) => process_frame(&state, user_id, frame, &internal_tx).await,
                Err(e) => {
                    warn!("Malformed client frame, closing connection: {}", e);
                    let error = AppError::invalid_input("Malformed frame").with_details(e.to_string());
                    let _ = internal_tx.send(error_signal(&state, &error));
                    break;
                }
            },
            Message::Binary(_) => {
                warn!("Binary frames are not supported, closing connection");
                break;
            }
            Message::Pong(_) => {
                alive.store(true, Ordering::Release);
            }
            Message::Close(_) => {
                info!("Close message received");
                break;
            }
            Message::Ping(_) => {}
        }
    }

    // the write task closes the socket
    let _ = internal_tx.send(InternalSignal::Shutdown);
    info!("Listen task terminated");
}
