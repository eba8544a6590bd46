//! Presence - Owner of the connection registry and of the room bus
//!
//! Services never touch sockets: they hand finished mutations to
//! [`Presence::publish_to_room`] or [`Presence::publish_to_user`]. Delivery is
//! best effort; an identity with no live connection simply misses the event.

use crate::dtos::WsEvent;
use crate::entities::UserStatus;
use crate::ws::chatmap::ChatMap;
use crate::ws::usermap::{InternalSignal, UserMap};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast::Receiver;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument};

/// Per-chat publish/subscribe capability.
///
/// [`ChatMap`] is the in-process implementation; a multi-instance deployment
/// would plug an external pub/sub here and keep the rest unchanged.
pub trait RoomBus: Send + Sync {
    fn subscribe(&self, chat_id: i32) -> Receiver<Arc<WsEvent>>;
    /// Returns the number of local subscribers reached
    fn publish(&self, chat_id: i32, event: Arc<WsEvent>) -> usize;
    /// Drops the room if it has no subscribers left
    fn release(&self, chat_id: i32);
}

impl RoomBus for ChatMap {
    fn subscribe(&self, chat_id: i32) -> Receiver<Arc<WsEvent>> {
        ChatMap::subscribe(self, &chat_id)
    }

    fn publish(&self, chat_id: i32, event: Arc<WsEvent>) -> usize {
        self.send(&chat_id, event)
    }

    fn release(&self, chat_id: i32) {
        ChatMap::release(self, &chat_id)
    }
}

pub struct Presence {
    users: UserMap,
    rooms: Arc<dyn RoomBus>,
    next_connection_id: AtomicU64,
}

impl Default for Presence {
    fn default() -> Self {
        Self::new()
    }
}

impl Presence {
    pub fn new() -> Self {
        Self::with_room_bus(Arc::new(ChatMap::new()))
    }

    pub fn with_room_bus(rooms: Arc<dyn RoomBus>) -> Self {
        Self {
            users: UserMap::new(),
            rooms,
            next_connection_id: AtomicU64::new(1),
        }
    }

    pub fn next_connection_id(&self) -> u64 {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Makes `connection_id` the live connection of `user_id`. The superseded
    /// connection, if any, is told to shut down.
    ///
    /// Returns `true` when the identity was offline before this call.
    #[instrument(skip(self, tx))]
    pub fn register(
        &self,
        user_id: i32,
        connection_id: u64,
        tx: UnboundedSender<InternalSignal>,
    ) -> bool {
        match self.users.register_online(user_id, connection_id, tx) {
            Some(previous) => {
                info!("Superseding previous connection");
                let _ = previous.send(InternalSignal::Shutdown);
                false
            }
            None => true,
        }
    }

    /// Returns `true` when the identity went offline because of this call
    pub fn unregister(&self, user_id: i32, connection_id: u64) -> bool {
        self.users.remove_from_online(&user_id, connection_id)
    }

    pub fn is_online(&self, user_id: i32) -> bool {
        self.users.is_user_online(&user_id)
    }

    pub fn online_count(&self) -> usize {
        self.users.online_count()
    }

    /// Forwards a control signal to the identity's live connection
    pub fn signal(&self, user_id: i32, signal: InternalSignal) -> bool {
        self.users.send_server_message_if_online(&user_id, signal)
    }

    pub fn subscribe(&self, chat_id: i32) -> Receiver<Arc<WsEvent>> {
        self.rooms.subscribe(chat_id)
    }

    pub fn release_room(&self, chat_id: i32) {
        self.rooms.release(chat_id)
    }

    /// Publishes a chat-scoped event to the room of its chat
    #[instrument(skip(self, event))]
    pub fn publish_to_room(&self, event: WsEvent) -> usize {
        match event.chat_id() {
            Some(chat_id) => {
                let reached = self.rooms.publish(chat_id, Arc::new(event));
                debug!(chat_id, reached, "Room event published");
                reached
            }
            None => {
                debug!("Event has no room, not published");
                0
            }
        }
    }

    /// Sends an event on the identity's personal channel
    pub fn publish_to_user(&self, user_id: i32, event: Arc<WsEvent>) -> bool {
        self.signal(user_id, InternalSignal::Event(event))
    }

    /// Tells every online identity in `audience` that `user_id` changed status
    #[instrument(skip(self, audience), fields(audience = audience.len()))]
    pub fn announce_status(
        &self,
        user_id: i32,
        status: UserStatus,
        audience: &[i32],
        timestamp: DateTime<Utc>,
    ) -> usize {
        let event = Arc::new(WsEvent::UserStatus {
            user_id,
            status,
            timestamp,
        });
        let reached = audience
            .iter()
            .filter(|id| **id != user_id)
            .filter(|id| self.publish_to_user(**id, event.clone()))
            .count();
        info!(reached, ?status, "Status announced");
        reached
    }
}
