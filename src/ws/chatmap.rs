//! ChatMap - One broadcast channel per chat room with live subscribers

use crate::dtos::WsEvent;
use crate::ws::BROADCAST_CHANNEL_CAPACITY;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::{Receiver, Sender};
use tracing::{debug, instrument};

pub struct ChatMap {
    /// Attribute to retrieve the tx head of a broadcast channel by chat_id field
    channels: DashMap<i32, Sender<Arc<WsEvent>>>,
}

impl Default for ChatMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatMap {
    pub fn new() -> Self {
        ChatMap {
            channels: DashMap::new(),
        }
    }

    #[instrument(skip(self), fields(chat_id))]
    pub fn subscribe(&self, chat_id: &i32) -> Receiver<Arc<WsEvent>> {
        // Arc<WsEvent> to share the ref, not the event. Avoid copies on each rx.
        self.channels
            .entry(*chat_id)
            .or_insert_with(|| {
                debug!("Creating new broadcast channel for chat");
                broadcast::channel::<Arc<WsEvent>>(BROADCAST_CHANNEL_CAPACITY).0
            })
            .subscribe()
    }

    /// Sends to every subscriber of the room; returns how many were reached.
    /// A room nobody listens to is dropped.
    #[instrument(skip(self, event), fields(chat_id))]
    pub fn send(&self, chat_id: &i32, event: Arc<WsEvent>) -> usize {
        let sent = match self.channels.get(chat_id) {
            Some(chat) => chat.send(event).unwrap_or(0),
            None => {
                debug!("No live room for chat, event dropped");
                return 0;
            }
        };
        if sent == 0 {
            self.release(chat_id);
        }
        debug!(receivers = sent, "Event broadcast to receivers");
        sent
    }

    /// Removes the room if nobody is subscribed any more
    pub fn release(&self, chat_id: &i32) {
        self.channels
            .remove_if(chat_id, |_, tx| tx.receiver_count() == 0);
    }

    pub fn room_count(&self) -> usize {
        self.channels.len()
    }
}
