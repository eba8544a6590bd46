//! UserMap - Identity -> live connection registry
//!
//! One entry per identity. A newer connection replaces the older one; the
//! replaced sender is handed back so the caller can shut that connection down.

use crate::dtos::WsEvent;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument, warn};

pub enum InternalSignal {
    Shutdown,
    AddChat(i32),
    RemoveChat(i32),
    /// Event for this connection only (status changes, errors)
    Event(Arc<WsEvent>),
}

struct Registration {
    connection_id: u64,
    tx: UnboundedSender<InternalSignal>,
}

pub struct UserMap {
    users_online: DashMap<i32, Registration>,
}

impl Default for UserMap {
    fn default() -> Self {
        Self::new()
    }
}

impl UserMap {
    pub fn new() -> Self {
        UserMap {
            users_online: DashMap::new(),
        }
    }

    /// Registers `connection_id` as the live connection of `user_id`,
    /// returning the sender of the connection it supersedes, if any
    #[instrument(skip(self, tx), fields(user_id, connection_id))]
    pub fn register_online(
        &self,
        user_id: i32,
        connection_id: u64,
        tx: UnboundedSender<InternalSignal>,
    ) -> Option<UnboundedSender<InternalSignal>> {
        info!("Registering user {} as online", user_id);
        let previous = self
            .users_online
            .insert(user_id, Registration { connection_id, tx })
            .map(|old| old.tx);
        info!("Total online users: {}", self.users_online.len());
        previous
    }

    /// Removes the entry only if it still belongs to `connection_id`.
    ///
    /// Returns `true` when the identity went offline because of this call.
    #[instrument(skip(self), fields(user_id, connection_id))]
    pub fn remove_from_online(&self, user_id: &i32, connection_id: u64) -> bool {
        match self.users_online.entry(*user_id) {
            Entry::Occupied(entry) if entry.get().connection_id == connection_id => {
                info!("Removing user from online");
                entry.remove();
                true
            }
            _ => {
                debug!("Connection already superseded, registry untouched");
                false
            }
        }
    }

    #[instrument(skip(self, message), fields(user_id))]
    pub fn send_server_message_if_online(&self, user_id: &i32, message: InternalSignal) -> bool {
        let message_type = match &message {
            InternalSignal::Shutdown => "Shutdown",
            InternalSignal::AddChat(_) => "AddChat",
            InternalSignal::RemoveChat(_) => "RemoveChat",
            InternalSignal::Event(_) => "Event",
        };

        if let Some(entry) = self.users_online.get(user_id) {
            if let Err(e) = entry.value().tx.send(message) {
                warn!("Failed to send {} message to user: {:?}", message_type, e.to_string());
                false
            } else {
                debug!("{} message sent to online user", message_type);
                true
            }
        } else {
            debug!("User {} not online, {} message not sent", user_id, message_type);
            false
        }
    }

    /// Get the count of online users
    pub fn online_count(&self) -> usize {
        self.users_online.len()
    }

    /// Check if a specific user is online
    pub fn is_user_online(&self, user_id: &i32) -> bool {
        self.users_online.contains_key(user_id)
    }
}
