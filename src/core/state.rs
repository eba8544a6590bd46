//! Application State - Shared application state
//!
//! Holds every repository, the policies and the connection registry.
//! Everything is built explicitly here and handed to the router; there is no
//! process-global state.

use crate::core::{ChatPolicy, Clock, IdentityVerifier, SystemClock};
use crate::repositories::{
    BlockRepository, ChatRepository, MemberRepository, MessageRepository, ReactionRepository,
    UserRepository,
};
use crate::ws::presence::Presence;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// State shared by every route and middleware
pub struct AppState {
    /// User repository
    pub user: UserRepository,

    /// Chat repository
    pub chat: ChatRepository,

    /// Chat member repository
    pub member: MemberRepository,

    /// Block entries of personal chats
    pub block: BlockRepository,

    /// Message repository
    pub msg: MessageRepository,

    /// Reaction repository
    pub reaction: ReactionRepository,

    /// External identity verification
    pub verifier: Arc<dyn IdentityVerifier>,

    pub clock: Arc<dyn Clock>,

    pub policy: ChatPolicy,

    /// Interval between two WebSocket pings
    pub heartbeat_interval: Duration,

    /// Live connections and chat rooms
    pub presence: Presence,
}

impl AppState {
    /// Builds an AppState whose repositories all share `pool`.
    ///
    /// # Arguments
    /// * `pool` - Shared SQLite connection pool
    /// * `verifier` - Access token verification
    /// * `policy` - Edit window, block policy and page sizes
    pub fn new(pool: SqlitePool, verifier: Arc<dyn IdentityVerifier>, policy: ChatPolicy) -> Self {
        Self {
            user: UserRepository::new(pool.clone()),
            chat: ChatRepository::new(pool.clone()),
            member: MemberRepository::new(pool.clone()),
            block: BlockRepository::new(pool.clone()),
            msg: MessageRepository::new(pool.clone()),
            reaction: ReactionRepository::new(pool),
            verifier,
            clock: Arc::new(SystemClock),
            policy,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            presence: Presence::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
