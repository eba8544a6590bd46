//! Repositories module - One repository per table
//!
//! Every check-then-write sequence of the chat core is expressed here as a
//! single conditional statement or an explicit transaction; callers get back
//! either the written row or an affected-row count they can classify.
//!
//! Queries use the runtime-checked `sqlx::query`/`query_as` API with explicit
//! binds. Timestamps are bound as Unix milliseconds (see `entities::to_millis`).

pub mod block;
pub mod chat;
pub mod member;
pub mod message;
pub mod reaction;
pub mod traits;
pub mod user;

// Trait re-exports
pub use traits::Read;

// Repository re-exports
pub use block::BlockRepository;
pub use chat::{ChatRepository, GroupChatOutcome, PersonalChatOutcome};
pub use member::MemberRepository;
pub use message::MessageRepository;
pub use reaction::ReactionRepository;
pub use user::UserRepository;
