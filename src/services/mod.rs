//! Services module - Operations of the chat domain
//!
//! Every operation takes the shared state and the acting identity,
//! recomputes permissions through `check_capability`, performs the mutation
//! and, only on success, hands the event to `Presence` for fan-out.

pub mod chat;
pub mod message;
pub mod reaction;
