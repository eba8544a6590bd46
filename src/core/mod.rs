//! Core Module - Application infrastructure
//!
//! Infrastructure shared by every layer:
//! - Authentication and identity verification
//! - Permission checks per (chat, user)
//! - Injectable clock
//! - Configuration
//! - Error handling and request extractors
//! - Application state

pub mod access;
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod extract;
pub mod state;

// Re-exports
pub use access::{Capability, check_capability};
pub use auth::{Claims, IdentityVerifier, JwtVerifier, authentication_middleware, encode_jwt};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BlockPolicy, ChatPolicy, Config};
pub use error::{AppError, ErrorKind};
pub use extract::{ApiJson, ApiQuery};
pub use state::AppState;
