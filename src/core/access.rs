//! Access - The one capability check every chat operation goes through
//!
//! A [`Capability`] is computed fresh from the store on each call, never
//! cached, so a block or membership change is visible to the very next action.

use crate::core::{AppError, AppState};
use crate::entities::{Chat, ChatMember};
use crate::repositories::Read;
use tracing::{debug, instrument, warn};

/// What an identity may do in one chat, as of the moment it was computed
#[derive(Debug, Clone)]
pub struct Capability {
    pub chat: Chat,
    pub member: Option<ChatMember>,
    /// Gated by a block entry under the configured block policy
    pub blocked: bool,
}

impl Capability {
    pub fn is_member(&self) -> bool {
        self.member.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.member.as_ref().is_some_and(|m| m.is_admin)
    }

    pub fn can_send(&self) -> bool {
        self.is_member() && !self.blocked
    }

    pub fn require_member(self) -> Result<Self, AppError> {
        if self.is_member() {
            Ok(self)
        } else {
            warn!(chat_id = self.chat.chat_id, "Access denied: not a member");
            Err(AppError::forbidden("You are not a member of this chat"))
        }
    }

    pub fn require_admin(self) -> Result<Self, AppError> {
        let this = self.require_member()?;
        if this.is_admin() {
            Ok(this)
        } else {
            warn!(chat_id = this.chat.chat_id, "Access denied: not an admin");
            Err(AppError::forbidden("Only chat admins can do this"))
        }
    }

    pub fn require_can_send(self) -> Result<Self, AppError> {
        let this = self.require_member()?;
        if this.blocked {
            warn!(chat_id = this.chat.chat_id, "Access denied: sender is blocked");
            Err(AppError::forbidden("You are blocked in this chat"))
        } else {
            Ok(this)
        }
    }
}

/// Computes the capability of `user_id` in `chat_id`.
///
/// Fails with NotFound when the chat does not exist; everything else is
/// expressed in the returned value and enforced by the `require_*` methods.
#[instrument(skip(state), fields(chat_id = %chat_id, user_id = %user_id))]
pub async fn check_capability(
    state: &AppState,
    chat_id: i32,
    user_id: i32,
) -> Result<Capability, AppError> {
    let chat = state
        .chat
        .read(&chat_id)
        .await?
        .ok_or_else(|| AppError::not_found("Chat not found"))?;

    let member = state.member.read(&(chat_id, user_id)).await?;

    // block entries only exist in personal chats
    let blocked = match &member {
        Some(_) if chat.is_personal() => {
            state
                .block
                .is_gated(chat_id, user_id, state.policy.block_policy)
                .await?
        }
        _ => false,
    };

    debug!(
        is_member = member.is_some(),
        blocked, "Capability computed"
    );
    Ok(Capability {
        chat,
        member,
        blocked,
    })
}
