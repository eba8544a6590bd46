//! DTOs module - Data Transfer Objects
//!
//! Every shape exchanged with clients. DTOs keep the API representation apart
//! from the stored entities.

pub mod chat;
pub mod message;
pub mod query;
pub mod reaction;
pub mod ws_event;

pub use chat::{
    BlockEntryDTO, BlockUserDTO, ChatDTO, ChatDetailsDTO, CreateGroupChatDTO,
    CreatePersonalChatDTO, MemberDTO,
};
pub use message::{
    CreateMessageDTO, DeleteByDateDTO, DeleteSelectedDTO, DeletedMessagesDTO, EditMessageDTO,
    ForwardMessageDTO, MessageDTO, SendMessageDTO,
};
pub use query::PaginationQuery;
pub use reaction::{ReactionDTO, ReactionRequestDTO};
pub use ws_event::{ClientFrame, WsEvent};
