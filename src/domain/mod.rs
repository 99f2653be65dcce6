//! Domain layer: core entities and business rules.

pub mod account;
pub mod active_chat;
pub mod chat_list_state;
pub mod conversation;
pub mod conversation_list_state;
pub mod events;
pub mod failure;
pub mod message;
pub mod message_input_state;
pub mod notice;
pub mod open_chat_state;
pub mod shell_state;
pub mod website;
pub mod workspace;
