//! Use case layer: application workflows and orchestration.

pub mod accounts;
pub mod background;
pub mod bootstrap;
pub mod command_error;
pub mod context;
pub mod contracts;
pub mod conversations;
pub mod list_active_chats;
pub mod load_history;
pub mod optimistic_send;
pub mod poller;
pub mod send_message;
pub mod session;
pub mod shell;
pub mod startup;
pub mod stats;
pub mod websites;
pub mod widget;
pub mod workspace;
