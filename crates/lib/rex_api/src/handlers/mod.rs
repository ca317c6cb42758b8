//! Request handlers.

pub mod auth;
pub mod chat;
pub mod chats;
pub mod completions;
pub mod logs;
pub mod messages;
pub mod usage;
