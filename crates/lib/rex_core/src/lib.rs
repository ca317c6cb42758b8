//! # rex_core
//!
//! Core domain logic for Rex: identity, chat rooms, messages, AI replies.

pub mod auth;
pub mod completion;
pub mod error;
pub mod identity;
pub mod logs;
pub mod messages;
pub mod migrate;
pub mod models;
pub mod rooms;
pub mod session;
pub mod store;
pub mod usage;
pub mod uuid;

pub use error::{ChatError, ChatResult};
pub use identity::IdentityContext;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
