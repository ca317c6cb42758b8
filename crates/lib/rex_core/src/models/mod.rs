//! Domain models.
//!
//! These are internal domain models; the HTTP layer defines its own
//! request/response shapes.

pub mod auth;
pub mod chat;
pub mod log;
