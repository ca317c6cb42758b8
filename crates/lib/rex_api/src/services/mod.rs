//! Business logic shared by handlers.

pub mod auth;
pub mod scope;
