//! Current-identity context.
//!
//! A cloneable handle over a `watch` channel. The identity provider publishes
//! into it on sign-in and sign-out; stores and the session controller read it
//! on every call, and anything that needs to react to auth changes subscribes.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{ChatError, ChatResult};
use crate::models::auth::Identity;

/// Shared handle to the signed-in identity, if any.
#[derive(Debug, Clone)]
pub struct IdentityContext {
    tx: Arc<watch::Sender<Option<Identity>>>,
}

impl Default for IdentityContext {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityContext {
    /// Context with nobody signed in.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Context already holding `identity`. Used per request by the HTTP layer.
    pub fn signed_in(identity: Identity) -> Self {
        let ctx = Self::new();
        ctx.publish(Some(identity));
        ctx
    }

    /// Replace the current identity and notify subscribers.
    pub fn publish(&self, identity: Option<Identity>) {
        self.tx.send_replace(identity);
    }

    pub fn current(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    /// Current identity, or `Validation` when nobody is signed in.
    pub fn require(&self) -> ChatResult<Identity> {
        self.current()
            .ok_or_else(|| ChatError::Validation("Missing required field: userId".into()))
    }

    /// Id of the current identity, or `Validation` when nobody is signed in.
    pub fn user_id(&self) -> ChatResult<String> {
        self.require().map(|i| i.id)
    }

    /// Receiver that observes every subsequent publish.
    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }
}
