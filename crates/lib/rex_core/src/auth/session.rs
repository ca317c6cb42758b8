//! Identity provider adapter for an interactive session.
//!
//! Wraps an [`Authenticator`] and publishes every sign-in, registration and
//! sign-out into an [`IdentityContext`].

use super::{AuthError, Authenticator};
use crate::identity::IdentityContext;
use crate::models::auth::Identity;

#[derive(Clone)]
pub struct IdentitySession {
    auth: Authenticator,
    context: IdentityContext,
}

impl IdentitySession {
    pub fn new(auth: Authenticator, context: IdentityContext) -> Self {
        Self { auth, context }
    }

    pub fn context(&self) -> &IdentityContext {
        &self.context
    }

    pub fn current(&self) -> Option<Identity> {
        self.context.current()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let identity = self.auth.sign_in(email, password).await?;
        self.context.publish(Some(identity.clone()));
        Ok(identity)
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, AuthError> {
        let identity = self.auth.register(email, password, display_name).await?;
        self.context.publish(Some(identity.clone()));
        Ok(identity)
    }

    /// Clear the current identity.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.context.publish(None);
        Ok(())
    }

    pub async fn send_reset_email(&self, email: &str) -> bool {
        self.auth.send_reset_email(email).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::LogMailer;
    use crate::store::MemoryRepository;

    fn session() -> IdentitySession {
        let auth = Authenticator::new(
            Arc::new(MemoryRepository::new()),
            Arc::new(LogMailer),
            b"secret",
        );
        IdentitySession::new(auth, IdentityContext::new())
    }

    #[tokio::test]
    async fn sign_in_and_out_publish_to_subscribers() {
        let session = session();
        let mut rx = session.context().subscribe();

        let registered = session
            .register("ada@example.com", "password1", None)
            .await
            .unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().clone(), Some(registered.clone()));

        session.sign_out().await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());

        session
            .sign_in("ada@example.com", "password1")
            .await
            .unwrap();
        assert_eq!(session.current(), Some(registered));
    }

    #[tokio::test]
    async fn failed_sign_in_leaves_context_untouched() {
        let session = session();
        assert!(session.sign_in("ghost@example.com", "password1").await.is_err());
        assert!(session.current().is_none());
    }
}
