//! Credential flows: sign-in, registration, password reset, token rotation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use super::AuthError;
use super::jwt::{ACCESS_TOKEN_EXPIRY_SECS, generate_access_token, verify_access_token};
use super::password::{hash_password, validate_password, verify_password};
use super::tokens::{REFRESH_TOKEN_EXPIRY_DAYS, RESET_TOKEN_EXPIRY_MINUTES, generate_token, hash_token};
use crate::models::auth::Identity;
use crate::store::UserRepository;

/// Delivers password reset tokens to users.
#[async_trait]
pub trait ResetMailer: Send + Sync {
    async fn send_reset(&self, email: &str, token: &str) -> Result<(), AuthError>;
}

/// Mailer that records the request without delivering anything. The token
/// itself never reaches the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl ResetMailer for LogMailer {
    async fn send_reset(&self, email: &str, _token: &str) -> Result<(), AuthError> {
        debug!(email, "password reset requested; no mail relay configured");
        Ok(())
    }
}

/// Access token plus rotating refresh token.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// Identity provider backed by a [`UserRepository`].
#[derive(Clone)]
pub struct Authenticator {
    users: Arc<dyn UserRepository>,
    mailer: Arc<dyn ResetMailer>,
    jwt_secret: Arc<[u8]>,
}

impl Authenticator {
    pub fn new(
        users: Arc<dyn UserRepository>,
        mailer: Arc<dyn ResetMailer>,
        jwt_secret: impl AsRef<[u8]>,
    ) -> Self {
        Self {
            users,
            mailer,
            jwt_secret: Arc::from(jwt_secret.as_ref()),
        }
    }

    /// Check email and password. Unknown email and wrong password fail alike.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let Some(found) = self.users.find_user_by_email(email).await? else {
            return Err(AuthError::InvalidCredentials);
        };
        let Some(hash) = found.password_hash else {
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(password, &hash)? {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(found.identity)
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, AuthError> {
        if email.trim().is_empty() {
            return Err(AuthError::ValidationError("Email is required".into()));
        }
        validate_password(password)?;
        if self.users.find_user_by_email(email).await?.is_some() {
            return Err(AuthError::ValidationError("Email already registered".into()));
        }
        let hash = hash_password(password)?;
        let identity = self.users.create_user(email, display_name, &hash).await?;
        info!(user_id = %identity.id, "registered user");
        Ok(identity)
    }

    /// Issue a reset token and mail it. `false` when the email is unknown or
    /// delivery fails; neither is raised to the caller.
    pub async fn send_reset_email(&self, email: &str) -> bool {
        match self.try_send_reset(email).await {
            Ok(sent) => sent,
            Err(e) => {
                warn!(email, "password reset failed: {e}");
                false
            }
        }
    }

    async fn try_send_reset(&self, email: &str) -> Result<bool, AuthError> {
        let Some(found) = self.users.find_user_by_email(email).await? else {
            info!(email, "password reset requested for unknown email");
            return Ok(false);
        };
        let token = generate_token();
        let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_EXPIRY_MINUTES);
        self.users
            .store_reset_token(&hash_token(&token), &found.identity.id, expires_at)
            .await?;
        self.mailer.send_reset(email, &token).await?;
        Ok(true)
    }

    /// Consume a reset token and set a new password. Every refresh token of
    /// the user is revoked.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        validate_password(new_password)?;
        let user_id = self
            .users
            .consume_reset_token(&hash_token(token))
            .await?
            .ok_or_else(|| AuthError::TokenError("Invalid or expired reset token".into()))?;
        let hash = hash_password(new_password)?;
        self.users.update_password(&user_id, &hash).await?;
        self.users.revoke_all_refresh_tokens(&user_id).await?;
        info!(user_id = %user_id, "password reset completed");
        Ok(())
    }

    /// Mint an access token and store a fresh refresh token.
    pub async fn issue_tokens(&self, identity: &Identity) -> Result<TokenPair, AuthError> {
        let access_token = generate_access_token(identity, &self.jwt_secret)?;
        let refresh_token = generate_token();
        let expires_at = Utc::now() + Duration::days(REFRESH_TOKEN_EXPIRY_DAYS);
        self.users
            .store_refresh_token(&hash_token(&refresh_token), &identity.id, expires_at)
            .await?;
        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: ACCESS_TOKEN_EXPIRY_SECS,
        })
    }

    /// Single-use rotation: the presented refresh token is revoked and a new
    /// pair is issued.
    pub async fn refresh(&self, refresh_token: &str) -> Result<(Identity, TokenPair), AuthError> {
        let (token_id, user_id) = self
            .users
            .find_valid_refresh_token(&hash_token(refresh_token))
            .await?
            .ok_or_else(|| AuthError::TokenError("Invalid refresh token".into()))?;
        self.users.revoke_refresh_token(&token_id).await?;
        let identity = self
            .users
            .get_user_by_id(&user_id)
            .await?
            .ok_or_else(|| AuthError::TokenError("User not found".into()))?;
        let pair = self.issue_tokens(&identity).await?;
        Ok((identity, pair))
    }

    /// Revoke one refresh token. Unknown tokens are ignored.
    pub async fn logout(&self, refresh_token: Option<&str>) -> Result<(), AuthError> {
        if let Some(token) = refresh_token {
            self.users
                .revoke_refresh_token_by_hash(&hash_token(token))
                .await?;
        }
        Ok(())
    }

    /// Identity carried by a valid access token.
    pub fn verify(&self, access_token: &str) -> Option<Identity> {
        verify_access_token(access_token, &self.jwt_secret).map(|c| c.identity())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::store::MemoryRepository;

    #[derive(Default)]
    struct CapturingMailer {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl ResetMailer for CapturingMailer {
        async fn send_reset(&self, email: &str, token: &str) -> Result<(), AuthError> {
            if self.fail {
                return Err(AuthError::Internal("smtp down".into()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((email.to_string(), token.to_string()));
            Ok(())
        }
    }

    fn authenticator(mailer: Arc<CapturingMailer>) -> Authenticator {
        Authenticator::new(Arc::new(MemoryRepository::new()), mailer, b"test-secret")
    }

    #[tokio::test]
    async fn register_then_sign_in() {
        let auth = authenticator(Arc::default());
        let registered = auth
            .register("ada@example.com", "password1", Some("Ada"))
            .await
            .unwrap();
        let signed_in = auth.sign_in("ada@example.com", "password1").await.unwrap();
        assert_eq!(registered, signed_in);
        assert_eq!(signed_in.display_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn wrong_email_and_wrong_password_look_the_same() {
        let auth = authenticator(Arc::default());
        auth.register("ada@example.com", "password1", None)
            .await
            .unwrap();
        assert!(matches!(
            auth.sign_in("ada@example.com", "nope-nope").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.sign_in("bob@example.com", "password1").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn short_password_and_duplicate_email_are_rejected() {
        let auth = authenticator(Arc::default());
        assert!(matches!(
            auth.register("ada@example.com", "short", None).await,
            Err(AuthError::ValidationError(_))
        ));
        auth.register("ada@example.com", "password1", None)
            .await
            .unwrap();
        assert!(matches!(
            auth.register("ada@example.com", "password2", None).await,
            Err(AuthError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn reset_flow_replaces_password() {
        let mailer = Arc::new(CapturingMailer::default());
        let auth = authenticator(mailer.clone());
        auth.register("ada@example.com", "password1", None)
            .await
            .unwrap();

        assert!(auth.send_reset_email("ada@example.com").await);
        let token = mailer.sent.lock().unwrap()[0].1.clone();

        auth.reset_password(&token, "password2").await.unwrap();
        assert!(auth.sign_in("ada@example.com", "password2").await.is_ok());
        assert!(matches!(
            auth.reset_password(&token, "password3").await,
            Err(AuthError::TokenError(_))
        ));
    }

    #[tokio::test]
    async fn reset_email_reports_false_instead_of_failing() {
        let auth = authenticator(Arc::default());
        assert!(!auth.send_reset_email("nobody@example.com").await);

        let failing = authenticator(Arc::new(CapturingMailer {
            fail: true,
            ..Default::default()
        }));
        failing
            .register("ada@example.com", "password1", None)
            .await
            .unwrap();
        assert!(!failing.send_reset_email("ada@example.com").await);
    }

    #[tokio::test]
    async fn refresh_rotates_tokens() {
        let auth = authenticator(Arc::default());
        let identity = auth
            .register("ada@example.com", "password1", None)
            .await
            .unwrap();
        let first = auth.issue_tokens(&identity).await.unwrap();
        assert_eq!(auth.verify(&first.access_token), Some(identity.clone()));

        let (same, second) = auth.refresh(&first.refresh_token).await.unwrap();
        assert_eq!(same, identity);
        assert_ne!(first.refresh_token, second.refresh_token);
        assert!(matches!(
            auth.refresh(&first.refresh_token).await,
            Err(AuthError::TokenError(_))
        ));

        auth.logout(Some(&second.refresh_token)).await.unwrap();
        assert!(auth.refresh(&second.refresh_token).await.is_err());
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn log_mailer_never_writes_the_token() {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let auth = Authenticator::new(
            Arc::new(MemoryRepository::new()),
            Arc::new(LogMailer),
            b"test-secret",
        );
        auth.register("ada@example.com", "password1", None)
            .await
            .unwrap();
        let token = "s3cr3t-reset-token-value";
        LogMailer.send_reset("ada@example.com", token).await.unwrap();
        assert!(auth.send_reset_email("ada@example.com").await);

        let logged = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("password reset requested"));
        assert!(!logged.contains(token));
    }
}
