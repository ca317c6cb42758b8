//! Authentication domain models.

use serde::{Deserialize, Serialize};

/// Signed-in user as seen by the chat core.
///
/// The id is opaque: stores use it only as a scoping key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
}

/// Identity with password hash (for internal auth flows).
#[derive(Debug, Clone)]
pub struct IdentityWithPassword {
    pub identity: Identity,
    pub password_hash: Option<String>,
}

/// JWT claims embedded in access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject — user ID (standard JWT `sub` claim).
    pub sub: String,
    /// User email.
    pub email: String,
    /// Display name, if the user set one at registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
}

impl TokenClaims {
    /// Identity carried by these claims.
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.sub.clone(),
            email: self.email.clone(),
            display_name: self.name.clone(),
        }
    }
}
