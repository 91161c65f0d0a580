//! JWT issuing and verification.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtSettings;
use crate::domain::User;

/// Purpose of a token. Access tokens authenticate requests; reset tokens
/// only authorize a single password reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Reset,
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub uuid: Uuid,
    pub username: String,
    pub name: String,
    pub email: String,
    pub kind: TokenKind,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, JwtError> {
        self.sub.parse().map_err(|_| JwtError::Invalid)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Token expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,

    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// HS256 signer/verifier built once from settings.
#[derive(Clone)]
pub struct JwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    reset_ttl: Duration,
}

impl JwtCodec {
    pub fn new(settings: &JwtSettings) -> Self {
        Self {
            encoding: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding: DecodingKey::from_secret(settings.secret.as_bytes()),
            access_ttl: Duration::minutes(settings.access_token_expiry_minutes),
            reset_ttl: Duration::minutes(settings.reset_token_expiry_minutes),
        }
    }

    /// Access token lifetime in seconds
    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    pub fn issue_access(&self, user: &User) -> Result<String, JwtError> {
        self.issue(user, TokenKind::Access, self.access_ttl)
    }

    pub fn issue_reset(&self, user: &User) -> Result<String, JwtError> {
        self.issue(user, TokenKind::Reset, self.reset_ttl)
    }

    fn issue(&self, user: &User, kind: TokenKind, ttl: Duration) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            uuid: user.uuid,
            username: user.username.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| JwtError::Signing(e.to_string()))
    }

    /// Decode a token and require it to be of `kind`.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, JwtError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default()).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid,
            },
        )?;

        if data.claims.kind != kind {
            return Err(JwtError::Invalid);
        }
        Ok(data.claims)
    }
}

impl std::fmt::Debug for JwtCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtCodec")
            .field("access_ttl", &self.access_ttl)
            .field("reset_ttl", &self.reset_ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(access_minutes: i64) -> JwtCodec {
        JwtCodec::new(&JwtSettings {
            secret: "test-secret-that-is-long-enough-for-hs256".into(),
            access_token_expiry_minutes: access_minutes,
            reset_token_expiry_minutes: 15,
        })
    }

    fn user() -> User {
        let now = Utc::now();
        User {
            id: 42,
            uuid: Uuid::new_v4(),
            name: "Grace Hopper".into(),
            username: "grace".into(),
            email: "grace@example.com".into(),
            password_hash: String::new(),
            reset_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_access_token_carries_identity() {
        let codec = codec(60);
        let user = user();
        let token = codec.issue_access(&user).unwrap();
        let claims = codec.verify(&token, TokenKind::Access).unwrap();

        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.uuid, user.uuid);
        assert_eq!(claims.username, "grace");
        assert_eq!(claims.name, "Grace Hopper");
        assert_eq!(claims.email, "grace@example.com");
    }

    #[test]
    fn test_kinds_are_not_interchangeable() {
        let codec = codec(60);
        let user = user();
        let reset = codec.issue_reset(&user).unwrap();
        let access = codec.issue_access(&user).unwrap();

        assert!(matches!(codec.verify(&reset, TokenKind::Access), Err(JwtError::Invalid)));
        assert!(matches!(codec.verify(&access, TokenKind::Reset), Err(JwtError::Invalid)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        // Past the default 60s leeway.
        let codec = codec(-5);
        let token = codec.issue_access(&user()).unwrap();
        assert!(matches!(codec.verify(&token, TokenKind::Access), Err(JwtError::Expired)));
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let codec = codec(60);
        let token = codec.issue_access(&user()).unwrap();
        let other = JwtCodec::new(&JwtSettings {
            secret: "a-completely-different-secret-value-123".into(),
            access_token_expiry_minutes: 60,
            reset_token_expiry_minutes: 15,
        });
        assert!(matches!(other.verify(&token, TokenKind::Access), Err(JwtError::Invalid)));
    }
}
