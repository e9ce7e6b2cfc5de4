//! Bearer token issuing and verification (HS256 JWT).

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use storage::{User, UserId};

use crate::error::{DomainError, Result};

/// Claims carried by every issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Decimal user id.
    pub sub: String,
    pub username: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<UserId> {
        self.sub
            .parse::<i64>()
            .map(UserId::new)
            .map_err(|_| DomainError::unauthorized("invalid token subject"))
    }
}

/// Signs and verifies tokens with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Issues a token for `user` expiring after the configured lifetime.
    pub fn issue(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            exp: (now + self.ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| DomainError::Crypto(format!("token signing failed: {e}")))
    }

    /// Verifies signature and expiry and returns the claims.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                DomainError::unauthorized("invalid or expired token")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: UserId::new(7),
            name: "Ada".to_string(),
            username: "ada".to_string(),
            password_hash: "hash".to_string(),
            email: "ada@example.com".to_string(),
            address: "Somewhere".to_string(),
            joined_at: Utc::now(),
        }
    }

    #[test]
    fn issued_token_verifies() {
        let issuer = TokenIssuer::new(b"secret", Duration::hours(1));
        let token = issuer.issue(&user()).unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), UserId::new(7));
        assert_eq!(claims.username, "ada");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = TokenIssuer::new(b"secret", Duration::hours(1))
            .issue(&user())
            .unwrap();
        let other = TokenIssuer::new(b"other", Duration::hours(1));
        assert!(matches!(
            other.verify(&token),
            Err(DomainError::Unauthorized(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = TokenIssuer::new(b"secret", Duration::hours(-2));
        let token = issuer.issue(&user()).unwrap();
        assert!(issuer.verify(&token).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let issuer = TokenIssuer::new(b"secret", Duration::hours(1));
        assert!(issuer.verify("not.a.token").is_err());
    }
}
