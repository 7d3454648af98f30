//! Session tokens: HS256 JWTs carrying the user id, email and role.
//!
//! The role claim is informational only; admin checks always reload the
//! user row.

use crate::errors::Result;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// JWT claims of a storefront session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub sub: String,
    pub email: String,
    pub role: String,
    /// Issued at (Unix timestamp seconds)
    pub iat: i64,
    /// Expiration (Unix timestamp seconds)
    pub exp: i64,
}

/// Creates a signed session token valid for `lifetime_hours`.
pub fn create_token(
    user_id: &str,
    email: &str,
    role: &str,
    secret: &str,
    lifetime_hours: i64,
) -> Result<String> {
    let now = chrono::Utc::now();
    let claims = SessionClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role: role.to_string(),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::hours(lifetime_hours)).timestamp(),
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(Into::into)
}

/// Verifies a token's signature and expiry and returns its claims.
pub fn verify_token(token: &str, secret: &str) -> Result<SessionClaims> {
    let data = jsonwebtoken::decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;

    #[test]
    fn test_round_trip_claims() -> Result<()> {
        let token = create_token("u-1", "jane@example.com", "user", "secret", 24)?;
        let claims = verify_token(&token, "secret")?;
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.role, "user");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
        Ok(())
    }

    #[test]
    fn test_wrong_secret_rejected() -> Result<()> {
        let token = create_token("u-1", "jane@example.com", "user", "secret", 24)?;
        assert!(matches!(
            verify_token(&token, "other"),
            Err(Error::Token(_))
        ));
        assert!(verify_token("garbage", "secret").is_err());
        Ok(())
    }

    #[test]
    fn test_expired_token_rejected() -> Result<()> {
        // Past the default 60s leeway
        let token = create_token("u-1", "jane@example.com", "user", "secret", -1)?;
        assert!(verify_token(&token, "secret").is_err());
        Ok(())
    }
}
