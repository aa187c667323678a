//! Bearer-token plumbing: claims, issuing, and verification.
//!
//! Tokens are HS256 JWTs whose subject is the account id. The secret and
//! lifetime come from configuration built once at startup and passed into
//! the services by value.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use quill_core::{defaults::DEFAULT_TOKEN_TTL_SECS, Error, Result};

/// Token signing configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret for signing and verifying tokens.
    pub jwt_secret: String,
    /// Issued-token lifetime in seconds.
    pub token_ttl_secs: u64,
}

impl AuthConfig {
    pub fn new(jwt_secret: String) -> Self {
        Self {
            jwt_secret,
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
        }
    }

    pub fn token_ttl_secs(mut self, ttl: u64) -> Self {
        self.token_ttl_secs = ttl;
        self
    }
}

/// JWT claims carried by an access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Account id the token was issued to.
    pub sub: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
}

/// Issue a signed access token for the account.
pub fn issue_token(account_id: i64, config: &AuthConfig) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: account_id,
        exp: (now + Duration::seconds(config.token_ttl_secs as i64)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("token signing failed: {}", e)))
}

/// Verify a token and return the account id it was issued to.
///
/// Expired, malformed, or wrongly-signed tokens all collapse into
/// [`Error::Unauthorized`].
pub fn decode_token(token: &str, config: &AuthConfig) -> Result<i64> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| Error::Unauthorized("invalid or expired token".to_string()))?;

    Ok(data.claims.sub)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig::new("test-secret".to_string())
    }

    #[test]
    fn test_issue_and_decode_roundtrip() {
        let cfg = config();
        let token = issue_token(42, &cfg).unwrap();
        assert_eq!(decode_token(&token, &cfg).unwrap(), 42);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_token(42, &config()).unwrap();
        let other = AuthConfig::new("other-secret".to_string());
        let err = decode_token(&token, &other).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Issue a token that expired an hour ago by crafting claims
        // directly.
        let cfg = config();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: 42,
            exp: now - 3600,
            iat: now - 7200,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
        )
        .unwrap();

        let err = decode_token(&token, &cfg).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let err = decode_token("not-a-token", &config()).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }
}
