use crate::config::Config;
use crate::error::AppError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents the claims encoded within a session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject of the token: the user's id.
    pub sub: Uuid,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// Unique token id, so two tokens issued in the same second never collide.
    pub jti: Uuid,
}

/// Signing and verification keys derived from the configured secret.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.jwt_secret, config.token_ttl_hours)
    }

    /// Signs a fresh token for `user_id`.
    ///
    /// The token is not a session until it has been stored in the user's token list.
    pub fn issue(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: Uuid::new_v4(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Checks the signature and expiry of `token` and returns its claims.
    ///
    /// Any failure is reported as `AppError::Unauthorized`.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_generation_and_verification() {
        let keys = TokenKeys::new("test_secret_for_gen_verify", 1);
        let user_id = Uuid::new_v4();
        let token = keys.issue(user_id).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, user_id);
    }

    #[test]
    fn test_tokens_are_distinct() {
        let keys = TokenKeys::new("test_secret", 1);
        let user_id = Uuid::new_v4();
        assert_ne!(keys.issue(user_id).unwrap(), keys.issue(user_id).unwrap());
    }

    #[test]
    fn test_token_expiration() {
        let keys = TokenKeys::new("test_secret_for_expiration", 1);
        let issued = Utc::now() - Duration::hours(3);
        let claims_expired = Claims {
            sub: Uuid::new_v4(),
            iat: issued.timestamp(),
            exp: (issued + Duration::hours(1)).timestamp(),
            jti: Uuid::new_v4(),
        };
        let expired_token = encode(
            &Header::default(),
            &claims_expired,
            &EncodingKey::from_secret("test_secret_for_expiration".as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            keys.verify(&expired_token),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_invalid_token_signature() {
        let signer = TokenKeys::new("one_secret", 1);
        let verifier = TokenKeys::new("a_completely_different_secret", 1);
        let token = signer.issue(Uuid::new_v4()).unwrap();

        assert!(matches!(verifier.verify(&token), Err(AppError::Unauthorized)));
        assert!(matches!(
            verifier.verify("not.a.token"),
            Err(AppError::Unauthorized)
        ));
    }
}
