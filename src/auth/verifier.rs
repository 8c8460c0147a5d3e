use std::sync::Arc;

use crate::auth::extractors::AuthenticatedUser;
use crate::auth::token::TokenKeys;
use crate::error::AppError;
use crate::store::Store;

/// Resolves a bearer token to the user it belongs to.
///
/// A token is accepted only if its signature and expiry check out, the user it
/// names still exists, and the token is still present in that user's token list.
/// The last check is what makes logout effective for tokens that are otherwise
/// still valid.
#[derive(Clone)]
pub struct TokenVerifier {
    keys: TokenKeys,
    store: Arc<dyn Store>,
}

impl TokenVerifier {
    pub fn new(keys: TokenKeys, store: Arc<dyn Store>) -> Self {
        Self { keys, store }
    }

    pub async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let claims = self.keys.verify(token)?;

        let user = self
            .store
            .find_user(claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !user.tokens.iter().any(|stored| stored == token) {
            log::debug!("token for user {} is not an active session", user.id);
            return Err(AppError::Unauthorized);
        }

        Ok(AuthenticatedUser {
            user,
            token: token.to_string(),
        })
    }
}
