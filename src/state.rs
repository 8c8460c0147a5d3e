use std::sync::Arc;

use crate::auth::{PasswordHasher, TokenKeys, TokenVerifier};
use crate::config::Config;
use crate::notifications::Mailer;
use crate::services::{TaskService, UserService};
use crate::store::Store;

/// Everything a request handler needs, built once at startup and shared through
/// `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
    pub tasks: TaskService,
    pub verifier: TokenVerifier,
}

impl AppState {
    pub fn new(config: &Config, store: Arc<dyn Store>, mailer: Arc<dyn Mailer>) -> Self {
        let keys = TokenKeys::from_config(config);
        Self {
            users: UserService::new(
                Arc::clone(&store),
                mailer,
                keys.clone(),
                PasswordHasher::new(config.bcrypt_cost),
            ),
            tasks: TaskService::new(Arc::clone(&store)),
            verifier: TokenVerifier::new(keys, store),
        }
    }
}
