use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AuthResponse, LoginRequest, PasswordHasher, TokenKeys};
use crate::error::AppError;
use crate::models::user::{normalize_email, DUPLICATE_EMAIL_MESSAGE, UPDATABLE_FIELDS};
use crate::models::{User, UserInput, UserPatch};
use crate::notifications::{dispatch, farewell_email, welcome_email, Mailer};
use crate::services::check_updates;
use crate::store::Store;

pub const LOGIN_FAILED_MESSAGE: &str = "Unable to login!";
pub const AVATAR_UNAVAILABLE_MESSAGE: &str = "Couldn't fetch user avatar...";

/// Account lifecycle: registration, sessions, profile and avatar.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    tokens: TokenKeys,
    passwords: PasswordHasher,
}

impl UserService {
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        tokens: TokenKeys,
        passwords: PasswordHasher,
    ) -> Self {
        Self {
            store,
            mailer,
            tokens,
            passwords,
        }
    }

    /// Creates an account, sends the welcome email and opens a first session.
    pub async fn register(&self, input: UserInput) -> Result<AuthResponse, AppError> {
        let input = input.normalized();
        input.validate()?;

        if self.store.find_user_by_email(&input.email).await?.is_some() {
            log::info!("registration refused: email already in use");
            return Err(AppError::Conflict(DUPLICATE_EMAIL_MESSAGE.into()));
        }

        let password_hash = self.passwords.hash(&input.password)?;
        let mut user = User::new(input, password_hash);
        self.store.insert_user(&user).await?;
        log::info!("registered user {}", user.id);

        dispatch(Arc::clone(&self.mailer), welcome_email(&user));

        let token = self.open_session(&mut user).await?;
        Ok(AuthResponse { user, token })
    }

    /// Checks credentials and opens an additional session.
    ///
    /// Unknown email and wrong password produce the same error.
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AppError> {
        let email = normalize_email(&request.email);
        let mut user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or_else(login_failed)?;

        match self.passwords.verify(&request.password, &user.password_hash) {
            Ok(true) => {}
            Ok(false) => return Err(login_failed()),
            Err(err) => {
                log::warn!("password check failed for user {}: {}", user.id, err);
                return Err(login_failed());
            }
        }

        let token = self.open_session(&mut user).await?;
        log::info!("user {} logged in", user.id);
        Ok(AuthResponse { user, token })
    }

    /// Ends the session identified by `token`; other sessions stay valid.
    pub async fn logout(&self, user: &User, token: &str) -> Result<(), AppError> {
        self.store.remove_token(user.id, token).await?;
        log::info!("user {} logged out", user.id);
        Ok(())
    }

    /// Ends every session of `user`.
    pub async fn logout_all(&self, user: &User) -> Result<(), AppError> {
        self.store.clear_tokens(user.id).await?;
        log::info!("user {} logged out of all sessions", user.id);
        Ok(())
    }

    /// Applies a whitelisted profile update.
    ///
    /// Any key outside name/age/email/password rejects the whole request.
    pub async fn update_profile(
        &self,
        mut user: User,
        body: Map<String, Value>,
    ) -> Result<User, AppError> {
        check_updates(&body, &UPDATABLE_FIELDS)?;
        let patch: UserPatch = serde_json::from_value(Value::Object(body))?;
        let patch = patch.normalized();
        patch.validate()?;

        if let Some(email) = patch.email {
            if email != user.email {
                if let Some(other) = self.store.find_user_by_email(&email).await? {
                    if other.id != user.id {
                        return Err(AppError::Conflict(DUPLICATE_EMAIL_MESSAGE.into()));
                    }
                }
            }
            user.email = email;
        }
        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(age) = patch.age {
            user.age = age;
        }
        if let Some(password) = patch.password {
            user.password_hash = self.passwords.hash(&password)?;
        }
        user.updated_at = Utc::now();

        self.store.update_profile(&user).await?;
        log::info!("user {} updated their profile", user.id);
        Ok(user)
    }

    /// Deletes the account and every task it owns, then sends the farewell email.
    pub async fn delete_account(&self, user: User) -> Result<User, AppError> {
        let removed_tasks = self.store.delete_tasks_by_owner(user.id).await?;
        self.store.delete_user(user.id).await?;
        log::info!("deleted user {} and {} tasks", user.id, removed_tasks);

        dispatch(Arc::clone(&self.mailer), farewell_email(&user));
        Ok(user)
    }

    /// Stores an already-rendered PNG avatar.
    pub async fn set_avatar(&self, user: &User, png: Vec<u8>) -> Result<(), AppError> {
        self.store.set_avatar(user.id, Some(png)).await?;
        log::info!("user {} uploaded an avatar", user.id);
        Ok(())
    }

    pub async fn clear_avatar(&self, user: &User) -> Result<(), AppError> {
        self.store.set_avatar(user.id, None).await
    }

    /// Fetches the PNG avatar of any user. Unknown ids and missing avatars are
    /// both reported as a bad request.
    pub async fn avatar(&self, user_id: &str) -> Result<Vec<u8>, AppError> {
        let unavailable = || AppError::BadRequest(AVATAR_UNAVAILABLE_MESSAGE.into());
        let id = Uuid::parse_str(user_id).map_err(|_| unavailable())?;

        self.store
            .find_user(id)
            .await?
            .and_then(|user| user.avatar)
            .ok_or_else(unavailable)
    }

    async fn open_session(&self, user: &mut User) -> Result<String, AppError> {
        let token = self.tokens.issue(user.id)?;
        self.store.push_token(user.id, &token).await?;
        user.tokens.push(token.clone());
        Ok(token)
    }
}

fn login_failed() -> AppError {
    AppError::BadRequest(LOGIN_FAILED_MESSAGE.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::LogMailer;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn service() -> (UserService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = UserService::new(
            store.clone(),
            Arc::new(LogMailer),
            TokenKeys::new("user-service-secret", 1),
            PasswordHasher::new(4),
        );
        (service, store)
    }

    fn input(email: &str) -> UserInput {
        UserInput {
            name: " Ada ".into(),
            age: 36,
            email: email.into(),
            password: "analytical1".into(),
        }
    }

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[actix_rt::test]
    async fn test_register_normalizes_and_opens_session() {
        let (service, store) = service();
        let response = service.register(input(" Ada@Example.com ")).await.unwrap();

        assert_eq!(response.user.name, "Ada");
        assert_eq!(response.user.email, "ada@example.com");
        let stored = store.find_user(response.user.id).await.unwrap().unwrap();
        assert_eq!(stored.tokens, vec![response.token]);
        assert_ne!(stored.password_hash, "analytical1");
    }

    #[actix_rt::test]
    async fn test_register_rejects_duplicate_email() {
        let (service, _) = service();
        service.register(input("ada@example.com")).await.unwrap();
        let err = service.register(input("ADA@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(msg) if msg == DUPLICATE_EMAIL_MESSAGE));
    }

    #[actix_rt::test]
    async fn test_login_failures_are_indistinguishable() {
        let (service, _) = service();
        service.register(input("ada@example.com")).await.unwrap();

        let wrong_password = service
            .login(LoginRequest {
                email: "ada@example.com".into(),
                password: "nope1234".into(),
            })
            .await
            .unwrap_err();
        let unknown_email = service
            .login(LoginRequest {
                email: "nobody@example.com".into(),
                password: "analytical1".into(),
            })
            .await
            .unwrap_err();

        assert_eq!(wrong_password.client_message(), LOGIN_FAILED_MESSAGE);
        assert_eq!(unknown_email.client_message(), LOGIN_FAILED_MESSAGE);
    }

    #[actix_rt::test]
    async fn test_update_profile_rehashes_password() {
        let (service, store) = service();
        let registered = service.register(input("ada@example.com")).await.unwrap();
        let old_hash = store
            .find_user(registered.user.id)
            .await
            .unwrap()
            .unwrap()
            .password_hash;

        let updated = service
            .update_profile(registered.user, body(json!({ "password": "engine4242" })))
            .await
            .unwrap();
        assert_ne!(updated.password_hash, old_hash);
        assert!(PasswordHasher::new(4)
            .verify("engine4242", &updated.password_hash)
            .unwrap());
    }

    #[actix_rt::test]
    async fn test_update_profile_rejects_unknown_fields_without_applying() {
        let (service, store) = service();
        let registered = service.register(input("ada@example.com")).await.unwrap();
        let user_id = registered.user.id;

        let err = service
            .update_profile(
                registered.user,
                body(json!({ "name": "Countess", "tokens": [] })),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let stored = store.find_user(user_id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Ada");
    }

    #[actix_rt::test]
    async fn test_avatar_lookup_failures() {
        let (service, _) = service();
        let registered = service.register(input("ada@example.com")).await.unwrap();

        for id in [
            "not-a-uuid".to_string(),
            Uuid::new_v4().to_string(),
            registered.user.id.to_string(),
        ] {
            let err = service.avatar(&id).await.unwrap_err();
            assert_eq!(err.client_message(), AVATAR_UNAVAILABLE_MESSAGE);
        }

        service
            .set_avatar(&registered.user, vec![0x89, b'P', b'N', b'G'])
            .await
            .unwrap();
        let png = service.avatar(&registered.user.id.to_string()).await.unwrap();
        assert_eq!(png, vec![0x89, b'P', b'N', b'G']);
    }
}
