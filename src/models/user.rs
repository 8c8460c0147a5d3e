use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Message returned when a registration or profile update hits an email that is taken.
pub const DUPLICATE_EMAIL_MESSAGE: &str = "A user with this email already exists";

/// The only keys a profile PATCH body may contain.
pub const UPDATABLE_FIELDS: [&str; 4] = ["name", "age", "email", "password"];

const MIN_PASSWORD_CHARS: usize = 7;

/// A registered account as persisted by the store.
///
/// Serializing a `User` yields its public projection: the password hash, the
/// session token list and the avatar bytes are never written out.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub age: i32,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Active session tokens, oldest first.
    #[serde(skip_serializing)]
    pub tokens: Vec<String>,
    /// PNG-encoded 300x300 avatar.
    #[serde(skip_serializing)]
    pub avatar: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Builds a new account from already-validated input and a password hash.
    pub fn new(input: UserInput, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            age: input.age,
            email: input.email,
            password_hash,
            tokens: Vec::new(),
            avatar: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Registration payload.
#[derive(Debug, Deserialize, Validate)]
pub struct UserInput {
    #[validate(length(min = 1, message = "Name cannot be an empty string!"))]
    pub name: String,
    #[serde(default)]
    #[validate(range(min = 0, message = "Age must be a positive number"))]
    pub age: i32,
    #[validate(email(message = "Email must be valid!"))]
    pub email: String,
    #[validate(custom = "validate_password")]
    pub password: String,
}

impl UserInput {
    /// Trims every string field and lower-cases the email, as stored.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            age: self.age,
            email: normalize_email(&self.email),
            password: self.password.trim().to_string(),
        }
    }
}

/// Profile update payload. Every field is optional; absent fields are left alone.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UserPatch {
    #[validate(length(min = 1, message = "Name cannot be an empty string!"))]
    pub name: Option<String>,
    #[validate(range(min = 0, message = "Age must be a positive number"))]
    pub age: Option<i32>,
    #[validate(email(message = "Email must be valid!"))]
    pub email: Option<String>,
    #[validate(custom = "validate_password")]
    pub password: Option<String>,
}

impl UserPatch {
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.map(|name| name.trim().to_string()),
            age: self.age,
            email: self.email.as_deref().map(normalize_email),
            password: self.password.map(|password| password.trim().to_string()),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Passwords must be at least seven characters and must not contain "password".
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.to_lowercase().contains("password") {
        let mut err = ValidationError::new("password_contains_password");
        err.message = Some("Password cannot contain string 'password'".into());
        return Err(err);
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        let mut err = ValidationError::new("password_too_short");
        err.message = Some("Password must be at least 7 characters".into());
        return Err(err);
    }
    Ok(())
}
