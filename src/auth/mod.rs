pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;
pub mod verifier;

use serde::{Deserialize, Serialize};

use crate::models::User;

// Re-export necessary items
pub use extractors::AuthenticatedUser;
pub use middleware::AuthMiddleware;
pub use password::PasswordHasher;
pub use token::{Claims, TokenKeys};
pub use verifier::TokenVerifier;

/// Represents the payload for a user login request.
///
/// Missing fields deserialize as empty strings so that they fail the same way a
/// wrong password does.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Response structure after successful registration or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// Public projection of the authenticated user.
    pub user: User,
    /// The newly issued session token.
    pub token: String,
}
