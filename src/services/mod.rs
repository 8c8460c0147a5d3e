//! Business operations behind the HTTP routes.
//!
//! Each step that a document store would normally run as a lifecycle hook
//! (hash on save, cascade on delete, notify on create) is an explicit call here.

pub mod avatar;
pub mod tasks;
pub mod users;

use serde_json::{Map, Value};

use crate::error::AppError;

pub use tasks::TaskService;
pub use users::UserService;

pub const INVALID_UPDATES_MESSAGE: &str = "Invalid Updates!";

/// Rejects the whole update if `body` has any key outside `allowed`.
pub fn check_updates(body: &Map<String, Value>, allowed: &[&str]) -> Result<(), AppError> {
    if body.keys().all(|key| allowed.contains(&key.as_str())) {
        Ok(())
    } else {
        Err(AppError::BadRequest(INVALID_UPDATES_MESSAGE.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_check_updates() {
        let allowed = ["description", "completed"];
        assert!(check_updates(&object(json!({})), &allowed).is_ok());
        assert!(check_updates(&object(json!({ "completed": true })), &allowed).is_ok());
        assert!(matches!(
            check_updates(&object(json!({ "completed": true, "owner": "x" })), &allowed),
            Err(AppError::BadRequest(msg)) if msg == INVALID_UPDATES_MESSAGE
        ));
    }
}
