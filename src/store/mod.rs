//! Persistence for users and tasks.
//!
//! Handlers and services only see the `Store` trait. `PgStore` is the production
//! backend; `MemoryStore` keeps everything in process and is what the test suite
//! and database-less development runs use. Both enforce the same rules: emails are
//! unique, and every task lookup is scoped to its owner.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Task, TaskListQuery, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    /// Inserts a new user. Fails with `AppError::Conflict` if the email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Writes back name, age, email, password hash and `updated_at`.
    async fn update_profile(&self, user: &User) -> Result<(), AppError>;

    /// Appends a session token to the user's list.
    async fn push_token(&self, user_id: Uuid, token: &str) -> Result<(), AppError>;

    /// Removes every occurrence of `token` from the user's list.
    async fn remove_token(&self, user_id: Uuid, token: &str) -> Result<(), AppError>;

    async fn clear_tokens(&self, user_id: Uuid) -> Result<(), AppError>;

    async fn set_avatar(&self, user_id: Uuid, avatar: Option<Vec<u8>>) -> Result<(), AppError>;

    /// Deletes the user row only. Owned tasks are removed separately.
    async fn delete_user(&self, user_id: Uuid) -> Result<bool, AppError>;

    async fn insert_task(&self, task: &Task) -> Result<(), AppError>;

    async fn find_task(&self, id: Uuid, owner: Uuid) -> Result<Option<Task>, AppError>;

    async fn list_tasks(&self, owner: Uuid, query: &TaskListQuery)
        -> Result<Vec<Task>, AppError>;

    /// Writes back description, completed and `updated_at` of an owned task.
    async fn update_task(&self, task: &Task) -> Result<(), AppError>;

    async fn delete_task(&self, id: Uuid, owner: Uuid) -> Result<Option<Task>, AppError>;

    async fn delete_tasks_by_owner(&self, owner: Uuid) -> Result<u64, AppError>;
}
