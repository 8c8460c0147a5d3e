use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::models::task::UPDATABLE_FIELDS;
use crate::models::{Task, TaskInput, TaskListQuery, TaskPatch};
use crate::services::check_updates;
use crate::store::Store;

pub const TASK_NOT_FOUND_MESSAGE: &str = "Task Not Found!";

/// Task operations, always scoped to the calling owner.
///
/// A task that exists but belongs to someone else is indistinguishable from one
/// that does not exist.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn Store>,
}

fn not_found() -> AppError {
    AppError::NotFound(TASK_NOT_FOUND_MESSAGE.into())
}

fn parse_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| not_found())
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, owner: Uuid, input: TaskInput) -> Result<Task, AppError> {
        let input = input.normalized();
        input.validate()?;

        let task = Task::new(input, owner);
        self.store.insert_task(&task).await?;
        log::info!("user {} created task {}", owner, task.id);
        Ok(task)
    }

    pub async fn list(&self, owner: Uuid, query: &TaskListQuery) -> Result<Vec<Task>, AppError> {
        self.store.list_tasks(owner, query).await
    }

    pub async fn get(&self, owner: Uuid, id: &str) -> Result<Task, AppError> {
        let id = parse_id(id)?;
        self.store.find_task(id, owner).await?.ok_or_else(not_found)
    }

    /// Applies a whitelisted update: only `description` and `completed` may appear.
    pub async fn update(
        &self,
        owner: Uuid,
        id: &str,
        body: Map<String, Value>,
    ) -> Result<Task, AppError> {
        check_updates(&body, &UPDATABLE_FIELDS)?;
        let patch: TaskPatch = serde_json::from_value(Value::Object(body))?;

        let mut task = self.get(owner, id).await?;

        let patch = patch.normalized();
        patch.validate()?;
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(completed) = patch.completed {
            task.completed = completed;
        }
        task.updated_at = Utc::now();

        self.store.update_task(&task).await?;
        log::info!("user {} updated task {}", owner, task.id);
        Ok(task)
    }

    pub async fn delete(&self, owner: Uuid, id: &str) -> Result<Task, AppError> {
        let id = parse_id(id)?;
        let task = self.store.delete_task(id, owner).await?.ok_or_else(not_found)?;
        log::info!("user {} deleted task {}", owner, task.id);
        Ok(task)
    }
}
