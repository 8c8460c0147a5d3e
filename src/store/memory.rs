//! In-process store backed by `RwLock`-guarded collections.

use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

use super::Store;
use crate::error::AppError;
use crate::models::task::SortField;
use crate::models::user::DUPLICATE_EMAIL_MESSAGE;
use crate::models::{Task, TaskListQuery, User};

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    /// Kept in insertion order, which is the listing order when no sort is given.
    tasks: RwLock<Vec<Task>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_user<F>(&self, user_id: Uuid, apply: F)
    where
        F: FnOnce(&mut User),
    {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(user) = users.get_mut(&user_id) {
            apply(user);
            user.updated_at = Utc::now();
        }
    }
}

fn compare(a: &Task, b: &Task, field: SortField) -> Ordering {
    match field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::Description => a.description.cmp(&b.description),
        SortField::Completed => a.completed.cmp(&b.completed),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        if users.values().any(|existing| existing.email == user.email) {
            return Err(AppError::Conflict(DUPLICATE_EMAIL_MESSAGE.into()));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        Ok(users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        Ok(users.values().find(|user| user.email == email).cloned())
    }

    async fn update_profile(&self, user: &User) -> Result<(), AppError> {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        if users
            .values()
            .any(|other| other.id != user.id && other.email == user.email)
        {
            return Err(AppError::Conflict(DUPLICATE_EMAIL_MESSAGE.into()));
        }
        if let Some(stored) = users.get_mut(&user.id) {
            stored.name = user.name.clone();
            stored.age = user.age;
            stored.email = user.email.clone();
            stored.password_hash = user.password_hash.clone();
            stored.updated_at = user.updated_at;
        }
        Ok(())
    }

    async fn push_token(&self, user_id: Uuid, token: &str) -> Result<(), AppError> {
        self.with_user(user_id, |user| user.tokens.push(token.to_string()));
        Ok(())
    }

    async fn remove_token(&self, user_id: Uuid, token: &str) -> Result<(), AppError> {
        self.with_user(user_id, |user| user.tokens.retain(|t| t != token));
        Ok(())
    }

    async fn clear_tokens(&self, user_id: Uuid) -> Result<(), AppError> {
        self.with_user(user_id, |user| user.tokens.clear());
        Ok(())
    }

    async fn set_avatar(&self, user_id: Uuid, avatar: Option<Vec<u8>>) -> Result<(), AppError> {
        self.with_user(user_id, |user| user.avatar = avatar);
        Ok(())
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<bool, AppError> {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        Ok(users.remove(&user_id).is_some())
    }

    async fn insert_task(&self, task: &Task) -> Result<(), AppError> {
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        tasks.push(task.clone());
        Ok(())
    }

    async fn find_task(&self, id: Uuid, owner: Uuid) -> Result<Option<Task>, AppError> {
        let tasks = self.tasks.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tasks
            .iter()
            .find(|task| task.id == id && task.owner == owner)
            .cloned())
    }

    async fn list_tasks(
        &self,
        owner: Uuid,
        query: &TaskListQuery,
    ) -> Result<Vec<Task>, AppError> {
        let tasks = self.tasks.read().unwrap_or_else(PoisonError::into_inner);
        let mut matching: Vec<Task> = tasks
            .iter()
            .filter(|task| task.owner == owner)
            .filter(|task| query.completed.map_or(true, |c| task.completed == c))
            .cloned()
            .collect();

        if let Some(sort) = query.sort {
            // Stable, so ties keep creation order.
            matching.sort_by(|a, b| {
                let ordering = compare(a, b, sort.field);
                if sort.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        let page = matching.into_iter().skip(query.skip as usize);
        Ok(match query.limit {
            Some(limit) => page.take(limit as usize).collect(),
            None => page.collect(),
        })
    }

    async fn update_task(&self, task: &Task) -> Result<(), AppError> {
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(stored) = tasks
            .iter_mut()
            .find(|stored| stored.id == task.id && stored.owner == task.owner)
        {
            stored.description = task.description.clone();
            stored.completed = task.completed;
            stored.updated_at = task.updated_at;
        }
        Ok(())
    }

    async fn delete_task(&self, id: Uuid, owner: Uuid) -> Result<Option<Task>, AppError> {
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        let position = tasks
            .iter()
            .position(|task| task.id == id && task.owner == owner);
        Ok(position.map(|index| tasks.remove(index)))
    }

    async fn delete_tasks_by_owner(&self, owner: Uuid) -> Result<u64, AppError> {
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        let before = tasks.len();
        tasks.retain(|task| task.owner != owner);
        Ok((before - tasks.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{TaskSort, DEFAULT_LIMIT};
    use crate::models::{TaskInput, UserInput};
    use chrono::Duration;

    fn user(email: &str) -> User {
        User::new(
            UserInput {
                name: "Test".into(),
                age: 0,
                email: email.into(),
                password: "unused1".into(),
            },
            "hash".into(),
        )
    }

    fn task(owner: Uuid, description: &str, completed: bool, minutes: i64) -> Task {
        let mut task = Task::new(
            TaskInput {
                description: description.into(),
                completed,
            },
            owner,
        );
        task.created_at = task.created_at + Duration::minutes(minutes);
        task
    }

    #[actix_rt::test]
    async fn test_duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        store.insert_user(&user("a@example.com")).await.unwrap();
        let err = store.insert_user(&user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[actix_rt::test]
    async fn test_token_list_operations() {
        let store = MemoryStore::new();
        let u = user("tokens@example.com");
        store.insert_user(&u).await.unwrap();

        store.push_token(u.id, "one").await.unwrap();
        store.push_token(u.id, "two").await.unwrap();
        store.remove_token(u.id, "one").await.unwrap();
        let stored = store.find_user(u.id).await.unwrap().unwrap();
        assert_eq!(stored.tokens, vec!["two".to_string()]);

        store.clear_tokens(u.id).await.unwrap();
        let stored = store.find_user(u.id).await.unwrap().unwrap();
        assert!(stored.tokens.is_empty());
    }

    #[actix_rt::test]
    async fn test_listing_is_owner_scoped_sorted_and_paged() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        for i in 0..12 {
            store
                .insert_task(&task(owner, &format!("task {:02}", i), i % 2 == 0, i))
                .await
                .unwrap();
        }
        store
            .insert_task(&task(other, "foreign", false, 0))
            .await
            .unwrap();

        let all = store
            .list_tasks(owner, &TaskListQuery::default())
            .await
            .unwrap();
        assert_eq!(all.len(), DEFAULT_LIMIT as usize);
        assert!(all.iter().all(|t| t.owner == owner));

        let query = TaskListQuery {
            completed: None,
            limit: Some(5),
            skip: 5,
            sort: Some(TaskSort {
                field: SortField::CreatedAt,
                descending: true,
            }),
        };
        let page = store.list_tasks(owner, &query).await.unwrap();
        let names: Vec<_> = page.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(names, vec!["task 06", "task 05", "task 04", "task 03", "task 02"]);

        let done = store
            .list_tasks(
                owner,
                &TaskListQuery {
                    completed: Some(true),
                    limit: None,
                    ..TaskListQuery::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(done.len(), 6);
        assert!(done.iter().all(|t| t.completed));
    }

    #[actix_rt::test]
    async fn test_delete_tasks_by_owner_leaves_others() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        store.insert_task(&task(owner, "a", false, 0)).await.unwrap();
        store.insert_task(&task(owner, "b", false, 1)).await.unwrap();
        let kept = task(other, "c", false, 2);
        store.insert_task(&kept).await.unwrap();

        assert_eq!(store.delete_tasks_by_owner(owner).await.unwrap(), 2);
        assert_eq!(
            store.find_task(kept.id, other).await.unwrap(),
            Some(kept.clone())
        );
    }
}
