use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use super::Store;
use crate::config::Config;
use crate::error::AppError;
use crate::models::{Task, TaskListQuery, User};

const USER_COLUMNS: &str =
    "id, name, age, email, password_hash, tokens, avatar, created_at, updated_at";
const TASK_COLUMNS: &str = "id, description, completed, owner, created_at, updated_at";

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool using the configured size and acquire timeout.
    pub async fn connect(config: &Config, database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(config.database_acquire_timeout)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies the bundled migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(&format!(
            "INSERT INTO users ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(user.age)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.tokens)
        .bind(&user.avatar)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update_profile(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE users SET name = $2, age = $3, email = $4, password_hash = $5, updated_at = $6 \
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(user.age)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn push_token(&self, user_id: Uuid, token: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE users SET tokens = array_append(tokens, $2), updated_at = now() WHERE id = $1",
        )
        .bind(user_id)
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_token(&self, user_id: Uuid, token: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE users SET tokens = array_remove(tokens, $2), updated_at = now() WHERE id = $1",
        )
        .bind(user_id)
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear_tokens(&self, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET tokens = '{}', updated_at = now() WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_avatar(&self, user_id: Uuid, avatar: Option<Vec<u8>>) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET avatar = $2, updated_at = now() WHERE id = $1")
            .bind(user_id)
            .bind(avatar)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_task(&self, task: &Task) -> Result<(), AppError> {
        sqlx::query(&format!(
            "INSERT INTO tasks ({}) VALUES ($1, $2, $3, $4, $5, $6)",
            TASK_COLUMNS
        ))
        .bind(task.id)
        .bind(&task.description)
        .bind(task.completed)
        .bind(task.owner)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_task(&self, id: Uuid, owner: Uuid) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE id = $1 AND owner = $2",
            TASK_COLUMNS
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    async fn list_tasks(
        &self,
        owner: Uuid,
        query: &TaskListQuery,
    ) -> Result<Vec<Task>, AppError> {
        let mut sql = format!("SELECT {} FROM tasks WHERE owner = $1", TASK_COLUMNS);
        let mut param_count = 2;

        if query.completed.is_some() {
            sql.push_str(&format!(" AND completed = ${}", param_count));
            param_count += 1;
        }

        // Column names come from a closed enum, never from the request.
        match query.sort {
            Some(sort) => sql.push_str(&format!(
                " ORDER BY {} {}, created_at ASC",
                sort.field.column(),
                if sort.descending { "DESC" } else { "ASC" }
            )),
            None => sql.push_str(" ORDER BY created_at ASC"),
        }

        if query.limit.is_some() {
            sql.push_str(&format!(" LIMIT ${}", param_count));
            param_count += 1;
        }
        sql.push_str(&format!(" OFFSET ${}", param_count));

        let mut query_builder = sqlx::query_as::<_, Task>(&sql).bind(owner);
        if let Some(completed) = query.completed {
            query_builder = query_builder.bind(completed);
        }
        if let Some(limit) = query.limit {
            query_builder = query_builder.bind(i64::from(limit));
        }
        query_builder = query_builder.bind(i64::from(query.skip));

        let tasks = query_builder.fetch_all(&self.pool).await?;
        Ok(tasks)
    }

    async fn update_task(&self, task: &Task) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE tasks SET description = $3, completed = $4, updated_at = $5 \
             WHERE id = $1 AND owner = $2",
        )
        .bind(task.id)
        .bind(task.owner)
        .bind(&task.description)
        .bind(task.completed)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_task(&self, id: Uuid, owner: Uuid) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "DELETE FROM tasks WHERE id = $1 AND owner = $2 RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    async fn delete_tasks_by_owner(&self, owner: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE owner = $1")
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
