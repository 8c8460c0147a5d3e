use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use serde_json::{Map, Value};

use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{TaskInput, TaskListParams, TaskListQuery},
    state::AppState,
};

/// Creates a new task for the authenticated user.
///
/// ## Request Body:
/// - `description`: required, trimmed, must not be empty.
/// - `completed` (optional): defaults to `false`.
///
/// Any `owner` in the body is ignored; the task always belongs to the caller.
///
/// ## Responses:
/// - `201 Created`: Returns the newly created `Task` object as JSON.
/// - `400 Bad Request`: If the description is missing or blank.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
#[post("/tasks")]
pub async fn create_task(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    let task = state
        .tasks
        .create(auth.user.id, task_data.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(task))
}

/// Retrieves a page of the caller's tasks.
///
/// ## Query Parameters:
/// - `completed` (optional): `true` keeps completed tasks, any other value keeps open ones.
/// - `limit`, `skip` (optional): page window, honoured only when both are given.
///   Without them the first 10 tasks are returned; `limit=0` removes the bound.
/// - `sortBy` (optional): `<field>_<asc|desc>` where field is one of
///   `createdAt`, `updatedAt`, `description`, `completed`.
///
/// ## Responses:
/// - `200 OK`: Returns a JSON array of `Task` objects.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
#[get("/tasks")]
pub async fn get_tasks(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
    query_params: web::Query<TaskListParams>,
) -> Result<impl Responder, AppError> {
    let query = TaskListQuery::from_params(&query_params);
    let tasks = state.tasks.list(auth.user.id, &query).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Retrieves one of the caller's tasks. Tasks of other users are reported as not found.
#[get("/tasks/{id}")]
pub async fn get_task(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
    task_id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let task = state.tasks.get(auth.user.id, &task_id).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Updates one of the caller's tasks.
///
/// ## Request Body:
/// Any subset of `description` and `completed`. Any other key rejects the request
/// with `{"error": "Invalid Updates!"}`.
///
/// ## Responses:
/// - `200 OK`: Returns the updated `Task`.
/// - `400 Bad Request`: Unknown keys or an invalid value.
/// - `404 Not Found`: `{"error": "Task Not Found!"}`.
#[patch("/tasks/{id}")]
pub async fn update_task(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
    task_id: web::Path<String>,
    body: web::Json<Map<String, Value>>,
) -> Result<impl Responder, AppError> {
    let task = state
        .tasks
        .update(auth.user.id, &task_id, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Deletes one of the caller's tasks and returns it.
#[delete("/tasks/{id}")]
pub async fn delete_task(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
    task_id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let task = state.tasks.delete(auth.user.id, &task_id).await?;
    Ok(HttpResponse::Ok().json(task))
}
