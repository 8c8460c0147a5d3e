use actix_multipart::Multipart;
use actix_web::{delete, get, http::header::ContentType, patch, post, web, HttpResponse, Responder};
use serde_json::{json, Map, Value};

use crate::{
    auth::{AuthenticatedUser, LoginRequest},
    error::AppError,
    models::UserInput,
    services::avatar::{read_upload, render_avatar},
    state::AppState,
};

fn text(message: &'static str) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body(message)
}

/// Register a new user
///
/// Creates the account, opens a first session and responds with
/// `{ user, token }`.
///
/// ## Responses:
/// - `201 Created`: account created.
/// - `400 Bad Request`: a field failed validation, or the email is already registered.
#[post("/users")]
pub async fn register(
    state: web::Data<AppState>,
    input: web::Json<UserInput>,
) -> Result<impl Responder, AppError> {
    let response = state.users.register(input.into_inner()).await?;
    Ok(HttpResponse::Created().json(response))
}

/// Login user
///
/// Opens an additional session; existing sessions stay valid.
///
/// ## Responses:
/// - `200 OK`: `{ user, token }`.
/// - `400 Bad Request`: `{"error": "Unable to login!"}` for any credential mismatch.
#[post("/users/login")]
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let response = state.users.login(login_data.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Ends the session used for this request.
#[post("/users/logout")]
pub async fn logout(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    state.users.logout(&auth.user, &auth.token).await?;
    Ok(text("Successfully Logged Out..."))
}

/// Ends every session of the caller.
#[post("/users/logoutAll")]
pub async fn logout_all(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    state.users.logout_all(&auth.user).await?;
    Ok(text("Successfully logged out of all devices..."))
}

#[get("/users/me")]
pub async fn get_me(auth: AuthenticatedUser) -> impl Responder {
    HttpResponse::Ok().json(auth.user)
}

/// Updates the caller's profile.
///
/// ## Request Body:
/// Any subset of `name`, `age`, `email`, `password`. Any other key rejects the
/// request with `{"error": "Invalid Updates!"}` and nothing is changed.
#[patch("/users/me")]
pub async fn update_me(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
    body: web::Json<Map<String, Value>>,
) -> Result<impl Responder, AppError> {
    let user = state
        .users
        .update_profile(auth.user, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Deletes the caller's account together with all of their tasks.
#[delete("/users/me")]
pub async fn delete_me(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let user = state.users.delete_account(auth.user).await?;
    Ok(HttpResponse::Ok().json(json!({ "deleted_user": user })))
}

/// Uploads a new avatar.
///
/// Expects `multipart/form-data` with an `avatar` file field (jpg, jpeg, png, gif
/// or bmp, at most 1MB). The image is stored as a 300x300 PNG.
#[post("/users/me/avatar")]
pub async fn upload_avatar(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
    payload: Multipart,
) -> Result<impl Responder, AppError> {
    let upload = read_upload(payload).await?;
    let png = web::block(move || render_avatar(&upload))
        .await
        .map_err(|e| AppError::Internal(format!("avatar worker failed: {}", e)))??;

    state.users.set_avatar(&auth.user, png).await?;
    Ok(text("Profile picture uploaded successfully..."))
}

#[delete("/users/me/avatar")]
pub async fn delete_avatar(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    state.users.clear_avatar(&auth.user).await?;
    Ok(text("Profile picture deleted successfully..."))
}

/// Serves a user's avatar as `image/png`. Public.
#[get("/users/{id}/avatar")]
pub async fn get_avatar(
    state: web::Data<AppState>,
    user_id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let png = state.users.avatar(&user_id).await?;
    Ok(HttpResponse::Ok().content_type(ContentType::png()).body(png))
}
