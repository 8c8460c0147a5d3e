pub mod health;
pub mod tasks;
pub mod users;

use actix_web::{error, web, HttpRequest};

use crate::auth::AuthMiddleware;
use crate::error::AppError;

fn json_error(err: error::JsonPayloadError, _req: &HttpRequest) -> error::Error {
    AppError::BadRequest(err.to_string()).into()
}

fn query_error(err: error::QueryPayloadError, _req: &HttpRequest) -> error::Error {
    AppError::BadRequest(err.to_string()).into()
}

/// Registers every route of the service.
///
/// The public routes come first. Everything else sits in an unprefixed scope
/// guarded by `AuthMiddleware`, so an unmatched path answers 401 to an anonymous
/// caller.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .service(health::health)
        .service(users::register)
        .service(users::login)
        .service(users::get_avatar)
        .service(
            web::scope("")
                .wrap(AuthMiddleware)
                .service(users::logout)
                .service(users::logout_all)
                .service(users::get_me)
                .service(users::update_me)
                .service(users::delete_me)
                .service(users::upload_avatar)
                .service(users::delete_avatar)
                .service(tasks::create_task)
                .service(tasks::get_tasks)
                .service(tasks::get_task)
                .service(tasks::update_task)
                .service(tasks::delete_task),
        );
}
