use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::error::AppError;
use crate::models::User;

/// The caller of a protected route: the resolved user and the exact token presented.
///
/// `AuthMiddleware` inserts this into the request extensions after verifying the
/// bearer token; handlers take it as an argument. If it is missing the route was
/// not wrapped by the middleware and the request is rejected as unauthorized.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub token: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>().cloned() {
            Some(auth) => ready(Ok(auth)),
            None => ready(Err(AppError::Unauthorized.into())),
        }
    }
}
