use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::auth::session::Session;
use crate::error::AppError;

/// The session attached to the request by `SessionMiddleware`.
///
/// Handlers that take this argument are only reachable with a valid session; without
/// one the request fails with `AppError::Unauthorized` (HTTP 401).
#[derive(Debug, Clone)]
pub struct AuthenticatedSession(pub Session);

impl AuthenticatedSession {
    pub fn user_id(&self) -> &str {
        &self.0.user_id
    }
}

impl FromRequest for AuthenticatedSession {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<Session>().cloned() {
            Some(session) => ready(Ok(AuthenticatedSession(session))),
            None => {
                let err = AppError::Unauthorized("Please login first.".to_string());
                ready(Err(err.into()))
            }
        }
    }
}
