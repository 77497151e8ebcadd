use crate::{
    auth::{AuthRequest, AuthenticatedSession, SessionManager},
    error::AppError,
};
use actix_web::{http::header, post, web, HttpResponse};
use validator::Validate;

/// Sign up
///
/// Creates a user with a username/password key and starts a session for it.
///
/// ## Responses:
/// - `204 No Content`: session cookie set, `Location: /`.
/// - `400 Bad Request`: the username (case-insensitively) is already taken.
/// - `422 Unprocessable Entity`: username or password length out of bounds.
#[post("/sign-up")]
pub async fn sign_up(
    manager: web::Data<SessionManager>,
    body: web::Json<AuthRequest>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let AuthRequest { username, password } = body.into_inner();

    let session = manager.sign_up(&username, password).await?;

    Ok(HttpResponse::NoContent()
        .insert_header((header::LOCATION, "/"))
        .cookie(manager.session_cookie(&session))
        .finish())
}

/// Sign in
///
/// ## Responses:
/// - `204 No Content`: session cookie set, `Location: /`.
/// - `401 Unauthorized`: unknown username or wrong password.
/// - `422 Unprocessable Entity`: username or password length out of bounds.
#[post("/sign-in")]
pub async fn sign_in(
    manager: web::Data<SessionManager>,
    body: web::Json<AuthRequest>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let AuthRequest { username, password } = body.into_inner();

    let session = manager.sign_in(&username, password).await?;

    Ok(HttpResponse::NoContent()
        .insert_header((header::LOCATION, "/"))
        .cookie(manager.session_cookie(&session))
        .finish())
}

/// Sign out
///
/// Invalidates the current session and clears the cookie.
#[post("/sign-out")]
pub async fn sign_out(
    manager: web::Data<SessionManager>,
    session: AuthenticatedSession,
) -> Result<HttpResponse, AppError> {
    manager.invalidate_session(&session.0.id).await?;

    Ok(HttpResponse::NoContent()
        .cookie(manager.blank_cookie())
        .finish())
}
