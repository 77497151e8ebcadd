use crate::{
    auth::AuthenticatedSession,
    error::AppError,
    models::{List, ListUpdate, NewList},
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use sqlx::SqlitePool;
use validator::Validate;

/// Creates a list owned by the authenticated user.
///
/// ## Request Body:
/// - `title`: 1 to 255 characters.
///
/// ## Responses:
/// - `200 OK`: the created list (without `userId`).
/// - `401 Unauthorized`: no valid session.
/// - `422 Unprocessable Entity`: title out of bounds.
#[post("/list")]
pub async fn create_list(
    pool: web::Data<SqlitePool>,
    session: AuthenticatedSession,
    list_data: web::Json<NewList>,
) -> Result<impl Responder, AppError> {
    list_data.validate()?;

    let list = List::new(list_data.into_inner(), session.user_id());
    let created = List::insert(&pool, &list).await?;

    Ok(HttpResponse::Ok().json(created))
}

/// Updates a list owned by the authenticated user and refreshes its `modifiedAt`.
///
/// ## Request Body:
/// - `id`: the list to update.
/// - `title` (optional): 1 to 255 characters.
///
/// ## Responses:
/// - `200 OK`: the updated list.
/// - `401 Unauthorized`: no valid session.
/// - `404 Not Found`: no list with this id owned by the user.
#[patch("/list")]
pub async fn update_list(
    pool: web::Data<SqlitePool>,
    session: AuthenticatedSession,
    list_data: web::Json<ListUpdate>,
) -> Result<impl Responder, AppError> {
    list_data.validate()?;

    let updated = List::update_owned(&pool, &list_data, session.user_id())
        .await?
        .ok_or_else(|| AppError::NotFound("List not found".into()))?;

    Ok(HttpResponse::Ok().json(updated))
}

/// Lists every list of the authenticated user with its todos nested.
#[get("/lists")]
pub async fn get_lists(
    pool: web::Data<SqlitePool>,
    session: AuthenticatedSession,
) -> Result<impl Responder, AppError> {
    let lists = List::find_all_with_todos(&pool, session.user_id()).await?;
    Ok(HttpResponse::Ok().json(lists))
}

/// Retrieves one list of the authenticated user with its todos nested.
///
/// ## Responses:
/// - `200 OK`: the list.
/// - `401 Unauthorized`: no valid session.
/// - `404 Not Found`: no list with this id owned by the user.
#[get("/list/{id}")]
pub async fn get_list(
    pool: web::Data<SqlitePool>,
    session: AuthenticatedSession,
    list_id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let list = List::find_with_todos(&pool, &list_id, session.user_id())
        .await?
        .ok_or_else(|| AppError::NotFound("List not found".into()))?;

    Ok(HttpResponse::Ok().json(list))
}

/// Deletes a list and, through the cascade, all of its todos.
///
/// Any authenticated user can delete a list by id; ownership is not checked here.
/// Deleting an id that does not exist still answers `204 No Content`.
#[delete("/list/{id}")]
pub async fn delete_list(
    pool: web::Data<SqlitePool>,
    session: AuthenticatedSession,
    list_id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let deleted = List::delete(&pool, &list_id).await?;
    log::debug!(
        "User {} deleted list {} ({} row(s))",
        session.user_id(),
        list_id,
        deleted
    );

    Ok(HttpResponse::NoContent().finish())
}
