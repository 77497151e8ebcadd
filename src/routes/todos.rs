use crate::{
    auth::AuthenticatedSession,
    error::AppError,
    models::{NewTodo, Todo, TodoUpdate},
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use sqlx::SqlitePool;
use validator::Validate;

/// Turns a foreign key failure on `list_id` into a client error.
fn map_list_reference(err: sqlx::Error) -> AppError {
    match err {
        sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
            AppError::BadRequest("List does not exist".into())
        }
        other => AppError::from(other),
    }
}

/// Creates a todo in a list.
///
/// ## Request Body:
/// - `listId`: the list the todo belongs to.
/// - `content`: non-empty text.
/// - `completed`, `bookmarked` (optional): default to `false`.
///
/// ## Responses:
/// - `200 OK`: the created todo (without `userId`).
/// - `400 Bad Request`: `listId` does not name an existing list.
/// - `401 Unauthorized`: no valid session.
/// - `422 Unprocessable Entity`: empty content.
#[post("/todo")]
pub async fn create_todo(
    pool: web::Data<SqlitePool>,
    session: AuthenticatedSession,
    todo_data: web::Json<NewTodo>,
) -> Result<impl Responder, AppError> {
    todo_data.validate()?;

    let todo = Todo::new(todo_data.into_inner(), session.user_id());
    let created = Todo::insert(&pool, &todo)
        .await
        .map_err(map_list_reference)?;

    Ok(HttpResponse::Ok().json(created))
}

/// Updates a todo owned by the authenticated user and refreshes its `modifiedAt`.
///
/// Fields left out of the body keep their stored value.
///
/// ## Responses:
/// - `200 OK`: the updated todo.
/// - `400 Bad Request`: a new `listId` does not name an existing list.
/// - `401 Unauthorized`: no valid session.
/// - `404 Not Found`: no todo with this id owned by the user.
#[patch("/todo")]
pub async fn update_todo(
    pool: web::Data<SqlitePool>,
    session: AuthenticatedSession,
    todo_data: web::Json<TodoUpdate>,
) -> Result<impl Responder, AppError> {
    todo_data.validate()?;

    let updated = Todo::update_owned(&pool, &todo_data, session.user_id())
        .await
        .map_err(map_list_reference)?
        .ok_or_else(|| AppError::NotFound("Todo not found.".into()))?;

    Ok(HttpResponse::Ok().json(updated))
}

/// Retrieves one todo of the authenticated user.
#[get("/todo/{id}")]
pub async fn get_todo(
    pool: web::Data<SqlitePool>,
    session: AuthenticatedSession,
    todo_id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let todo = Todo::find_owned(&pool, &todo_id, session.user_id())
        .await?
        .ok_or_else(|| AppError::NotFound("Todo not found.".into()))?;

    Ok(HttpResponse::Ok().json(todo))
}

/// Deletes a todo by id.
///
/// As with lists, ownership is not checked and a missing id still answers
/// `204 No Content`.
#[delete("/todo/{id}")]
pub async fn delete_todo(
    pool: web::Data<SqlitePool>,
    session: AuthenticatedSession,
    todo_id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let deleted = Todo::delete(&pool, &todo_id).await?;
    log::debug!(
        "User {} deleted todo {} ({} row(s))",
        session.user_id(),
        todo_id,
        deleted
    );

    Ok(HttpResponse::NoContent().finish())
}
