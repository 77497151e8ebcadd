use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;
use validator::Validate;

pub(crate) const TODO_COLUMNS: &str =
    "id, user_id, list_id, content, completed, bookmarked, created_at, modified_at";

/// Body of `POST /todo`.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    pub list_id: String,
    #[validate(length(min = 1))]
    pub content: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub bookmarked: bool,
}

/// Body of `PATCH /todo`. Absent fields keep their stored value.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TodoUpdate {
    pub id: String,
    pub list_id: Option<String>,
    #[validate(length(min = 1))]
    pub content: Option<String>,
    pub completed: Option<bool>,
    pub bookmarked: Option<bool>,
}

/// A task item belonging to one list and one user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    #[serde(skip)]
    pub user_id: String,
    pub list_id: String,
    pub content: String,
    pub completed: bool,
    pub bookmarked: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Todo {
    pub fn new(input: NewTodo, user_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            list_id: input.list_id,
            content: input.content,
            completed: input.completed,
            bookmarked: input.bookmarked,
            created_at: now,
            modified_at: now,
        }
    }

    pub async fn insert(pool: &SqlitePool, todo: &Todo) -> Result<Todo, sqlx::Error> {
        sqlx::query_as::<_, Todo>(&format!(
            "INSERT INTO todo (id, user_id, list_id, content, completed, bookmarked, created_at, modified_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING {TODO_COLUMNS}"
        ))
        .bind(&todo.id)
        .bind(&todo.user_id)
        .bind(&todo.list_id)
        .bind(&todo.content)
        .bind(todo.completed)
        .bind(todo.bookmarked)
        .bind(todo.created_at)
        .bind(todo.modified_at)
        .fetch_one(pool)
        .await
    }

    /// Applies `update` to the todo if it is owned by `user_id`, refreshing
    /// `modified_at`. Returns `None` when no owned row matches.
    pub async fn update_owned(
        pool: &SqlitePool,
        update: &TodoUpdate,
        user_id: &str,
    ) -> Result<Option<Todo>, sqlx::Error> {
        sqlx::query_as::<_, Todo>(&format!(
            "UPDATE todo SET
                list_id = COALESCE(?1, list_id),
                content = COALESCE(?2, content),
                completed = COALESCE(?3, completed),
                bookmarked = COALESCE(?4, bookmarked),
                modified_at = ?5
             WHERE id = ?6 AND user_id = ?7
             RETURNING {TODO_COLUMNS}"
        ))
        .bind(&update.list_id)
        .bind(&update.content)
        .bind(update.completed)
        .bind(update.bookmarked)
        .bind(Utc::now())
        .bind(&update.id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_owned(
        pool: &SqlitePool,
        id: &str,
        user_id: &str,
    ) -> Result<Option<Todo>, sqlx::Error> {
        sqlx::query_as::<_, Todo>(&format!(
            "SELECT {TODO_COLUMNS} FROM todo WHERE user_id = ?1 AND id = ?2 LIMIT 1"
        ))
        .bind(user_id)
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Deletes the todo by id. This is not filtered by owner.
    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM todo WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
