use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;
use validator::Validate;

use super::todo::{Todo, TODO_COLUMNS};

const LIST_COLUMNS: &str = "id, user_id, title, created_at, modified_at";

/// Body of `POST /list`.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct NewList {
    /// Must be between 1 and 255 characters.
    #[validate(length(min = 1, max = 255))]
    pub title: String,
}

/// Body of `PATCH /list`. Absent fields keep their stored value.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ListUpdate {
    pub id: String,
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
}

/// A named collection of todos.
///
/// `user_id` is loaded from the row for ownership checks but never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub id: String,
    #[serde(skip)]
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// A list together with its nested todos, as returned by the read endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListWithTodos {
    #[serde(flatten)]
    pub list: List,
    pub todos: Vec<Todo>,
}

impl List {
    pub fn new(input: NewList, user_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: input.title,
            created_at: now,
            modified_at: now,
        }
    }

    pub async fn insert(pool: &SqlitePool, list: &List) -> Result<List, sqlx::Error> {
        sqlx::query_as::<_, List>(&format!(
            "INSERT INTO list (id, user_id, title, created_at, modified_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING {LIST_COLUMNS}"
        ))
        .bind(&list.id)
        .bind(&list.user_id)
        .bind(&list.title)
        .bind(list.created_at)
        .bind(list.modified_at)
        .fetch_one(pool)
        .await
    }

    /// Applies `update` to the list if it is owned by `user_id`, refreshing
    /// `modified_at`. Returns `None` when no owned row matches.
    pub async fn update_owned(
        pool: &SqlitePool,
        update: &ListUpdate,
        user_id: &str,
    ) -> Result<Option<List>, sqlx::Error> {
        sqlx::query_as::<_, List>(&format!(
            "UPDATE list SET title = COALESCE(?1, title), modified_at = ?2
             WHERE id = ?3 AND user_id = ?4
             RETURNING {LIST_COLUMNS}"
        ))
        .bind(&update.title)
        .bind(Utc::now())
        .bind(&update.id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// All lists owned by `user_id`, oldest first, each with its todos.
    pub async fn find_all_with_todos(
        pool: &SqlitePool,
        user_id: &str,
    ) -> Result<Vec<ListWithTodos>, sqlx::Error> {
        let lists = sqlx::query_as::<_, List>(&format!(
            "SELECT {LIST_COLUMNS} FROM list WHERE user_id = ?1 ORDER BY created_at, id"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        let todos = sqlx::query_as::<_, Todo>(&format!(
            "SELECT {} FROM todo JOIN list ON list.id = todo.list_id
             WHERE list.user_id = ?1 ORDER BY todo.created_at, todo.id",
            qualified_todo_columns()
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(attach_todos(lists, todos))
    }

    /// A single list owned by `user_id`, with its todos.
    pub async fn find_with_todos(
        pool: &SqlitePool,
        id: &str,
        user_id: &str,
    ) -> Result<Option<ListWithTodos>, sqlx::Error> {
        let list = sqlx::query_as::<_, List>(&format!(
            "SELECT {LIST_COLUMNS} FROM list WHERE user_id = ?1 AND id = ?2 LIMIT 1"
        ))
        .bind(user_id)
        .bind(id)
        .fetch_optional(pool)
        .await?;

        let Some(list) = list else {
            return Ok(None);
        };

        let todos = sqlx::query_as::<_, Todo>(&format!(
            "SELECT {TODO_COLUMNS} FROM todo WHERE list_id = ?1 ORDER BY created_at, id"
        ))
        .bind(&list.id)
        .fetch_all(pool)
        .await?;

        Ok(Some(ListWithTodos { list, todos }))
    }

    /// Deletes the list by id. Its todos go with it through the foreign key cascade.
    /// This is not filtered by owner.
    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM list WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn qualified_todo_columns() -> String {
    TODO_COLUMNS
        .split(", ")
        .map(|column| format!("todo.{column} AS {column}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Groups `todos` under the list they belong to, keeping the order of both inputs.
fn attach_todos(lists: Vec<List>, todos: Vec<Todo>) -> Vec<ListWithTodos> {
    let mut by_list: HashMap<String, Vec<Todo>> = HashMap::new();
    for todo in todos {
        by_list.entry(todo.list_id.clone()).or_default().push(todo);
    }

    lists
        .into_iter()
        .map(|list| {
            let todos = by_list.remove(&list.id).unwrap_or_default();
            ListWithTodos { list, todos }
        })
        .collect()
}
