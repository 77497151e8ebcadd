use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::error::AppError;

/// Opens the database and applies the embedded migrations.
///
/// The pool holds a single connection that lives for the whole process, so an
/// in-memory database (`sqlite::memory:`) keeps its contents across requests.
/// Foreign keys are switched on explicitly since list and todo deletion relies on
/// `ON DELETE CASCADE`.
pub async fn connect(database_url: &str) -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    log::info!("Database ready at {}", database_url);

    Ok(pool)
}
