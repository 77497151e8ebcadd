use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;

use crate::error::AppError;

#[get("/")]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().body("Hello from listkeeper")
}

/// Liveness plus a round trip to the list store. An unreachable store is a 500.
#[get("/health")]
pub async fn health(pool: web::Data<SqlitePool>) -> Result<impl Responder, AppError> {
    sqlx::query("SELECT 1").execute(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "ok",
        "database": "ok",
        "timestamp": Utc::now()
    })))
}
