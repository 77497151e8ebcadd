#![allow(dead_code)]

use actix_http::Request;
use actix_web::{
    body::MessageBody,
    cookie::Cookie,
    dev::{Service, ServiceResponse},
    http::StatusCode,
    middleware::Logger,
    test, web, App,
};
use listkeeper::auth::{SessionManager, SessionMiddleware, SessionSettings, SESSION_COOKIE_NAME};
use listkeeper::{db, routes};
use serde_json::{json, Value};
use sqlx::SqlitePool;

/// A fresh in-memory database and a session manager on top of it.
pub async fn test_state() -> (web::Data<SqlitePool>, web::Data<SessionManager>) {
    let pool = db::connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");
    let settings = SessionSettings {
        bcrypt_cost: 4,
        ..SessionSettings::default()
    };
    let manager = SessionManager::new(pool.clone(), settings);
    (web::Data::new(pool), web::Data::new(manager))
}

/// The full application over its own in-memory database, plus a handle on that
/// database for assertions.
pub async fn init_app() -> (
    impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>,
    web::Data<SqlitePool>,
) {
    let (pool, manager) = test_state().await;
    let app = test::init_service(
        App::new()
            .app_data(pool.clone())
            .app_data(manager)
            .wrap(SessionMiddleware)
            .wrap(Logger::default())
            .configure(routes::config),
    )
    .await;
    (app, pool)
}

pub fn session_cookie<B>(resp: &ServiceResponse<B>) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|cookie| cookie.name() == SESSION_COOKIE_NAME)
        .map(|cookie| cookie.into_owned())
}

/// Signs up `username` and returns the issued session cookie.
pub async fn sign_up<S, B>(app: &S, username: &str, password: &str) -> Cookie<'static>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/sign-up")
        .set_json(json!({ "username": username, "password": password }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT, "sign-up of {} failed", username);
    session_cookie(&resp).expect("sign-up did not set a session cookie")
}

/// Creates a list titled `title` and returns the response body.
pub async fn create_list<S, B>(app: &S, cookie: &Cookie<'static>, title: &str) -> Value
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/list")
        .cookie(cookie.clone())
        .set_json(json!({ "title": title }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::OK, "creating list {} failed", title);
    test::read_body_json(resp).await
}

/// Creates a todo in `list_id` and returns the response body.
pub async fn create_todo<S, B>(
    app: &S,
    cookie: &Cookie<'static>,
    list_id: &str,
    content: &str,
) -> Value
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/todo")
        .cookie(cookie.clone())
        .set_json(json!({ "listId": list_id, "content": content }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::OK, "creating todo {} failed", content);
    test::read_body_json(resp).await
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    let (count,): (i64,) = sqlx::query_as(&format!(r#"SELECT COUNT(*) FROM "{}""#, table))
        .fetch_one(pool)
        .await
        .expect("count query failed");
    count
}
