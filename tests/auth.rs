mod common;

use std::net::TcpListener;

use actix_cors::Cors;
use actix_web::body::to_bytes;
use actix_web::cookie::{time, Cookie};
use actix_web::http::{header, StatusCode};
use actix_web::middleware::Logger;
use actix_web::{rt, test, App, HttpServer};
use chrono::Utc;
use common::{count_rows, create_list, init_app, session_cookie, sign_up, test_state};
use listkeeper::auth::{SessionMiddleware, SESSION_COOKIE_NAME};
use listkeeper::routes;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use sqlx::SqlitePool;

#[test_log::test(actix_web::test)]
async fn test_sign_up_then_create_and_read_list() {
    let (app, _pool) = init_app().await;

    let req = test::TestRequest::post()
        .uri("/sign-up")
        .set_json(json!({ "username": "alice1", "password": "longpassword" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/");

    let cookie = session_cookie(&resp).expect("session cookie");
    assert!(!cookie.value().is_empty());
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.path(), Some("/"));

    let created = create_list(&app, &cookie, "Groceries").await;
    assert_eq!(created["title"], "Groceries");
    assert!(created["id"].is_string());
    assert!(created["createdAt"].is_string());
    assert!(created["modifiedAt"].is_string());
    assert!(created.get("userId").is_none());
    assert!(created.get("todos").is_none());

    let req = test::TestRequest::get()
        .uri("/lists")
        .cookie(cookie.clone())
        .to_request();
    let lists: Value = test::call_and_read_body_json(&app, req).await;
    let lists = lists.as_array().unwrap();
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0]["id"], created["id"]);
    assert_eq!(lists[0]["todos"], json!([]));
}

#[actix_web::test]
async fn test_duplicate_username_is_rejected_case_insensitively() {
    let (app, pool) = init_app().await;
    sign_up(&app, "alice1", "longpassword").await;

    let req = test::TestRequest::post()
        .uri("/sign-up")
        .set_json(json!({ "username": "ALICE1", "password": "anotherpassword" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(session_cookie(&resp).is_none());

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Duplicate Username");

    assert_eq!(count_rows(&pool, "user").await, 1);
    assert_eq!(count_rows(&pool, "user_key").await, 1);
    assert_eq!(count_rows(&pool, "user_session").await, 1);
}

#[actix_web::test]
async fn test_sign_in() {
    let (app, pool) = init_app().await;
    sign_up(&app, "Alice1", "longpassword").await;

    // wrong password
    let req = test::TestRequest::post()
        .uri("/sign-in")
        .set_json(json!({ "username": "alice1", "password": "wrongpassword" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(session_cookie(&resp).is_none());
    assert_eq!(count_rows(&pool, "user_session").await, 1);

    // unknown user
    let req = test::TestRequest::post()
        .uri("/sign-in")
        .set_json(json!({ "username": "nobody", "password": "longpassword" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // right password, different case
    let req = test::TestRequest::post()
        .uri("/sign-in")
        .set_json(json!({ "username": "ALICE1", "password": "longpassword" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let cookie = session_cookie(&resp).expect("session cookie");

    let created = create_list(&app, &cookie, "Signed in").await;
    assert_eq!(created["title"], "Signed in");
    assert_eq!(count_rows(&pool, "user_session").await, 2);
}

#[actix_web::test]
async fn test_credentials_are_validated() {
    let (app, pool) = init_app().await;

    for (username, password) in [
        ("abc", "longpassword"),
        ("a_very_long_username_indeed", "longpassword"),
        ("alice1", "short"),
    ] {
        let req = test::TestRequest::post()
            .uri("/sign-up")
            .set_json(json!({ "username": username, "password": password }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    let req = test::TestRequest::post()
        .uri("/sign-up")
        .set_json(json!({ "username": "alice1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert_eq!(count_rows(&pool, "user").await, 0);
}

#[actix_web::test]
async fn test_protected_routes_require_session() {
    let (app, _pool) = init_app().await;

    let requests = vec![
        test::TestRequest::post()
            .uri("/list")
            .set_json(json!({ "title": "Nope" })),
        test::TestRequest::post()
            .uri("/todo")
            .set_json(json!({ "listId": "x", "content": "Nope" })),
        test::TestRequest::patch()
            .uri("/list")
            .set_json(json!({ "id": "x", "title": "Nope" })),
        test::TestRequest::patch()
            .uri("/todo")
            .set_json(json!({ "id": "x", "content": "Nope" })),
        test::TestRequest::get().uri("/lists"),
        test::TestRequest::get().uri("/list/x"),
        test::TestRequest::get().uri("/todo/x"),
        test::TestRequest::delete().uri("/list/x"),
        test::TestRequest::delete().uri("/todo/x"),
        test::TestRequest::post().uri("/sign-out"),
    ];

    for req in requests {
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Please login first.");
    }
}

#[actix_web::test]
async fn test_unknown_session_is_cleared() {
    let (app, _pool) = init_app().await;

    let req = test::TestRequest::get()
        .uri("/lists")
        .cookie(Cookie::new(SESSION_COOKIE_NAME, "not-a-session"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let cleared = session_cookie(&resp).expect("removal cookie");
    assert_eq!(cleared.value(), "");
}

/// Moves the session's expiry timestamps relative to now, in milliseconds.
async fn age_session(pool: &SqlitePool, token: &str, active_offset: i64, idle_offset: i64) {
    let now = Utc::now().timestamp_millis();
    sqlx::query("UPDATE user_session SET active_expires = ?1, idle_expires = ?2 WHERE id = ?3")
        .bind(now + active_offset)
        .bind(now + idle_offset)
        .bind(token)
        .execute(pool)
        .await
        .unwrap();
}

#[actix_web::test]
async fn test_idle_session_is_renewed_with_new_cookie() {
    let (app, pool) = init_app().await;
    let cookie = sign_up(&app, "idle01", "longpassword").await;
    age_session(&pool, cookie.value(), -1_000, 60_000).await;

    let req = test::TestRequest::get()
        .uri("/lists")
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let renewed = session_cookie(&resp).expect("renewed session cookie");
    assert!(!renewed.value().is_empty());
    assert_ne!(renewed.value(), cookie.value());
    assert_eq!(renewed.http_only(), Some(true));
    assert_eq!(count_rows(&pool, "user_session").await, 1);

    // the old token is gone, the new one works
    let req = test::TestRequest::get().uri("/lists").cookie(cookie).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get().uri("/lists").cookie(renewed).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(session_cookie(&resp).is_none());
}

#[actix_web::test]
async fn test_dead_session_is_rejected_and_cleared() {
    let (app, pool) = init_app().await;
    let cookie = sign_up(&app, "dead01", "longpassword").await;
    age_session(&pool, cookie.value(), -2_000, -1_000).await;

    let req = test::TestRequest::get().uri("/lists").cookie(cookie).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let cleared = session_cookie(&resp).expect("removal cookie");
    assert_eq!(cleared.value(), "");
    assert_eq!(cleared.max_age(), Some(time::Duration::ZERO));
    assert_eq!(count_rows(&pool, "user_session").await, 0);
}

#[actix_web::test]
async fn test_session_store_failure_is_server_error() {
    let (app, pool) = init_app().await;
    let cookie = sign_up(&app, "broken1", "longpassword").await;
    sqlx::query("ALTER TABLE user_session RENAME TO user_session_gone")
        .execute(pool.get_ref())
        .await
        .unwrap();

    let req = test::TestRequest::get().uri("/lists").cookie(cookie).to_request();
    let err = match test::try_call_service(&app, req).await {
        Ok(resp) => panic!("expected an error, got {}", resp.status()),
        Err(err) => err,
    };

    let resp = err.error_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = to_bytes(resp.into_body()).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "Internal Server Error");
}

#[actix_web::test]
async fn test_bearer_token_is_accepted() {
    let (app, _pool) = init_app().await;
    let cookie = sign_up(&app, "bearer1", "longpassword").await;

    let req = test::TestRequest::post()
        .uri("/list")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", cookie.value())))
        .set_json(json!({ "title": "Via header" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_sign_out_invalidates_session() {
    let (app, pool) = init_app().await;
    let cookie = sign_up(&app, "alice1", "longpassword").await;

    let req = test::TestRequest::post()
        .uri("/sign-out")
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(session_cookie(&resp).unwrap().value(), "");
    assert_eq!(count_rows(&pool, "user_session").await, 0);

    let req = test::TestRequest::get()
        .uri("/lists")
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_live_server_session_cookie() {
    let (pool, manager) = test_state().await;

    // Find an available port
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(pool.clone())
            .app_data(manager.clone())
            .wrap(SessionMiddleware)
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .configure(routes::config)
    })
    .workers(1)
    .bind(("127.0.0.1", port))
    .unwrap_or_else(|_| panic!("Failed to bind to port {}", port))
    .run();
    let handle = server.handle();
    rt::spawn(server);

    // Give the server a moment to start
    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let client = reqwest::Client::new();
    let base = format!("http://127.0.0.1:{}", port);

    let resp = client
        .post(format!("{}/list", base))
        .json(&json!({ "title": "Anonymous" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

    let resp = client
        .post(format!("{}/sign-up", base))
        .json(&json!({ "username": "alice1", "password": "longpassword" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::NO_CONTENT);
    let set_cookie = resp
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("sign-up did not set a cookie")
        .to_string();
    let session = Cookie::parse(set_cookie).expect("malformed cookie");
    assert_eq!(session.name(), SESSION_COOKIE_NAME);

    let resp = client
        .post(format!("{}/list", base))
        .header(
            reqwest::header::COOKIE,
            format!("{}={}", SESSION_COOKIE_NAME, session.value()),
        )
        .json(&json!({ "title": "Groceries" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let list: Value = resp.json().await.unwrap();
    assert_eq!(list["title"], "Groceries");

    handle.stop(true).await;
}
