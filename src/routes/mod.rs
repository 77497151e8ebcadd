pub mod auth;
pub mod health;
pub mod lists;
pub mod todos;

use actix_web::{error::JsonPayloadError, web, HttpRequest};

use crate::error::AppError;

/// Malformed JSON bodies answer `400 Bad Request` in the usual `{"error": ...}` shape.
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(err.to_string()).into()
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(health::index)
        .service(health::health)
        .service(auth::sign_up)
        .service(auth::sign_in)
        .service(auth::sign_out)
        .service(lists::get_lists)
        .service(lists::create_list)
        .service(lists::update_list)
        .service(lists::get_list)
        .service(lists::delete_list)
        .service(todos::create_todo)
        .service(todos::update_todo)
        .service(todos::get_todo)
        .service(todos::delete_todo);
}
