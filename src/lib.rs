#![doc = "The `listkeeper` library crate."]
#![doc = ""]
#![doc = "A small multi-user to-do list backend: username/password sign-up and sign-in,"]
#![doc = "cookie sessions, and CRUD over per-user lists and the todos nested in them."]
#![doc = "The binary (`main.rs`) wires these modules into an actix-web server."]

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;

pub use crate::error::AppError;
