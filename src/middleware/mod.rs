//! HTTP middleware: bearer authentication and request logging

pub mod auth;
pub mod request_log;

pub use auth::{auth_layer, CurrentUser, DbConn};
pub use request_log::request_log_layer;
