//! Sekolah - school administration backend
//!
//! Academic years, classrooms, students, subjects and schedules, teacher
//! journals, student and teacher attendance with reports, served as a JSON
//! API behind bearer-token authentication.

pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod export;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod permission;
pub mod query;
pub mod routes;
pub mod state;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use state::AppState;
