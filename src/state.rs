use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::Config;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Directory for uploads of one kind, e.g. `users` or `attendance`
    pub fn upload_dir(&self, kind: &str) -> std::path::PathBuf {
        self.config.storage_dir.join(kind)
    }
}
