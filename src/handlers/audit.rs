//! Audit log handlers
//!
//! Model change logs and HTTP request logs, written through a background
//! channel and listed through the query helper.

use axum::{response::Json, Extension};
use sea_orm::EntityTrait;

use crate::entity::{model_log, request_log};
use crate::error::AppResult;
use crate::middleware::{CurrentUser, DbConn};
use crate::query::{self, ListQuery, ListResponse};

/// GET /api/v1/logs/models
pub async fn list_model_logs(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    query: ListQuery,
) -> AppResult<Json<ListResponse>> {
    current_user.require_admin()?;
    let result = query::list(&db, model_log::Entity::find(), &model_log::QUERY, &query).await?;
    Ok(Json(result))
}

/// GET /api/v1/logs/requests
pub async fn list_request_logs(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    query: ListQuery,
) -> AppResult<Json<ListResponse>> {
    current_user.require_admin()?;
    let result = query::list(&db, request_log::Entity::find(), &request_log::QUERY, &query).await?;
    Ok(Json(result))
}

/// Service for adding audit logs
pub mod service {
    use sea_orm::{ActiveModelTrait, Set};
    use serde::Serialize;
    use serde_json::{json, Value as Json};
    use tokio::sync::mpsc;

    use crate::entity::{model_log, request_log};

    pub const CREATED: &str = "created";
    pub const UPDATED: &str = "updated";
    pub const DELETED: &str = "deleted";

    /// A change to one record
    #[derive(Debug, Clone)]
    pub struct ModelEntry {
        pub model_type: String,
        pub model_id: Option<i32>,
        pub event: &'static str,
        pub before: Option<Json>,
        pub after: Option<Json>,
        pub user_id: Option<i32>,
    }

    /// One mutating HTTP request
    #[derive(Debug, Clone)]
    pub struct RequestEntry {
        pub method: String,
        pub url: String,
        pub ip: Option<String>,
        pub user_agent: Option<String>,
        pub payload: Option<Json>,
        pub user_id: Option<i32>,
        pub response_code: i32,
        pub response_body: Option<String>,
    }

    #[derive(Debug, Clone)]
    pub enum LogEntry {
        Model(ModelEntry),
        Request(RequestEntry),
    }

    /// Global log channel
    static LOG_TX: std::sync::OnceLock<mpsc::Sender<LogEntry>> = std::sync::OnceLock::new();

    /// Initialize the audit log service
    /// This function is idempotent - calling it multiple times is safe
    pub fn init(db: sea_orm::DatabaseConnection) {
        if LOG_TX.get().is_some() {
            tracing::debug!("Audit log service already initialized, skipping");
            return;
        }

        let (tx, mut rx) = mpsc::channel::<LogEntry>(200);
        if LOG_TX.set(tx).is_err() {
            tracing::debug!("Audit log service initialized by another thread");
            return;
        }

        tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                let result = match entry {
                    LogEntry::Model(entry) => model_log::ActiveModel {
                        model_type: Set(entry.model_type),
                        model_id: Set(entry.model_id),
                        event: Set(entry.event.to_string()),
                        changes: Set(Some(json!({ "before": entry.before, "after": entry.after }))),
                        user_id: Set(entry.user_id),
                        ..Default::default()
                    }
                    .insert(&db)
                    .await
                    .map(|_| ()),
                    LogEntry::Request(entry) => request_log::ActiveModel {
                        method: Set(entry.method),
                        url: Set(entry.url),
                        ip: Set(entry.ip),
                        user_agent: Set(entry.user_agent),
                        payload: Set(entry.payload),
                        user_id: Set(entry.user_id),
                        response_code: Set(entry.response_code),
                        response_body: Set(entry.response_body),
                        ..Default::default()
                    }
                    .insert(&db)
                    .await
                    .map(|_| ()),
                };

                if let Err(e) = result {
                    tracing::error!("Failed to write audit log: {}", e);
                }
            }
        });
    }

    /// Add an audit log entry
    pub fn add_log(entry: LogEntry) {
        if let Some(tx) = LOG_TX.get() {
            if tx.try_send(entry).is_err() {
                tracing::warn!("Log channel is full, audit log dropped");
            }
        } else {
            tracing::warn!("Audit log service not initialized, log dropped");
        }
    }

    fn snapshot<M: Serialize>(model: Option<&M>) -> Option<Json> {
        model.and_then(|m| serde_json::to_value(m).ok())
    }

    /// Record `event` on a model; `before`/`after` are the states around the change
    pub fn log_model<M: Serialize>(
        model_type: &str,
        model_id: Option<i32>,
        event: &'static str,
        before: Option<&M>,
        after: Option<&M>,
        user_id: i32,
    ) {
        add_log(LogEntry::Model(ModelEntry {
            model_type: model_type.to_string(),
            model_id,
            event,
            before: snapshot(before),
            after: snapshot(after),
            user_id: Some(user_id),
        }));
    }

    pub fn log_created<M: Serialize>(model_type: &str, id: impl Into<Option<i32>>, after: &M, user_id: i32) {
        log_model(model_type, id.into(), CREATED, None, Some(after), user_id);
    }

    pub fn log_updated<M: Serialize>(
        model_type: &str,
        id: impl Into<Option<i32>>,
        before: &M,
        after: &M,
        user_id: i32,
    ) {
        log_model(model_type, id.into(), UPDATED, Some(before), Some(after), user_id);
    }

    pub fn log_deleted<M: Serialize>(model_type: &str, id: impl Into<Option<i32>>, before: &M, user_id: i32) {
        log_model(model_type, id.into(), DELETED, Some(before), None::<&M>, user_id);
    }

    pub fn log_request(entry: RequestEntry) {
        add_log(LogEntry::Request(entry));
    }
}
