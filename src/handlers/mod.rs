//! Request handlers module

pub mod academic_year;
pub mod audit;
pub mod auth;
pub mod classroom;
pub mod configuration;
pub mod journal;
pub mod report;
pub mod role;
pub mod schedule;
pub mod student;
pub mod student_attendance;
pub mod student_class_history;
pub mod subject;
pub mod teacher_attendance;
pub mod user;

use chrono::{Local, NaiveDate};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, SqlErr};
use serde::Serialize;
use serde_json::Value as Json;

use crate::entity::academic_year as year_entity;
use crate::error::{AppError, AppResult};
use crate::extract::Upload;
use crate::query::{self, Resource};
use crate::state::AppState;

/// Serialize one record with the resource's default relations plus `with`
pub async fn record<M: Serialize>(
    db: &DatabaseConnection,
    resource: &Resource,
    model: &M,
    with: &[&str],
) -> AppResult<Json> {
    let requested: Vec<String> = with.iter().map(|s| s.to_string()).collect();
    let with = resource.with_defaults(&requested);
    let rows = query::fetch_rows(db, resource, std::slice::from_ref(model), &with).await?;
    Ok(rows.into_iter().next().unwrap_or(Json::Null))
}

/// Serialize many records the same way
pub async fn records<M: Serialize>(
    db: &DatabaseConnection,
    resource: &Resource,
    models: &[M],
) -> AppResult<Vec<Json>> {
    let with = resource.with_defaults(&[]);
    query::fetch_rows(db, resource, models, &with).await
}

/// The active academic year; writes that depend on it fail with 422 otherwise
pub async fn require_active_year<C: ConnectionTrait>(db: &C) -> AppResult<year_entity::Model> {
    year_entity::active(db)
        .await?
        .ok_or_else(|| AppError::invalid("academic_year_id", "Tidak ada tahun ajaran aktif"))
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Write an image upload to `storage_dir/<kind>/` and return its path relative to the storage root
///
/// The stored extension comes from the file content, never from the client's file name.
pub async fn save_upload(state: &AppState, kind: &str, upload: &Upload) -> AppResult<String> {
    let ext = upload.image_kind().ok_or_else(|| AppError::invalid("photo", NOT_AN_IMAGE))?;
    let dir = state.upload_dir(kind);
    tokio::fs::create_dir_all(&dir).await?;
    let name = format!("{}.{}", uuid::Uuid::new_v4().simple(), ext);
    tokio::fs::write(dir.join(&name), &upload.data).await?;
    Ok(format!("{}/{}", kind, name))
}

/// Remove a previously stored upload; missing files are ignored
pub async fn remove_upload(state: &AppState, path: &str) {
    let full = state.config.storage_dir.join(path);
    if let Err(e) = tokio::fs::remove_file(&full).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove upload {}: {}", full.display(), e);
        }
    }
}

/// Remove an upload saved for a write that then failed
pub async fn discard_on_error<T>(state: &AppState, saved: Option<&str>, result: AppResult<T>) -> AppResult<T> {
    if result.is_err() {
        if let Some(path) = saved {
            remove_upload(state, path).await;
        }
    }
    result
}

const NOT_AN_IMAGE: &str = "File harus berupa gambar (jpeg, png, jpg)";

/// Image upload of at most `max_bytes`
pub fn check_image(field: &str, upload: &Upload, max_bytes: usize, too_large: &str) -> AppResult<()> {
    if !upload.is_image() {
        return Err(AppError::invalid(field, NOT_AN_IMAGE));
    }
    if upload.data.len() > max_bytes {
        return Err(AppError::invalid(field, too_large));
    }
    Ok(())
}

/// Foreign-key violations become a 422 carrying `message`
pub fn restricted(err: DbErr, field: &str, message: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => AppError::invalid(field, message),
        _ => err.into(),
    }
}

/// Unique violations become a 422 carrying `message`
pub fn duplicate(err: DbErr, field: &str, message: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::invalid(field, message),
        _ => err.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn state(dir: &str) -> AppState {
        let config = Config {
            storage_dir: std::env::temp_dir().join(dir),
            ..Default::default()
        };
        AppState::new(DatabaseConnection::Disconnected, config)
    }

    fn jpeg(file_name: &str) -> Upload {
        Upload {
            file_name: file_name.to_string(),
            content_type: "image/jpeg".to_string(),
            data: vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10],
        }
    }

    #[tokio::test]
    async fn test_save_upload_names_file_by_content() {
        let state = state("sekolah-upload-ext");
        let path = save_upload(&state, "users", &jpeg("foto.JPEG")).await.unwrap();
        assert!(path.starts_with("users/"));
        assert!(path.ends_with(".jpg"));
        remove_upload(&state, &path).await;

        let html = Upload {
            file_name: "x.png".to_string(),
            content_type: "image/png".to_string(),
            data: b"<script>alert(1)</script>".to_vec(),
        };
        assert!(save_upload(&state, "users", &html).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_write_discards_saved_upload() {
        let state = state("sekolah-upload-discard");
        let path = save_upload(&state, "attendance", &jpeg("in.jpg")).await.unwrap();
        let full = state.config.storage_dir.join(&path);
        assert!(full.exists());

        let ok: AppResult<i32> = discard_on_error(&state, Some(&path), Ok(1)).await;
        assert_eq!(ok.unwrap(), 1);
        assert!(full.exists());

        let failed: AppResult<i32> = Err(AppError::invalid("date", "Tanggal sudah ada"));
        assert!(discard_on_error(&state, Some(&path), failed).await.is_err());
        assert!(!full.exists());
    }
}
