//! Subject handlers

use axum::{extract::Path, response::Json, Extension};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{record, restricted};
use crate::entity::{schedule, subject};
use crate::error::{AppError, AppResult, OptionExt};
use crate::extract::AppJson;
use crate::handlers::audit::service::{log_created, log_deleted, log_updated};
use crate::middleware::{CurrentUser, DbConn};
use crate::permission::perm;
use crate::query::{self, ListQuery, ListResponse};
use crate::routes::ApiResponse;
use crate::validation::{de, Validator};

const NOT_FOUND: &str = "Mata pelajaran tidak ditemukan";
const IN_USE: &str = "Mata pelajaran masih digunakan pada jadwal";

#[derive(Debug, Deserialize)]
pub struct SubjectRequest {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_bool")]
    pub active: Option<bool>,
}

fn validate(req: SubjectRequest) -> AppResult<(String, Option<bool>)> {
    let mut v = Validator::new();
    let name = v.required_str("name", &req.name, "Nama mata pelajaran wajib diisi");
    v.max_len("name", name.as_deref(), 255, "Nama mata pelajaran maksimal 255 karakter");
    v.finish()?;
    Ok((name.unwrap_or_default(), req.active))
}

/// GET /api/v1/subjects
pub async fn list_subjects(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    query: ListQuery,
) -> AppResult<Json<ListResponse>> {
    current_user.require(perm::SUBJECTS_VIEW)?;
    let result = query::list(&db, subject::Entity::find(), &subject::QUERY, &query).await?;
    Ok(Json(result))
}

/// POST /api/v1/subjects
pub async fn create_subject(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppJson(req): AppJson<SubjectRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::SUBJECTS_CREATE)?;
    let (name, active) = validate(req)?;

    let txn = db.begin().await?;
    let created = subject::ActiveModel {
        name: Set(name),
        active: Set(active.unwrap_or(true)),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    log_created(subject::QUERY.model, created.id, &created, current_user.id);
    let data = record(&db, &subject::QUERY, &created, &[]).await?;
    Ok(Json(ApiResponse::with_message("Mata pelajaran berhasil dibuat", data)))
}

/// GET /api/v1/subjects/:id
pub async fn get_subject(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::SUBJECTS_VIEW)?;
    let found = subject::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;
    let data = record(&db, &subject::QUERY, &found, &[]).await?;
    Ok(Json(ApiResponse::success(data)))
}

/// PUT /api/v1/subjects/:id
pub async fn update_subject(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
    AppJson(req): AppJson<SubjectRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::SUBJECTS_UPDATE)?;
    let before = subject::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;
    let (name, active_flag) = validate(req)?;

    let txn = db.begin().await?;
    let mut active: subject::ActiveModel = before.clone().into();
    active.name = Set(name);
    if let Some(flag) = active_flag {
        active.active = Set(flag);
    }
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    log_updated(subject::QUERY.model, id, &before, &updated, current_user.id);
    let data = record(&db, &subject::QUERY, &updated, &[]).await?;
    Ok(Json(ApiResponse::with_message("Mata pelajaran berhasil diupdate", data)))
}

/// DELETE /api/v1/subjects/:id
pub async fn delete_subject(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require(perm::SUBJECTS_DELETE)?;
    let found = subject::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;

    let schedules = schedule::Entity::find()
        .filter(schedule::Column::SubjectId.eq(id))
        .count(&*db)
        .await?;
    if schedules > 0 {
        return Err(AppError::invalid("subject_id", IN_USE));
    }

    let txn = db.begin().await?;
    subject::Entity::delete_by_id(id)
        .exec(&txn)
        .await
        .map_err(|e| restricted(e, "subject_id", "Mata pelajaran masih digunakan"))?;
    txn.commit().await?;

    log_deleted(subject::QUERY.model, id, &found, current_user.id);
    Ok(Json(ApiResponse::message("Mata pelajaran berhasil dihapus")))
}

/// GET /api/v1/subjects/options
pub async fn subject_options(Extension(db): Extension<DbConn>) -> AppResult<Json<ApiResponse<Vec<Value>>>> {
    let subjects = subject::Entity::find()
        .filter(subject::Column::Active.eq(true))
        .order_by_asc(subject::Column::Name)
        .all(&*db)
        .await?;
    let options = subjects
        .iter()
        .map(|s| json!({ "value": s.id, "label": s.name }))
        .collect();
    Ok(Json(ApiResponse::success(options)))
}
