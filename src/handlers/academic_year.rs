//! Academic year handlers
//!
//! Activating a year deactivates every other year and moves the active
//! classrooms onto it, all in one transaction.

use axum::{extract::Path, response::Json, Extension};
use chrono::NaiveDate;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{record, restricted};
use crate::entity::{academic_year, classroom};
use crate::error::{AppError, AppResult, OptionExt};
use crate::extract::AppJson;
use crate::handlers::audit::service::{log_created, log_deleted, log_updated};
use crate::middleware::{CurrentUser, DbConn};
use crate::permission::perm;
use crate::query::{self, ListQuery, ListResponse};
use crate::routes::ApiResponse;
use crate::validation::{de, Validator};

const NOT_FOUND: &str = "Tahun ajaran tidak ditemukan";

#[derive(Debug, Deserialize)]
pub struct AcademicYearRequest {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub semester: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub start_date: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub end_date: Option<String>,
    #[serde(default, deserialize_with = "de::opt_bool")]
    pub active: Option<bool>,
}

#[derive(Debug)]
struct AcademicYearInput {
    name: String,
    semester: i32,
    start_date: NaiveDate,
    end_date: NaiveDate,
    /// `None` when the request leaves the flag out
    active: Option<bool>,
}

fn validate(req: AcademicYearRequest) -> AppResult<AcademicYearInput> {
    let mut v = Validator::new();
    let name = v.required_str("name", &req.name, "Nama tahun ajaran wajib diisi");
    v.max_len("name", name.as_deref(), 255, "Nama tahun ajaran maksimal 255 karakter");

    let semester = v.required("semester", &req.semester, "Semester wajib diisi");
    if let Some(s) = semester {
        v.check("semester", s == 1 || s == 2, "Semester harus 1 atau 2");
    }

    v.required_str("start_date", &req.start_date, "Tanggal mulai wajib diisi");
    v.required_str("end_date", &req.end_date, "Tanggal selesai wajib diisi");
    let start = v.date("start_date", req.start_date.as_deref(), "Format tanggal mulai tidak valid");
    let end = v.date("end_date", req.end_date.as_deref(), "Format tanggal selesai tidak valid");
    v.after("end_date", end, start, "Tanggal selesai harus setelah tanggal mulai");
    v.finish()?;
    let start_date = start.ok_or_else(|| AppError::invalid("start_date", "Tanggal mulai wajib diisi"))?;
    let end_date = end.ok_or_else(|| AppError::invalid("end_date", "Tanggal selesai wajib diisi"))?;

    Ok(AcademicYearInput {
        name: name.unwrap_or_default(),
        semester: semester.unwrap_or(1) as i32,
        start_date,
        end_date,
        active: req.active,
    })
}

/// Make `year_id` the only active year and point active classrooms at it
async fn activate<C: ConnectionTrait>(db: &C, year_id: i32) -> AppResult<()> {
    academic_year::Entity::update_many()
        .col_expr(academic_year::Column::Active, Expr::value(false))
        .filter(academic_year::Column::Id.ne(year_id))
        .exec(db)
        .await?;
    academic_year::Entity::update_many()
        .col_expr(academic_year::Column::Active, Expr::value(true))
        .filter(academic_year::Column::Id.eq(year_id))
        .exec(db)
        .await?;
    let moved = classroom::Entity::update_many()
        .col_expr(classroom::Column::AcademicYearId, Expr::value(year_id))
        .col_expr(classroom::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(classroom::Column::Active.eq(true))
        .exec(db)
        .await?;
    tracing::info!(
        "Academic year {} activated, {} classrooms moved",
        year_id,
        moved.rows_affected
    );
    Ok(())
}

/// GET /api/v1/academic-years
pub async fn list_academic_years(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    query: ListQuery,
) -> AppResult<Json<ListResponse>> {
    current_user.require(perm::ACADEMIC_YEARS_VIEW)?;
    let result = query::list(&db, academic_year::Entity::find(), &academic_year::QUERY, &query).await?;
    Ok(Json(result))
}

/// POST /api/v1/academic-years
pub async fn create_academic_year(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppJson(req): AppJson<AcademicYearRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::ACADEMIC_YEARS_CREATE)?;
    let input = validate(req)?;

    let txn = db.begin().await?;
    let created = academic_year::ActiveModel {
        name: Set(input.name),
        semester: Set(input.semester),
        start_date: Set(input.start_date),
        end_date: Set(input.end_date),
        active: Set(input.active.unwrap_or(false)),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    if created.active {
        activate(&txn, created.id).await?;
    }
    txn.commit().await?;

    log_created(academic_year::QUERY.model, created.id, &created, current_user.id);
    let data = record(&db, &academic_year::QUERY, &created, &[]).await?;
    Ok(Json(ApiResponse::with_message("Tahun ajaran berhasil dibuat", data)))
}

/// GET /api/v1/academic-years/:id
pub async fn get_academic_year(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::ACADEMIC_YEARS_VIEW)?;
    let found = academic_year::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;
    let data = record(&db, &academic_year::QUERY, &found, &[]).await?;
    Ok(Json(ApiResponse::success(data)))
}

/// PUT /api/v1/academic-years/:id
pub async fn update_academic_year(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
    AppJson(req): AppJson<AcademicYearRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::ACADEMIC_YEARS_UPDATE)?;
    let before = academic_year::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;
    let input = validate(req)?;

    let txn = db.begin().await?;
    let mut active: academic_year::ActiveModel = before.clone().into();
    active.name = Set(input.name);
    active.semester = Set(input.semester);
    active.start_date = Set(input.start_date);
    active.end_date = Set(input.end_date);
    if let Some(flag) = input.active {
        active.active = Set(flag);
    }
    let mut updated = active.update(&txn).await?;
    if input.active == Some(true) {
        activate(&txn, id).await?;
        updated = academic_year::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_not_found(NOT_FOUND)?;
    }
    txn.commit().await?;

    log_updated(academic_year::QUERY.model, id, &before, &updated, current_user.id);
    let data = record(&db, &academic_year::QUERY, &updated, &[]).await?;
    Ok(Json(ApiResponse::with_message("Tahun ajaran berhasil diupdate", data)))
}

/// DELETE /api/v1/academic-years/:id
pub async fn delete_academic_year(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require(perm::ACADEMIC_YEARS_DELETE)?;
    let found = academic_year::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;

    let txn = db.begin().await?;
    academic_year::Entity::delete_by_id(id)
        .exec(&txn)
        .await
        .map_err(|e| restricted(e, "academic_year", "Tahun ajaran masih digunakan"))?;
    txn.commit().await?;

    log_deleted(academic_year::QUERY.model, id, &found, current_user.id);
    Ok(Json(ApiResponse::message("Tahun ajaran berhasil dihapus")))
}

/// GET /api/v1/academic-years/options
pub async fn academic_year_options(Extension(db): Extension<DbConn>) -> AppResult<Json<ApiResponse<Vec<Value>>>> {
    let years = academic_year::Entity::find()
        .filter(academic_year::Column::Active.eq(true))
        .order_by_desc(academic_year::Column::StartDate)
        .all(&*db)
        .await?;
    let options = years
        .iter()
        .map(|y| json!({ "value": y.id, "label": y.label() }))
        .collect();
    Ok(Json(ApiResponse::success(options)))
}

/// GET /api/v1/academic-years/active
pub async fn active_academic_year(Extension(db): Extension<DbConn>) -> AppResult<Json<ApiResponse<Value>>> {
    let year = academic_year::active(&*db)
        .await?
        .ok_or_not_found("Tidak ada tahun ajaran aktif")?;
    let data = record(&db, &academic_year::QUERY, &year, &[]).await?;
    Ok(Json(ApiResponse::success(data)))
}

/// POST /api/v1/academic-years/:id/set-active
pub async fn set_active_academic_year(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::ACADEMIC_YEARS_UPDATE)?;
    let before = academic_year::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;

    let txn = db.begin().await?;
    activate(&txn, id).await?;
    let updated = academic_year::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_not_found(NOT_FOUND)?;
    txn.commit().await?;

    log_updated(academic_year::QUERY.model, id, &before, &updated, current_user.id);
    let data = record(&db, &academic_year::QUERY, &updated, &[]).await?;
    Ok(Json(ApiResponse::with_message("Tahun ajaran berhasil diaktifkan", data)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(semester: i64, start: &str, end: &str) -> AcademicYearRequest {
        AcademicYearRequest {
            name: Some("2024/2025".into()),
            semester: Some(semester),
            start_date: Some(start.into()),
            end_date: Some(end.into()),
            active: None,
        }
    }

    #[test]
    fn test_validate() {
        let input = validate(request(1, "2024-07-15", "2024-12-20")).unwrap();
        assert_eq!(input.semester, 1);
        assert_eq!(input.active, None);

        let err = validate(request(3, "2024-07-15", "2024-07-15")).unwrap_err();
        let AppError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get("semester"), Some(&["Semester harus 1 atau 2".to_string()][..]));
        assert_eq!(
            errors.get("end_date"),
            Some(&["Tanggal selesai harus setelah tanggal mulai".to_string()][..])
        );
    }
}
