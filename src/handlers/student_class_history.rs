//! Student class history handlers

use axum::{extract::Path, response::Json, Extension};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{record, today};
use crate::entity::student_class_history;
use crate::error::{AppError, AppResult, OptionExt};
use crate::extract::AppJson;
use crate::handlers::audit::service::{log_created, log_deleted, log_updated};
use crate::middleware::{CurrentUser, DbConn};
use crate::permission::perm;
use crate::query::{self, ListQuery, ListResponse};
use crate::routes::ApiResponse;
use crate::validation::{self, de, Validator};

const NOT_FOUND: &str = "Riwayat kelas siswa tidak ditemukan";

#[derive(Debug, Deserialize)]
pub struct ClassHistoryRequest {
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub class_id: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub student_id: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub academic_year_id: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub start_date: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub end_date: Option<String>,
}

struct ClassHistoryInput {
    class_id: i32,
    student_id: i32,
    academic_year_id: i32,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

async fn validate(db: &DatabaseConnection, req: ClassHistoryRequest) -> AppResult<ClassHistoryInput> {
    let mut v = Validator::new();

    let class_id = v.required("class_id", &req.class_id, "Kelas wajib diisi");
    if let Some(id) = class_id {
        let found = validation::exists(db, "classes", id).await?;
        v.check("class_id", found, "Kelas tidak ditemukan");
    }
    let student_id = v.required("student_id", &req.student_id, "Siswa wajib diisi");
    if let Some(id) = student_id {
        let found = validation::exists(db, "students", id).await?;
        v.check("student_id", found, "Siswa tidak ditemukan");
    }
    let year_id = v.required("academic_year_id", &req.academic_year_id, "Tahun ajaran wajib diisi");
    if let Some(id) = year_id {
        let found = validation::exists(db, "academic_years", id).await?;
        v.check("academic_year_id", found, "Tahun ajaran tidak ditemukan");
    }

    let start_date = v.date("start_date", req.start_date.as_deref(), "Format tanggal mulai tidak valid");
    let end_date = v.date("end_date", req.end_date.as_deref(), "Format tanggal selesai tidak valid");
    v.after_or_equal(
        "end_date",
        end_date,
        start_date,
        "Tanggal selesai harus sama atau setelah tanggal mulai",
    );
    v.finish()?;

    Ok(ClassHistoryInput {
        class_id: class_id.unwrap_or_default() as i32,
        student_id: student_id.unwrap_or_default() as i32,
        academic_year_id: year_id.unwrap_or_default() as i32,
        start_date,
        end_date,
    })
}

/// Histories matching `filter`, newest start first, with `with` loaded
async fn histories_where(db: &DbConn, filter: Condition, with: &[&str]) -> AppResult<Vec<Value>> {
    let rows = student_class_history::Entity::find()
        .filter(filter)
        .order_by_desc(student_class_history::Column::StartDate)
        .all(&**db)
        .await?;
    let with: Vec<String> = with.iter().map(|s| s.to_string()).collect();
    query::fetch_rows(db, &student_class_history::QUERY, &rows, &with).await
}

/// GET /api/v1/student-class-histories
pub async fn list_class_histories(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    query: ListQuery,
) -> AppResult<Json<ListResponse>> {
    current_user.require(perm::STUDENTS_VIEW)?;
    let result = query::list(
        &db,
        student_class_history::Entity::find(),
        &student_class_history::QUERY,
        &query,
    )
    .await?;
    Ok(Json(result))
}

/// POST /api/v1/student-class-histories
pub async fn create_class_history(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppJson(req): AppJson<ClassHistoryRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::STUDENTS_UPDATE)?;
    let input = validate(&db, req).await?;

    let txn = db.begin().await?;
    let created = student_class_history::ActiveModel {
        class_id: Set(input.class_id),
        student_id: Set(input.student_id),
        academic_year_id: Set(input.academic_year_id),
        start_date: Set(input.start_date),
        end_date: Set(input.end_date),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    log_created(student_class_history::QUERY.model, created.id, &created, current_user.id);
    let data = record(&db, &student_class_history::QUERY, &created, &[]).await?;
    Ok(Json(ApiResponse::with_message(
        "Riwayat kelas siswa berhasil dibuat",
        json!({ "student_class_history": data }),
    )))
}

/// GET /api/v1/student-class-histories/:id
pub async fn get_class_history(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::STUDENTS_VIEW)?;
    let found = student_class_history::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;
    let data = record(&db, &student_class_history::QUERY, &found, &[]).await?;
    Ok(Json(ApiResponse::success(json!({ "student_class_history": data }))))
}

/// PUT /api/v1/student-class-histories/:id
pub async fn update_class_history(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
    AppJson(req): AppJson<ClassHistoryRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::STUDENTS_UPDATE)?;
    let before = student_class_history::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;
    let input = validate(&db, req).await?;

    let mut active: student_class_history::ActiveModel = before.clone().into();
    active.class_id = Set(input.class_id);
    active.student_id = Set(input.student_id);
    active.academic_year_id = Set(input.academic_year_id);
    active.start_date = Set(input.start_date);
    active.end_date = Set(input.end_date);
    let updated = active.update(&*db).await?;

    log_updated(student_class_history::QUERY.model, id, &before, &updated, current_user.id);
    let data = record(&db, &student_class_history::QUERY, &updated, &[]).await?;
    Ok(Json(ApiResponse::with_message(
        "Riwayat kelas siswa berhasil diupdate",
        json!({ "student_class_history": data }),
    )))
}

/// DELETE /api/v1/student-class-histories/:id
pub async fn delete_class_history(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::STUDENTS_UPDATE)?;
    let found = student_class_history::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;
    student_class_history::Entity::delete_by_id(id).exec(&*db).await?;

    log_deleted(student_class_history::QUERY.model, id, &found, current_user.id);
    Ok(Json(ApiResponse::with_message(
        "Riwayat kelas siswa berhasil dihapus",
        json!({ "student_class_history": found }),
    )))
}

/// GET /api/v1/student-class-histories/student/:id
pub async fn histories_by_student(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(student_id): Path<i32>,
) -> AppResult<Json<ApiResponse<Vec<Value>>>> {
    current_user.require(perm::STUDENTS_VIEW)?;
    let cond = Condition::all().add(student_class_history::Column::StudentId.eq(student_id));
    let data = histories_where(&db, cond, &["class", "academic_year"]).await?;
    Ok(Json(ApiResponse::success(data)))
}

/// GET /api/v1/student-class-histories/class/:id
pub async fn histories_by_class(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(class_id): Path<i32>,
) -> AppResult<Json<ApiResponse<Vec<Value>>>> {
    current_user.require(perm::STUDENTS_VIEW)?;
    let cond = Condition::all().add(student_class_history::Column::ClassId.eq(class_id));
    let data = histories_where(&db, cond, &["student", "academic_year"]).await?;
    Ok(Json(ApiResponse::success(data)))
}

/// GET /api/v1/student-class-histories/academic-year/:id
pub async fn histories_by_academic_year(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(year_id): Path<i32>,
) -> AppResult<Json<ApiResponse<Vec<Value>>>> {
    current_user.require(perm::STUDENTS_VIEW)?;
    let cond = Condition::all().add(student_class_history::Column::AcademicYearId.eq(year_id));
    let data = histories_where(&db, cond, &["class", "student"]).await?;
    Ok(Json(ApiResponse::success(data)))
}

/// GET /api/v1/student-class-histories/student/:id/current
///
/// The history row that is still open or ends today or later.
pub async fn current_class(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(student_id): Path<i32>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::STUDENTS_VIEW)?;
    let found = student_class_history::Entity::find()
        .filter(student_class_history::Column::StudentId.eq(student_id))
        .filter(
            Condition::any()
                .add(student_class_history::Column::EndDate.is_null())
                .add(student_class_history::Column::EndDate.gte(today())),
        )
        .order_by_desc(student_class_history::Column::StartDate)
        .order_by_desc(student_class_history::Column::Id)
        .one(&*db)
        .await?
        .ok_or_else(|| AppError::NotFound("Siswa tidak memiliki kelas aktif".to_string()))?;
    let data = record(&db, &student_class_history::QUERY, &found, &[]).await?;
    Ok(Json(ApiResponse::success(data)))
}
