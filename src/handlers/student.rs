//! Student handlers
//!
//! Class changes are tracked in `student_class_histories`.

use axum::{extract::Path, response::Json, Extension};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::Value;

use super::{record, restricted, today};
use crate::entity::{academic_year, student, student_class_history};
use crate::error::{AppResult, OptionExt};
use crate::extract::AppJson;
use crate::handlers::audit::service::{log_created, log_deleted, log_updated};
use crate::middleware::{CurrentUser, DbConn};
use crate::permission::perm;
use crate::query::{self, ListQuery, ListResponse};
use crate::routes::ApiResponse;
use crate::validation::{self, de, Validator};

const NOT_FOUND: &str = "Siswa tidak ditemukan";

#[derive(Debug, Deserialize)]
pub struct StudentRequest {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub nis: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub class_id: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "de::opt_bool")]
    pub active: Option<bool>,
}

struct StudentInput {
    nis: String,
    name: String,
    gender: String,
    class_id: i32,
    phone: Option<String>,
    active: Option<bool>,
}

async fn validate(db: &DatabaseConnection, req: StudentRequest, ignore_id: Option<i32>) -> AppResult<StudentInput> {
    let ignore = ignore_id.map(i64::from);
    let mut v = Validator::new();

    let nis = v.required_str("nis", &req.nis, "NIS wajib diisi");
    v.max_len("nis", nis.as_deref(), 50, "NIS maksimal 50 karakter");
    if let Some(nis) = &nis {
        let free = validation::is_unique(db, "students", "nis", nis.clone(), ignore).await?;
        v.check("nis", free, "NIS sudah digunakan");
    }

    let name = v.required_str("name", &req.name, "Nama siswa wajib diisi");
    v.max_len("name", name.as_deref(), 255, "Nama siswa maksimal 255 karakter");

    let gender = v.required_str("gender", &req.gender, "Jenis kelamin wajib diisi");
    v.one_of("gender", gender.as_deref(), &student::GENDERS, "Jenis kelamin harus L atau P");

    let class_id = v.required("class_id", &req.class_id, "Kelas wajib diisi");
    if let Some(class_id) = class_id {
        let found = validation::exists(db, "classes", class_id).await?;
        v.check("class_id", found, "Kelas tidak ditemukan");
    }

    let phone = req.phone.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    v.max_len("phone", phone.as_deref(), 20, "Nomor telepon maksimal 20 karakter");
    if let Some(phone) = &phone {
        let free = validation::is_unique(db, "students", "phone", phone.clone(), ignore).await?;
        v.check("phone", free, "Nomor telepon sudah digunakan");
    }
    v.finish()?;

    Ok(StudentInput {
        nis: nis.unwrap_or_default(),
        name: name.unwrap_or_default(),
        gender: gender.unwrap_or_default(),
        class_id: class_id.unwrap_or_default() as i32,
        phone,
        active: req.active,
    })
}

/// Close the open history rows of `student_id` and open one for `class_id` in the active year
async fn record_class_change<C: ConnectionTrait>(db: &C, student_id: i32, class_id: i32) -> AppResult<()> {
    let Some(year) = academic_year::active(db).await? else {
        tracing::debug!("No active academic year, class history of student {} not recorded", student_id);
        return Ok(());
    };
    let today = today();

    student_class_history::Entity::update_many()
        .col_expr(student_class_history::Column::EndDate, Expr::value(today))
        .col_expr(student_class_history::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(student_class_history::Column::StudentId.eq(student_id))
        .filter(student_class_history::Column::EndDate.is_null())
        .exec(db)
        .await?;

    student_class_history::ActiveModel {
        class_id: Set(class_id),
        student_id: Set(student_id),
        academic_year_id: Set(year.id),
        start_date: Set(Some(today)),
        end_date: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(())
}

/// GET /api/v1/students
pub async fn list_students(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    query: ListQuery,
) -> AppResult<Json<ListResponse>> {
    current_user.require(perm::STUDENTS_VIEW)?;
    let result = query::list(&db, student::Entity::find(), &student::QUERY, &query).await?;
    Ok(Json(result))
}

/// POST /api/v1/students
pub async fn create_student(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppJson(req): AppJson<StudentRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::STUDENTS_CREATE)?;
    let input = validate(&db, req, None).await?;

    let txn = db.begin().await?;
    let created = student::ActiveModel {
        nis: Set(input.nis),
        name: Set(input.name),
        gender: Set(input.gender),
        class_id: Set(input.class_id),
        phone: Set(input.phone),
        active: Set(input.active.unwrap_or(true)),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    record_class_change(&txn, created.id, created.class_id).await?;
    txn.commit().await?;

    log_created(student::QUERY.model, created.id, &created, current_user.id);
    let data = record(&db, &student::QUERY, &created, &["classroom"]).await?;
    Ok(Json(ApiResponse::with_message("Siswa berhasil dibuat", data)))
}

/// GET /api/v1/students/:id
pub async fn get_student(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::STUDENTS_VIEW)?;
    let found = student::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;
    let data = record(&db, &student::QUERY, &found, &["classroom"]).await?;
    Ok(Json(ApiResponse::success(data)))
}

/// PUT /api/v1/students/:id
pub async fn update_student(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
    AppJson(req): AppJson<StudentRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::STUDENTS_UPDATE)?;
    let before = student::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;
    let input = validate(&db, req, Some(id)).await?;
    let moved = input.class_id != before.class_id;

    let txn = db.begin().await?;
    let mut active: student::ActiveModel = before.clone().into();
    active.nis = Set(input.nis);
    active.name = Set(input.name);
    active.gender = Set(input.gender);
    active.class_id = Set(input.class_id);
    active.phone = Set(input.phone);
    if let Some(flag) = input.active {
        active.active = Set(flag);
    }
    let updated = active.update(&txn).await?;
    if moved {
        record_class_change(&txn, id, updated.class_id).await?;
    }
    txn.commit().await?;

    log_updated(student::QUERY.model, id, &before, &updated, current_user.id);
    let data = record(&db, &student::QUERY, &updated, &["classroom"]).await?;
    Ok(Json(ApiResponse::with_message("Siswa berhasil diupdate", data)))
}

/// DELETE /api/v1/students/:id
pub async fn delete_student(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require(perm::STUDENTS_DELETE)?;
    let found = student::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;

    let txn = db.begin().await?;
    student::Entity::delete_by_id(id)
        .exec(&txn)
        .await
        .map_err(|e| restricted(e, "student_id", "Siswa masih memiliki data kehadiran"))?;
    txn.commit().await?;

    log_deleted(student::QUERY.model, id, &found, current_user.id);
    Ok(Json(ApiResponse::message("Siswa berhasil dihapus")))
}
