//! Classroom handlers (table `classes`)

use axum::{extract::Path, response::Json, Extension};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::record;
use crate::entity::{academic_year, classroom, student};
use crate::error::{AppError, AppResult, OptionExt};
use crate::extract::AppJson;
use crate::handlers::audit::service::{log_created, log_deleted, log_updated};
use crate::middleware::{CurrentUser, DbConn};
use crate::permission::perm;
use crate::query::{self, ListQuery, ListResponse};
use crate::routes::ApiResponse;
use crate::validation::{self, de, Validator};

const NOT_FOUND: &str = "Kelas tidak ditemukan";
const HAS_STUDENTS: &str = "Kelas masih memiliki siswa";

#[derive(Debug, Deserialize)]
pub struct ClassroomRequest {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub teacher_id: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub academic_year_id: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_bool")]
    pub active: Option<bool>,
}

struct ClassroomInput {
    name: String,
    teacher_id: Option<i32>,
    academic_year_id: Option<i32>,
    active: Option<bool>,
}

async fn validate(db: &DatabaseConnection, req: ClassroomRequest, ignore_id: Option<i32>) -> AppResult<ClassroomInput> {
    let mut v = Validator::new();
    let name = v.required_str("name", &req.name, "Nama kelas wajib diisi");
    v.max_len("name", name.as_deref(), 255, "Nama kelas maksimal 255 karakter");
    if let Some(name) = &name {
        let free = validation::is_unique(db, "classes", "name", name.clone(), ignore_id.map(i64::from)).await?;
        v.check("name", free, "Nama kelas sudah digunakan");
    }
    if let Some(teacher_id) = req.teacher_id {
        let found = validation::exists(db, "users", teacher_id).await?;
        v.check("teacher_id", found, "Wali kelas tidak ditemukan");
    }
    if let Some(year_id) = req.academic_year_id {
        let found = validation::exists(db, "academic_years", year_id).await?;
        v.check("academic_year_id", found, "Tahun ajaran tidak ditemukan");
    }
    v.finish()?;

    let academic_year_id = match req.academic_year_id {
        Some(id) => Some(id as i32),
        None => academic_year::active(db).await?.map(|y| y.id),
    };
    Ok(ClassroomInput {
        name: name.unwrap_or_default(),
        teacher_id: req.teacher_id.map(|id| id as i32),
        academic_year_id,
        active: req.active,
    })
}

/// Classrooms among `ids` that still have students
async fn occupied(db: &DatabaseConnection, ids: Vec<i32>) -> AppResult<Vec<i32>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let occupied = student::Entity::find()
        .select_only()
        .column(student::Column::ClassId)
        .filter(student::Column::ClassId.is_in(ids))
        .distinct()
        .into_tuple::<i32>()
        .all(db)
        .await?;
    Ok(occupied)
}

/// Set `deleteable` on serialized classroom rows
async fn mark_deleteable(db: &DatabaseConnection, rows: &mut [Value]) -> AppResult<()> {
    let ids: Vec<i32> = rows
        .iter()
        .filter_map(|r| r.get("id").and_then(Value::as_i64))
        .map(|id| id as i32)
        .collect();
    let occupied = occupied(db, ids).await?;
    for row in rows.iter_mut() {
        let id = row.get("id").and_then(Value::as_i64).map(|id| id as i32);
        if let (Value::Object(map), Some(id)) = (row, id) {
            map.insert("deleteable".to_string(), json!(!occupied.contains(&id)));
        }
    }
    Ok(())
}

/// GET /api/v1/classrooms
pub async fn list_classrooms(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    query: ListQuery,
) -> AppResult<Json<ListResponse>> {
    current_user.require(perm::CLASSROOMS_VIEW)?;
    let mut result = query::list(&db, classroom::Entity::find(), &classroom::QUERY, &query).await?;
    mark_deleteable(&db, &mut result.data).await?;
    Ok(Json(result))
}

/// POST /api/v1/classrooms
pub async fn create_classroom(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppJson(req): AppJson<ClassroomRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::CLASSROOMS_CREATE)?;
    let input = validate(&db, req, None).await?;

    let txn = db.begin().await?;
    let created = classroom::ActiveModel {
        name: Set(input.name),
        teacher_id: Set(input.teacher_id),
        academic_year_id: Set(input.academic_year_id),
        active: Set(input.active.unwrap_or(true)),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    log_created(classroom::QUERY.model, created.id, &created, current_user.id);
    let data = record(&db, &classroom::QUERY, &created, &["teacher", "academic_year"]).await?;
    Ok(Json(ApiResponse::with_message("Kelas berhasil dibuat", data)))
}

/// GET /api/v1/classrooms/:id
pub async fn get_classroom(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::CLASSROOMS_VIEW)?;
    let found = classroom::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;
    let mut data = record(&db, &classroom::QUERY, &found, &["teacher", "academic_year", "students"]).await?;
    mark_deleteable(&db, std::slice::from_mut(&mut data)).await?;
    Ok(Json(ApiResponse::success(data)))
}

/// PUT /api/v1/classrooms/:id
pub async fn update_classroom(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
    AppJson(req): AppJson<ClassroomRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::CLASSROOMS_UPDATE)?;
    let before = classroom::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;
    let input = validate(&db, req, Some(id)).await?;

    let txn = db.begin().await?;
    let mut active: classroom::ActiveModel = before.clone().into();
    active.name = Set(input.name);
    active.teacher_id = Set(input.teacher_id);
    active.academic_year_id = Set(input.academic_year_id);
    if let Some(flag) = input.active {
        active.active = Set(flag);
    }
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    log_updated(classroom::QUERY.model, id, &before, &updated, current_user.id);
    let data = record(&db, &classroom::QUERY, &updated, &["teacher", "academic_year"]).await?;
    Ok(Json(ApiResponse::with_message("Kelas berhasil diupdate", data)))
}

/// DELETE /api/v1/classrooms/:id
pub async fn delete_classroom(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require(perm::CLASSROOMS_DELETE)?;
    let found = classroom::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;

    let students = student::Entity::find()
        .filter(student::Column::ClassId.eq(id))
        .count(&*db)
        .await?;
    if students > 0 {
        return Err(AppError::invalid("class_id", HAS_STUDENTS));
    }

    let txn = db.begin().await?;
    classroom::Entity::delete_by_id(id)
        .exec(&txn)
        .await
        .map_err(|e| super::restricted(e, "class_id", "Kelas masih digunakan"))?;
    txn.commit().await?;

    log_deleted(classroom::QUERY.model, id, &found, current_user.id);
    Ok(Json(ApiResponse::message("Kelas berhasil dihapus")))
}

/// GET /api/v1/classrooms/options
pub async fn classroom_options(Extension(db): Extension<DbConn>) -> AppResult<Json<ApiResponse<Vec<Value>>>> {
    let classes = classroom::Entity::find()
        .filter(classroom::Column::Active.eq(true))
        .order_by_asc(classroom::Column::Name)
        .all(&*db)
        .await?;
    let options = classes
        .iter()
        .map(|c| json!({ "value": c.id, "label": c.name }))
        .collect();
    Ok(Json(ApiResponse::success(options)))
}
