//! Schedule handlers
//!
//! Teachers only see their own schedules; administrators see everything.

use axum::{extract::Path, response::Json, Extension};
use chrono::{NaiveDate, NaiveTime};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

use super::{record, records, require_active_year, today};
use crate::entity::{schedule, student_attendance, student_attendance_subject};
use crate::error::{AppError, AppResult, OptionExt};
use crate::extract::{AppJson, AppQuery};
use crate::handlers::audit::service::{log_created, log_deleted, log_updated};
use crate::middleware::{CurrentUser, DbConn};
use crate::permission::perm;
use crate::query::{self, ListQuery, ListResponse};
use crate::routes::ApiResponse;
use crate::validation::{self, de, Validator};

const NOT_FOUND: &str = "Jadwal tidak ditemukan";

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub teacher_id: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub subject_id: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub class_id: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub day: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub end_time: Option<String>,
    #[serde(default, deserialize_with = "de::opt_bool")]
    pub active: Option<bool>,
}

/// `?date=YYYY-MM-DD&teacher_id=`
#[derive(Debug, Deserialize)]
pub struct TodayQuery {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub teacher_id: Option<i64>,
}

struct ScheduleInput {
    teacher_id: i32,
    subject_id: i32,
    class_id: i32,
    day: String,
    start_time: NaiveTime,
    end_time: NaiveTime,
    active: Option<bool>,
}

async fn validate(db: &DatabaseConnection, req: ScheduleRequest) -> AppResult<ScheduleInput> {
    let mut v = Validator::new();

    let teacher_id = v.required("teacher_id", &req.teacher_id, "Guru wajib diisi");
    if let Some(id) = teacher_id {
        let found = validation::exists(db, "users", id).await?;
        v.check("teacher_id", found, "Guru tidak ditemukan");
    }
    let subject_id = v.required("subject_id", &req.subject_id, "Mata pelajaran wajib diisi");
    if let Some(id) = subject_id {
        let found = validation::exists(db, "subjects", id).await?;
        v.check("subject_id", found, "Mata pelajaran tidak ditemukan");
    }
    let class_id = v.required("class_id", &req.class_id, "Kelas wajib diisi");
    if let Some(id) = class_id {
        let found = validation::exists(db, "classes", id).await?;
        v.check("class_id", found, "Kelas tidak ditemukan");
    }

    let day = v.required_str("day", &req.day, "Hari wajib diisi");
    v.one_of("day", day.as_deref(), &schedule::DAYS, "Hari tidak valid");

    v.required_str("start_time", &req.start_time, "Jam mulai wajib diisi");
    v.required_str("end_time", &req.end_time, "Jam selesai wajib diisi");
    let start = v.time_hm("start_time", req.start_time.as_deref(), "Format jam mulai harus HH:MM");
    let end = v.time_hm("end_time", req.end_time.as_deref(), "Format jam selesai harus HH:MM");
    v.after("end_time", end, start, "Jam selesai harus setelah jam mulai");
    v.finish()?;

    let (Some(start_time), Some(end_time)) = (start, end) else {
        return Err(AppError::invalid("start_time", "Jam mulai wajib diisi"));
    };
    Ok(ScheduleInput {
        teacher_id: teacher_id.unwrap_or_default() as i32,
        subject_id: subject_id.unwrap_or_default() as i32,
        class_id: class_id.unwrap_or_default() as i32,
        day: day.unwrap_or_default(),
        start_time,
        end_time,
        active: req.active,
    })
}

/// Active schedules of `teacher_id` on the weekday of `date`; empty on Sunday
pub(crate) async fn schedules_on<C: ConnectionTrait>(
    db: &C,
    teacher_id: i32,
    date: NaiveDate,
) -> AppResult<Vec<schedule::Model>> {
    let Some(day) = schedule::day_name(date) else {
        return Ok(Vec::new());
    };
    let schedules = schedule::Entity::find()
        .filter(schedule::Column::TeacherId.eq(teacher_id))
        .filter(schedule::Column::Day.eq(day))
        .filter(schedule::Column::Active.eq(true))
        .order_by_asc(schedule::Column::StartTime)
        .all(db)
        .await?;
    Ok(schedules)
}

/// `(class_id, subject_id)` pairs that already have student attendance on `date`,
/// optionally only the ones taken by `teacher_id`
pub(crate) async fn attendance_filled<C: ConnectionTrait>(
    db: &C,
    date: NaiveDate,
    teacher_id: Option<i32>,
) -> AppResult<HashSet<(i32, i32)>> {
    let mut select = student_attendance::Entity::find().filter(student_attendance::Column::Date.eq(date));
    if let Some(teacher_id) = teacher_id {
        select = select.filter(student_attendance::Column::TeacherId.eq(teacher_id));
    }
    let headers = select.all(db).await?;
    if headers.is_empty() {
        return Ok(HashSet::new());
    }
    let subjects = student_attendance_subject::Entity::find()
        .filter(
            student_attendance_subject::Column::StudentAttendanceId
                .is_in(headers.iter().map(|h| h.id).collect::<Vec<_>>()),
        )
        .all(db)
        .await?;
    Ok(subjects
        .iter()
        .filter_map(|s| {
            headers
                .iter()
                .find(|h| h.id == s.student_attendance_id)
                .map(|h| (h.class_id, s.subject_id))
        })
        .collect())
}

/// GET /api/v1/schedules
pub async fn list_schedules(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    query: ListQuery,
) -> AppResult<Json<ListResponse>> {
    if !current_user.has_permission(perm::SCHEDULES_VIEW) {
        current_user.require(perm::MY_SCHEDULES_VIEW)?;
    }
    let mut select = schedule::Entity::find();
    if !current_user.is_admin() {
        select = select.filter(schedule::Column::TeacherId.eq(current_user.id));
    }
    let result = query::list(&db, select, &schedule::QUERY, &query).await?;
    Ok(Json(result))
}

/// POST /api/v1/schedules
pub async fn create_schedule(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppJson(req): AppJson<ScheduleRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::SCHEDULES_CREATE)?;
    let input = validate(&db, req).await?;

    let txn = db.begin().await?;
    let year = require_active_year(&txn).await?;
    let created = schedule::ActiveModel {
        teacher_id: Set(input.teacher_id),
        subject_id: Set(input.subject_id),
        class_id: Set(input.class_id),
        academic_year_id: Set(Some(year.id)),
        day: Set(input.day),
        start_time: Set(input.start_time),
        end_time: Set(input.end_time),
        active: Set(input.active.unwrap_or(true)),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    log_created(schedule::QUERY.model, created.id, &created, current_user.id);
    let data = record(&db, &schedule::QUERY, &created, &[]).await?;
    Ok(Json(ApiResponse::with_message("Jadwal berhasil dibuat", data)))
}

async fn find_visible(db: &DbConn, current_user: &CurrentUser, id: i32) -> AppResult<schedule::Model> {
    let found = schedule::Entity::find_by_id(id)
        .one(&**db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;
    if !current_user.is_admin() && found.teacher_id != current_user.id {
        return Err(AppError::NotFound(NOT_FOUND.to_string()));
    }
    Ok(found)
}

/// GET /api/v1/schedules/:id
pub async fn get_schedule(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Value>>> {
    if !current_user.has_permission(perm::SCHEDULES_VIEW) {
        current_user.require(perm::MY_SCHEDULES_VIEW)?;
    }
    let found = find_visible(&db, &current_user, id).await?;
    let data = record(&db, &schedule::QUERY, &found, &[]).await?;
    Ok(Json(ApiResponse::success(data)))
}

/// PUT /api/v1/schedules/:id
pub async fn update_schedule(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
    AppJson(req): AppJson<ScheduleRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::SCHEDULES_UPDATE)?;
    let before = schedule::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;
    let input = validate(&db, req).await?;

    let txn = db.begin().await?;
    let year = require_active_year(&txn).await?;
    let mut active: schedule::ActiveModel = before.clone().into();
    active.teacher_id = Set(input.teacher_id);
    active.subject_id = Set(input.subject_id);
    active.class_id = Set(input.class_id);
    active.academic_year_id = Set(Some(year.id));
    active.day = Set(input.day);
    active.start_time = Set(input.start_time);
    active.end_time = Set(input.end_time);
    if let Some(flag) = input.active {
        active.active = Set(flag);
    }
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    log_updated(schedule::QUERY.model, id, &before, &updated, current_user.id);
    let data = record(&db, &schedule::QUERY, &updated, &[]).await?;
    Ok(Json(ApiResponse::with_message("Jadwal berhasil diupdate", data)))
}

/// DELETE /api/v1/schedules/:id
pub async fn delete_schedule(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require(perm::SCHEDULES_DELETE)?;
    let found = schedule::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;

    let txn = db.begin().await?;
    schedule::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    log_deleted(schedule::QUERY.model, id, &found, current_user.id);
    Ok(Json(ApiResponse::message("Jadwal berhasil dihapus")))
}

/// GET /api/v1/schedules/today
pub async fn today_schedules(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppQuery(params): AppQuery<TodayQuery>,
) -> AppResult<Json<ApiResponse<Vec<Value>>>> {
    current_user.require(perm::MY_SCHEDULES_VIEW)?;
    let date = match params.date.as_deref() {
        Some(raw) => validation::parse_date(raw)
            .ok_or_else(|| AppError::invalid("date", "Format tanggal tidak valid"))?,
        None => today(),
    };
    let teacher_id = match params.teacher_id {
        Some(id) if current_user.is_admin() => id as i32,
        _ => current_user.id,
    };

    let filled = attendance_filled(&*db, date, None).await?;
    let pending: Vec<schedule::Model> = schedules_on(&*db, teacher_id, date)
        .await?
        .into_iter()
        .filter(|s| !filled.contains(&(s.class_id, s.subject_id)))
        .collect();

    let data = records(&db, &schedule::QUERY, &pending).await?;
    Ok(Json(ApiResponse::success(data)))
}
