//! Student attendance handlers
//!
//! One header per class per day, with the subjects it covers and a status
//! row for every student.

use axum::{extract::Path, response::Json, Extension};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;

use super::schedule::schedules_on;
use super::{duplicate, record, records, require_active_year, today};
use crate::entity::{
    academic_year, classroom, schedule, student, student_attendance, student_attendance_detail,
    student_attendance_subject,
};
use crate::error::{AppError, AppResult, OptionExt};
use crate::extract::{AppJson, AppQuery};
use crate::handlers::audit::service::{log_created, log_deleted, log_updated};
use crate::middleware::{CurrentUser, DbConn};
use crate::permission::perm;
use crate::query::{self, ListQuery, ListResponse};
use crate::routes::ApiResponse;
use crate::validation::{self, de, Validator};

const NOT_FOUND: &str = "Data kehadiran tidak ditemukan";
const DUPLICATE_DATE: &str = "Tanggal kehadiran sudah ada";

#[derive(Debug, Clone, Deserialize)]
pub struct SubjectItem {
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub subject_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetailItem {
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub student_id: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StudentAttendanceRequest {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub class_id: Option<i64>,
    #[serde(default)]
    pub subjects: Option<Vec<SubjectItem>>,
    #[serde(default)]
    pub details: Option<Vec<DetailItem>>,
}

/// Body of `save-class`
#[derive(Debug, Deserialize)]
pub struct ClassAttendanceRequest {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub class_id: Option<i64>,
    #[serde(default)]
    pub students: Option<Vec<DetailItem>>,
    #[serde(default)]
    pub subjects: Option<Vec<SubjectItem>>,
}

#[derive(Debug, Deserialize)]
pub struct TeacherDataQuery {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub class_id: Option<i64>,
}

struct Detail {
    student_id: i32,
    status: String,
    note: Option<String>,
}

struct AttendanceInput {
    date: NaiveDate,
    class_id: i32,
    subject_ids: Vec<i32>,
    details: Vec<Detail>,
}

async fn check_class(v: &mut Validator, db: &DatabaseConnection, class_id: Option<i64>) -> AppResult<()> {
    if let Some(id) = class_id {
        let found = validation::exists(db, "classes", id).await?;
        v.check("class_id", found, "Kelas tidak ditemukan");
    }
    Ok(())
}

async fn check_subjects(v: &mut Validator, db: &DatabaseConnection, items: &[SubjectItem]) -> AppResult<Vec<i32>> {
    let mut ids = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let field = format!("subjects.{}.subject_id", i);
        match item.subject_id {
            Some(id) if validation::exists(db, "subjects", id).await? => {
                if !ids.contains(&(id as i32)) {
                    ids.push(id as i32);
                }
            }
            Some(_) => v.error(&field, "Mata pelajaran tidak ditemukan"),
            None => v.error(&field, "Mata pelajaran wajib diisi"),
        }
    }
    Ok(ids)
}

async fn check_details(
    v: &mut Validator,
    db: &DatabaseConnection,
    field: &str,
    items: Vec<DetailItem>,
) -> AppResult<Vec<Detail>> {
    let mut details = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        let prefix = format!("{}.{}", field, i);
        let student_id = v.required(&format!("{}.student_id", prefix), &item.student_id, "Siswa wajib diisi");
        if let Some(id) = student_id {
            let found = validation::exists(db, "students", id).await?;
            v.check(&format!("{}.student_id", prefix), found, "Siswa tidak ditemukan");
        }
        let status = v.required_str(&format!("{}.status", prefix), &item.status, "Status wajib diisi");
        v.one_of(
            &format!("{}.status", prefix),
            status.as_deref(),
            &student_attendance::STATUSES,
            "Status harus hadir, ijin, sakit, alpa atau telat",
        );
        v.max_len(&format!("{}.note", prefix), item.note.as_deref(), 500, "Catatan maksimal 500 karakter");

        if let (Some(student_id), Some(status)) = (student_id, status) {
            details.push(Detail {
                student_id: student_id as i32,
                status,
                note: item.note.filter(|n| !n.trim().is_empty()),
            });
        }
    }
    Ok(details)
}

async fn validate(db: &DatabaseConnection, req: StudentAttendanceRequest) -> AppResult<AttendanceInput> {
    let mut v = Validator::new();

    v.required_str("date", &req.date, "Tanggal wajib diisi");
    let date = v.date("date", req.date.as_deref(), "Format tanggal tidak valid");
    let class_id = v.required("class_id", &req.class_id, "Kelas wajib diisi");
    check_class(&mut v, db, class_id).await?;

    let subjects = v.array_min("subjects", &req.subjects, 1, "Minimal satu mata pelajaran harus dipilih");
    let subject_ids = check_subjects(&mut v, db, &subjects).await?;

    let details = v.array_min("details", &req.details, 1, "Minimal satu data siswa harus diisi");
    let details = check_details(&mut v, db, "details", details).await?;
    v.finish()?;

    let date = date.ok_or_else(|| AppError::invalid("date", "Tanggal wajib diisi"))?;
    Ok(AttendanceInput {
        date,
        class_id: class_id.unwrap_or_default() as i32,
        subject_ids,
        details,
    })
}

/// Another header already exists for `(date, class_id)`
async fn date_taken<C: ConnectionTrait>(db: &C, date: NaiveDate, class_id: i32, ignore: Option<i32>) -> AppResult<bool> {
    let mut select = student_attendance::Entity::find()
        .filter(student_attendance::Column::Date.eq(date))
        .filter(student_attendance::Column::ClassId.eq(class_id));
    if let Some(id) = ignore {
        select = select.filter(student_attendance::Column::Id.ne(id));
    }
    Ok(select.one(db).await?.is_some())
}

async fn replace_subjects<C: ConnectionTrait>(db: &C, attendance_id: i32, subject_ids: &[i32]) -> AppResult<()> {
    student_attendance_subject::Entity::delete_many()
        .filter(student_attendance_subject::Column::StudentAttendanceId.eq(attendance_id))
        .exec(db)
        .await?;
    for subject_id in subject_ids {
        student_attendance_subject::ActiveModel {
            student_attendance_id: Set(attendance_id),
            subject_id: Set(*subject_id),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

async fn replace_details<C: ConnectionTrait>(db: &C, attendance_id: i32, details: Vec<Detail>) -> AppResult<()> {
    student_attendance_detail::Entity::delete_many()
        .filter(student_attendance_detail::Column::StudentAttendanceId.eq(attendance_id))
        .exec(db)
        .await?;
    for detail in details {
        student_attendance_detail::ActiveModel {
            student_attendance_id: Set(attendance_id),
            student_id: Set(detail.student_id),
            status: Set(detail.status),
            note: Set(detail.note),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

/// GET /api/v1/student-attendances
pub async fn list_student_attendances(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    query: ListQuery,
) -> AppResult<Json<ListResponse>> {
    current_user.require(perm::STUDENT_ATTENDANCES_VIEW)?;
    let result = query::list(&db, student_attendance::Entity::find(), &student_attendance::QUERY, &query).await?;
    Ok(Json(result))
}

/// POST /api/v1/student-attendances
pub async fn create_student_attendance(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppJson(req): AppJson<StudentAttendanceRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::STUDENT_ATTENDANCES_VIEW)?;
    let input = validate(&db, req).await?;
    if date_taken(&*db, input.date, input.class_id, None).await? {
        return Err(AppError::invalid("date", DUPLICATE_DATE));
    }

    let txn = db.begin().await?;
    let year = require_active_year(&txn).await?;
    let created = student_attendance::ActiveModel {
        date: Set(input.date),
        teacher_id: Set(current_user.id),
        class_id: Set(input.class_id),
        academic_year_id: Set(Some(year.id)),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| duplicate(e, "date", DUPLICATE_DATE))?;
    replace_subjects(&txn, created.id, &input.subject_ids).await?;
    replace_details(&txn, created.id, input.details).await?;
    txn.commit().await?;

    log_created(student_attendance::QUERY.model, created.id, &created, current_user.id);
    let data = record(&db, &student_attendance::QUERY, &created, &[]).await?;
    Ok(Json(ApiResponse::with_message(
        "Data kehadiran berhasil dibuat",
        json!({ "student_attendance": data }),
    )))
}

/// GET /api/v1/student-attendances/:id
pub async fn get_student_attendance(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::STUDENT_ATTENDANCES_VIEW)?;
    let found = student_attendance::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;
    let data = record(&db, &student_attendance::QUERY, &found, &[]).await?;
    Ok(Json(ApiResponse::with_message(
        "Data kehadiran ditemukan",
        json!({ "student_attendance": data }),
    )))
}

/// PUT /api/v1/student-attendances/:id
pub async fn update_student_attendance(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
    AppJson(req): AppJson<StudentAttendanceRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::STUDENT_ATTENDANCES_VIEW)?;
    let before = student_attendance::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;
    let input = validate(&db, req).await?;
    if date_taken(&*db, input.date, input.class_id, Some(id)).await? {
        return Err(AppError::invalid("date", DUPLICATE_DATE));
    }

    let txn = db.begin().await?;
    let mut active: student_attendance::ActiveModel = before.clone().into();
    active.date = Set(input.date);
    active.class_id = Set(input.class_id);
    let updated = active
        .update(&txn)
        .await
        .map_err(|e| duplicate(e, "date", DUPLICATE_DATE))?;
    replace_subjects(&txn, id, &input.subject_ids).await?;
    replace_details(&txn, id, input.details).await?;
    txn.commit().await?;

    log_updated(student_attendance::QUERY.model, id, &before, &updated, current_user.id);
    let data = record(&db, &student_attendance::QUERY, &updated, &[]).await?;
    Ok(Json(ApiResponse::with_message(
        "Data kehadiran berhasil diupdate",
        json!({ "student_attendance": data }),
    )))
}

/// DELETE /api/v1/student-attendances/:id
pub async fn delete_student_attendance(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::STUDENT_ATTENDANCES_VIEW)?;
    let found = student_attendance::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;

    let txn = db.begin().await?;
    replace_subjects(&txn, id, &[]).await?;
    replace_details(&txn, id, Vec::new()).await?;
    student_attendance::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    log_deleted(student_attendance::QUERY.model, id, &found, current_user.id);
    Ok(Json(ApiResponse::with_message(
        "Data kehadiran berhasil dihapus",
        json!({ "student_attendance": found }),
    )))
}

/// GET /api/v1/student-attendances/date/:date
pub async fn students_by_date(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(date): Path<String>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::STUDENT_ATTENDANCES_VIEW)?;
    let date = validation::parse_date(&date).ok_or_else(|| AppError::invalid("date", "Format tanggal tidak valid"))?;

    let ids: Vec<i32> = student_attendance::Entity::find()
        .filter(student_attendance::Column::Date.eq(date))
        .all(&*db)
        .await?
        .into_iter()
        .map(|a| a.id)
        .collect();
    let details = student_attendance_detail::Entity::find()
        .filter(student_attendance_detail::Column::StudentAttendanceId.is_in(ids))
        .order_by_asc(student_attendance_detail::Column::Id)
        .all(&*db)
        .await?;
    let students: Vec<Value> = details
        .into_iter()
        .map(|d| json!({ "student_id": d.student_id, "status": d.status, "note": d.note }))
        .collect();

    Ok(Json(ApiResponse::with_message(
        "Data siswa per tanggal",
        json!({ "students": students }),
    )))
}

/// GET /api/v1/student-attendances/teacher-data?date=&class_id=
pub async fn teacher_data(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppQuery(params): AppQuery<TeacherDataQuery>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::STUDENT_ATTENDANCES_VIEW)?;
    let date = match params.date.as_deref() {
        Some(raw) => validation::parse_date(raw)
            .ok_or_else(|| AppError::invalid("date", "Format tanggal tidak valid"))?,
        None => today(),
    };

    let schedules = schedules_on(&*db, current_user.id, date).await?;
    let today_schedule = records(&db, &schedule::QUERY, &schedules).await?;

    let mut selected_class = Value::Null;
    let mut students = Vec::new();
    let mut existing = Value::Null;
    if let Some(class_id) = params.class_id {
        let class_id = class_id as i32;
        if let Some(class) = classroom::Entity::find_by_id(class_id).one(&*db).await? {
            selected_class = record(&db, &classroom::QUERY, &class, &[]).await?;
        }
        let rows = student::Entity::find()
            .filter(student::Column::ClassId.eq(class_id))
            .order_by_asc(student::Column::Name)
            .all(&*db)
            .await?;
        students = records(&db, &student::QUERY, &rows).await?;

        if let Some(found) = student_attendance::Entity::find()
            .filter(student_attendance::Column::TeacherId.eq(current_user.id))
            .filter(student_attendance::Column::ClassId.eq(class_id))
            .filter(student_attendance::Column::Date.eq(date))
            .one(&*db)
            .await?
        {
            existing = record(&db, &student_attendance::QUERY, &found, &[]).await?;
        }
    }

    let year = academic_year::active(&*db).await?;
    Ok(Json(ApiResponse::with_message(
        "Data absensi guru",
        json!({
            "date": date.format("%Y-%m-%d").to_string(),
            "today_schedule": today_schedule,
            "selected_class": selected_class,
            "students": students,
            "existing_attendance": existing,
            "academic_year": year,
        }),
    )))
}

/// POST /api/v1/student-attendances/save-class
///
/// Creates or replaces the current teacher's attendance of one class on one day.
pub async fn save_class(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppJson(req): AppJson<ClassAttendanceRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::STUDENT_ATTENDANCES_VIEW)?;

    let mut v = Validator::new();
    v.required_str("date", &req.date, "Tanggal wajib diisi");
    let date = v.date("date", req.date.as_deref(), "Format tanggal tidak valid");
    let class_id = v.required("class_id", &req.class_id, "Kelas wajib diisi");
    check_class(&mut v, &db, class_id).await?;
    let subject_ids = match &req.subjects {
        Some(items) => Some(check_subjects(&mut v, &db, items).await?),
        None => None,
    };
    let students = v.array_min("students", &req.students, 1, "Minimal satu data siswa harus diisi");
    let details = check_details(&mut v, &db, "students", students).await?;
    v.finish()?;
    let (Some(date), Some(class_id)) = (date, class_id.map(|id| id as i32)) else {
        return Err(AppError::invalid("date", "Tanggal wajib diisi"));
    };

    let txn = db.begin().await?;
    let year = require_active_year(&txn).await?;
    let existing = student_attendance::Entity::find()
        .filter(student_attendance::Column::TeacherId.eq(current_user.id))
        .filter(student_attendance::Column::ClassId.eq(class_id))
        .filter(student_attendance::Column::Date.eq(date))
        .one(&txn)
        .await?;

    let saved = match existing.clone() {
        Some(found) => {
            let mut active: student_attendance::ActiveModel = found.into();
            active.academic_year_id = Set(Some(year.id));
            active.update(&txn).await?
        }
        None => student_attendance::ActiveModel {
            date: Set(date),
            teacher_id: Set(current_user.id),
            class_id: Set(class_id),
            academic_year_id: Set(Some(year.id)),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| duplicate(e, "date", DUPLICATE_DATE))?,
    };
    replace_details(&txn, saved.id, details).await?;
    if let Some(subject_ids) = subject_ids {
        replace_subjects(&txn, saved.id, &subject_ids).await?;
    }
    txn.commit().await?;

    match existing {
        Some(before) => log_updated(student_attendance::QUERY.model, saved.id, &before, &saved, current_user.id),
        None => log_created(student_attendance::QUERY.model, saved.id, &saved, current_user.id),
    }
    let data = record(&db, &student_attendance::QUERY, &saved, &[]).await?;
    Ok(Json(ApiResponse::with_message(
        "Absensi siswa berhasil disimpan",
        json!({ "student_attendance": data }),
    )))
}

/// GET /api/v1/student-attendances/today-classes
pub async fn today_classes(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::STUDENT_ATTENDANCES_VIEW)?;
    let schedules = schedules_on(&*db, current_user.id, today()).await?;
    let rows = records(&db, &schedule::QUERY, &schedules).await?;

    let mut seen = HashSet::new();
    let classes: Vec<Value> = rows
        .iter()
        .filter(|row| seen.insert(row["class_id"].as_i64()))
        .map(|row| {
            json!({
                "id": row["class_id"],
                "name": row["classroom"]["name"],
                "subject": row["subject"]["name"],
                "time": format!(
                    "{} - {}",
                    row["start_time"].as_str().unwrap_or_default(),
                    row["end_time"].as_str().unwrap_or_default()
                ),
            })
        })
        .collect();

    Ok(Json(ApiResponse::with_message(
        "Data kelas hari ini",
        json!({ "classes": classes }),
    )))
}
