//! Teacher attendance handlers
//!
//! Every change is also written to `attendance_histories` with the old and
//! new row, next to the generic model log.

use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use chrono::{Datelike, NaiveDate};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{check_image, discard_on_error, duplicate, record, records, remove_upload, save_upload, today};
use crate::entity::{attendance_history, teacher_attendance};
use crate::error::{AppError, AppResult, OptionExt};
use crate::extract::{AppJson, AppQuery, FormOrJson, Upload};
use crate::handlers::audit::service::{log_created, log_deleted, log_updated};
use crate::middleware::{CurrentUser, DbConn};
use crate::permission::perm;
use crate::query::{self, ListQuery, ListResponse};
use crate::routes::ApiResponse;
use crate::state::AppState;
use crate::validation::{self, de, Validator};

const NOT_FOUND: &str = "Data kehadiran guru tidak ditemukan";
const DUPLICATE_DATE: &str = "Kehadiran guru untuk tanggal ini sudah ada";

const MAX_CHECK_PHOTO_SIZE: usize = 2 * 1024 * 1024;
const MAX_PHOTO_SIZE: usize = 5 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct CheckInRequest {
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub teacher_id: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub time_in: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckOutRequest {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub time_out: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AbsenceRequest {
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub teacher_id: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PhotoRequest {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub photo_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TeacherDateQuery {
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub teacher_id: Option<i64>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MonthlyQuery {
    #[serde(default)]
    pub month: Option<String>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub teacher_id: Option<i64>,
}

/// Present and absent counts of a month
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct MonthlyStats {
    pub total_days: usize,
    pub present_days: usize,
    pub absent_days: usize,
}

impl MonthlyStats {
    pub fn of(rows: &[teacher_attendance::Model]) -> Self {
        let count = |statuses: &[&str]| rows.iter().filter(|r| statuses.contains(&r.status.as_str())).count();
        Self {
            total_days: rows.len(),
            present_days: count(&[teacher_attendance::CHECK_IN, teacher_attendance::CHECK_OUT]),
            absent_days: count(&teacher_attendance::ABSENCES),
        }
    }
}

/// `YYYY-MM` -> first and last day of that month
pub fn month_range(month: &str) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d").ok()?;
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)?
    };
    Some((first, next.pred_opt()?))
}

/// Append one entry to the attendance trail
async fn write_history<C: ConnectionTrait>(
    db: &C,
    attendance_id: Option<i32>,
    changed_by: i32,
    action: &str,
    old: Option<&teacher_attendance::Model>,
    new: Option<&teacher_attendance::Model>,
    notes: Option<String>,
) -> AppResult<()> {
    let old_values = old.map(serde_json::to_value).transpose()?;
    let new_values = new.map(serde_json::to_value).transpose()?;
    attendance_history::ActiveModel {
        teacher_attendance_id: Set(attendance_id),
        changed_by: Set(Some(changed_by)),
        action: Set(action.to_string()),
        old_values: Set(old_values),
        new_values: Set(new_values),
        notes: Set(notes),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(())
}

/// Teachers may only record their own attendance
fn check_owner(current_user: &CurrentUser, teacher_id: i64) -> AppResult<()> {
    if current_user.is_admin() || teacher_id == current_user.id as i64 {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

async fn find(db: &DatabaseConnection, id: i32) -> AppResult<teacher_attendance::Model> {
    teacher_attendance::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_not_found(NOT_FOUND)
}

async fn taken(db: &DatabaseConnection, teacher_id: i64, date: NaiveDate) -> AppResult<bool> {
    let found = teacher_attendance::Entity::find()
        .filter(teacher_attendance::Column::TeacherId.eq(teacher_id as i32))
        .filter(teacher_attendance::Column::Date.eq(date))
        .one(db)
        .await?;
    Ok(found.is_some())
}

fn photo_dir(date: NaiveDate, teacher_id: i32) -> String {
    format!("attendance/photos/{}/{}", date.format("%Y-%m-%d"), teacher_id)
}

fn check_photo(field: &str, upload: Option<&Upload>, max: usize, too_large: &str) -> AppResult<()> {
    match upload {
        Some(upload) => check_image(field, upload, max, too_large),
        None => Ok(()),
    }
}

async fn respond(db: &DbConn, message: &str, model: &teacher_attendance::Model) -> AppResult<Json<ApiResponse<Value>>> {
    let data = record(db, &teacher_attendance::QUERY, model, &[]).await?;
    Ok(Json(ApiResponse::with_message(message, json!({ "teacher_attendance": data }))))
}

/// GET /api/v1/teacher-attendances
pub async fn list_teacher_attendances(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    query: ListQuery,
) -> AppResult<Json<ListResponse>> {
    current_user.require(perm::TEACHER_ATTENDANCE_VIEW)?;
    let mut select = teacher_attendance::Entity::find();
    if !current_user.is_admin() {
        select = select.filter(teacher_attendance::Column::TeacherId.eq(current_user.id));
    }
    let result = query::list(&db, select, &teacher_attendance::QUERY, &query).await?;
    Ok(Json(result))
}

/// GET /api/v1/teacher-attendances/history
pub async fn attendance_history_list(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    query: ListQuery,
) -> AppResult<Json<ListResponse>> {
    current_user.require(perm::TEACHER_ATTENDANCE_HISTORY)?;
    let mut select = teacher_attendance::Entity::find();
    if !current_user.is_admin() {
        select = select.filter(teacher_attendance::Column::TeacherId.eq(current_user.id));
    }
    let result = query::list(&db, select, &teacher_attendance::QUERY, &query).await?;
    Ok(Json(result))
}

/// GET /api/v1/teacher-attendances/:id
pub async fn get_teacher_attendance(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::TEACHER_ATTENDANCE_VIEW)?;
    let found = find(&db, id).await?;
    check_owner(&current_user, found.teacher_id as i64).map_err(|_| AppError::NotFound(NOT_FOUND.to_string()))?;
    respond(&db, "Data kehadiran guru ditemukan", &found).await
}

/// POST /api/v1/teacher-attendances/check-in
pub async fn check_in(
    State(state): State<AppState>,
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    mut form: FormOrJson<CheckInRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::TEACHER_ATTENDANCE_VIEW)?;
    let photo = form.file("photo_in");
    let req = form.data;

    let mut v = Validator::new();
    let teacher_id = v.required("teacher_id", &req.teacher_id, "Guru harus dipilih");
    if let Some(id) = teacher_id {
        let found = validation::exists(&db, "users", id).await?;
        v.check("teacher_id", found, "Guru tidak valid");
    }
    v.required_str("date", &req.date, "Tanggal harus diisi");
    let date = v.date("date", req.date.as_deref(), "Format tanggal tidak valid");
    if let (Some(teacher_id), Some(date)) = (teacher_id, date) {
        v.check("date", !taken(&db, teacher_id, date).await?, DUPLICATE_DATE);
    }
    v.required_str("time_in", &req.time_in, "Waktu masuk harus diisi");
    let time_in = v.time_hm("time_in", req.time_in.as_deref(), "Format waktu masuk tidak valid (HH:MM)");
    v.finish()?;
    let (Some(teacher_id), Some(date), Some(time_in)) = (teacher_id, date, time_in) else {
        return Err(AppError::invalid("teacher_id", "Guru harus dipilih"));
    };
    check_owner(&current_user, teacher_id)?;
    check_photo("photo_in", photo.as_ref(), MAX_CHECK_PHOTO_SIZE, "Photo masuk maksimal 2MB")?;
    let teacher_id = teacher_id as i32;

    let photo_in = match &photo {
        Some(upload) => Some(save_upload(&state, &photo_dir(date, teacher_id), upload).await?),
        None => None,
    };

    let result = async {
        let txn = db.begin().await?;
        let created = teacher_attendance::ActiveModel {
            teacher_id: Set(teacher_id),
            date: Set(date),
            time_in: Set(Some(time_in)),
            photo_in: Set(photo_in.clone()),
            status: Set(teacher_attendance::CHECK_IN.to_string()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| duplicate(e, "date", DUPLICATE_DATE))?;
        write_history(&txn, Some(created.id), current_user.id, attendance_history::CHECKED_IN, None, Some(&created), None).await?;
        txn.commit().await?;
        Ok::<_, AppError>(created)
    }
    .await;
    let created = discard_on_error(&state, photo_in.as_deref(), result).await?;

    log_created(teacher_attendance::QUERY.model, created.id, &created, current_user.id);
    respond(&db, "Check-in berhasil", &created).await
}

/// POST /api/v1/teacher-attendances/:id/check-out
pub async fn check_out(
    State(state): State<AppState>,
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
    mut form: FormOrJson<CheckOutRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::TEACHER_ATTENDANCE_VIEW)?;
    let before = find(&db, id).await?;
    check_owner(&current_user, before.teacher_id as i64)?;
    let photo = form.file("photo_out");

    let mut v = Validator::new();
    v.required_str("time_out", &form.data.time_out, "Waktu keluar harus diisi");
    let time_out = v.time_hm("time_out", form.data.time_out.as_deref(), "Format waktu keluar tidak valid (HH:MM)");
    v.check("time_out", before.time_in.is_some(), "Belum melakukan check-in");
    v.after("time_out", time_out, before.time_in, "Waktu keluar harus setelah waktu masuk");
    v.finish()?;
    check_photo("photo_out", photo.as_ref(), MAX_CHECK_PHOTO_SIZE, "Photo keluar maksimal 2MB")?;

    let photo_out = match &photo {
        Some(upload) => Some(save_upload(&state, &photo_dir(before.date, before.teacher_id), upload).await?),
        None => None,
    };

    let result = async {
        let txn = db.begin().await?;
        let mut active: teacher_attendance::ActiveModel = before.clone().into();
        active.time_out = Set(time_out);
        if photo_out.is_some() {
            active.photo_out = Set(photo_out.clone());
        }
        active.status = Set(teacher_attendance::CHECK_OUT.to_string());
        let updated = active.update(&txn).await?;
        write_history(&txn, Some(id), current_user.id, attendance_history::CHECKED_OUT, Some(&before), Some(&updated), None).await?;
        txn.commit().await?;
        Ok::<_, AppError>(updated)
    }
    .await;
    let updated = discard_on_error(&state, photo_out.as_deref(), result).await?;

    if photo.is_some() {
        if let Some(old) = &before.photo_out {
            remove_upload(&state, old).await;
        }
    }
    log_updated(teacher_attendance::QUERY.model, id, &before, &updated, current_user.id);
    respond(&db, "Check-out berhasil", &updated).await
}

/// POST /api/v1/teacher-attendances/sick-leave
pub async fn sick_leave(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppJson(req): AppJson<AbsenceRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::TEACHER_ATTENDANCE_ABSENCE)?;

    let mut v = Validator::new();
    let teacher_id = v.required("teacher_id", &req.teacher_id, "Guru wajib diisi");
    if let Some(id) = teacher_id {
        let found = validation::exists(&db, "users", id).await?;
        v.check("teacher_id", found, "Guru tidak ditemukan");
    }
    v.required_str("date", &req.date, "Tanggal wajib diisi");
    let date = v.date("date", req.date.as_deref(), "Format tanggal tidak valid");
    if let (Some(teacher_id), Some(date)) = (teacher_id, date) {
        v.check("date", !taken(&db, teacher_id, date).await?, DUPLICATE_DATE);
    }
    let status = v.required_str("status", &req.status, "Status wajib diisi");
    v.one_of(
        "status",
        status.as_deref(),
        &teacher_attendance::ABSENCES,
        "Status harus sick, permission atau on_leave",
    );
    v.max_len("notes", req.notes.as_deref(), 255, "Catatan maksimal 255 karakter");
    v.finish()?;
    let (Some(teacher_id), Some(date), Some(status)) = (teacher_id, date, status) else {
        return Err(AppError::invalid("teacher_id", "Guru wajib diisi"));
    };
    check_owner(&current_user, teacher_id)?;

    let txn = db.begin().await?;
    let created = teacher_attendance::ActiveModel {
        teacher_id: Set(teacher_id as i32),
        date: Set(date),
        time_in: Set(None),
        time_out: Set(None),
        status: Set(status),
        notes: Set(req.notes.filter(|n| !n.trim().is_empty())),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| duplicate(e, "date", DUPLICATE_DATE))?;
    write_history(&txn, Some(created.id), current_user.id, attendance_history::CREATED, None, Some(&created), created.notes.clone()).await?;
    txn.commit().await?;

    log_created(teacher_attendance::QUERY.model, created.id, &created, current_user.id);
    respond(&db, "Data kehadiran berhasil dicatat", &created).await
}

/// GET /api/v1/teacher-attendances/today?teacher_id=
pub async fn today_attendance(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppQuery(params): AppQuery<TeacherDateQuery>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::TEACHER_ATTENDANCE_VIEW)?;
    let mut select = teacher_attendance::Entity::find().filter(teacher_attendance::Column::Date.eq(today()));
    let teacher_id = match params.teacher_id {
        Some(id) => Some(id),
        None if !current_user.is_admin() => Some(current_user.id as i64),
        None => None,
    };
    if let Some(id) = teacher_id {
        check_owner(&current_user, id)?;
        select = select.filter(teacher_attendance::Column::TeacherId.eq(id as i32));
    }
    let rows = select.all(&*db).await?;
    let data = records(&db, &teacher_attendance::QUERY, &rows).await?;
    Ok(Json(ApiResponse::with_message(
        "Data kehadiran hari ini",
        json!({ "attendances": data }),
    )))
}

/// GET /api/v1/teacher-attendances/by-teacher-date?teacher_id=&date=
pub async fn by_teacher_date(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppQuery(params): AppQuery<TeacherDateQuery>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::TEACHER_ATTENDANCE_VIEW)?;
    let teacher_id = params.teacher_id.unwrap_or(current_user.id as i64);
    check_owner(&current_user, teacher_id)?;
    let date = match params.date.as_deref() {
        Some(raw) => validation::parse_date(raw)
            .ok_or_else(|| AppError::invalid("date", "Format tanggal tidak valid"))?,
        None => today(),
    };
    let found = teacher_attendance::Entity::find()
        .filter(teacher_attendance::Column::TeacherId.eq(teacher_id as i32))
        .filter(teacher_attendance::Column::Date.eq(date))
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;
    respond(&db, "Data kehadiran guru ditemukan", &found).await
}

/// GET /api/v1/teacher-attendances/monthly-report?month=YYYY-MM&teacher_id=
pub async fn monthly_report(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppQuery(params): AppQuery<MonthlyQuery>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::TEACHER_ATTENDANCE_HISTORY)?;
    let mut v = Validator::new();
    let month = v.required_str("month", &params.month, "Bulan wajib diisi");
    let range = month.as_deref().and_then(month_range);
    if month.is_some() {
        v.check("month", range.is_some(), "Format bulan harus YYYY-MM");
    }
    if let Some(id) = params.teacher_id {
        let found = validation::exists(&db, "users", id).await?;
        v.check("teacher_id", found, "Guru tidak ditemukan");
    }
    v.finish()?;
    let Some((first, last)) = range else {
        return Err(AppError::invalid("month", "Bulan wajib diisi"));
    };

    let mut select = teacher_attendance::Entity::find()
        .filter(teacher_attendance::Column::Date.between(first, last))
        .order_by_desc(teacher_attendance::Column::Date);
    let teacher_id = match params.teacher_id {
        Some(id) => Some(id),
        None if !current_user.is_admin() => Some(current_user.id as i64),
        None => None,
    };
    if let Some(id) = teacher_id {
        check_owner(&current_user, id)?;
        select = select.filter(teacher_attendance::Column::TeacherId.eq(id as i32));
    }
    let rows = select.all(&*db).await?;
    let statistics = MonthlyStats::of(&rows);
    let data = records(&db, &teacher_attendance::QUERY, &rows).await?;

    Ok(Json(ApiResponse::with_message(
        "Report bulanan",
        json!({ "attendances": data, "statistics": statistics }),
    )))
}

/// PATCH /api/v1/teacher-attendances/:id/status
pub async fn update_status(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
    AppJson(req): AppJson<StatusRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::TEACHER_ATTENDANCE_ABSENCE)?;
    let before = find(&db, id).await?;
    check_owner(&current_user, before.teacher_id as i64)?;

    let mut v = Validator::new();
    let status = v.required_str("status", &req.status, "Status harus dipilih");
    v.one_of(
        "status",
        status.as_deref(),
        &teacher_attendance::STATUSES,
        "Status tidak valid (check_in, check_out, on_leave, sick, permission)",
    );
    v.max_len("notes", req.notes.as_deref(), 500, "Catatan maksimal 500 karakter");
    v.finish()?;
    let Some(status) = status else {
        return Err(AppError::invalid("status", "Status harus dipilih"));
    };
    let notes = req.notes.filter(|n| !n.trim().is_empty());

    let txn = db.begin().await?;
    let mut active: teacher_attendance::ActiveModel = before.clone().into();
    if teacher_attendance::ABSENCES.contains(&status.as_str()) {
        active.time_in = Set(None);
        active.time_out = Set(None);
    }
    active.status = Set(status);
    if notes.is_some() {
        active.notes = Set(notes.clone());
    }
    let updated = active.update(&txn).await?;
    write_history(&txn, Some(id), current_user.id, attendance_history::STATUS_UPDATED, Some(&before), Some(&updated), notes).await?;
    txn.commit().await?;

    log_updated(teacher_attendance::QUERY.model, id, &before, &updated, current_user.id);
    respond(&db, "Status kehadiran berhasil diupdate", &updated).await
}

/// POST /api/v1/teacher-attendances/:id/photo
pub async fn upload_photo(
    State(state): State<AppState>,
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
    mut form: FormOrJson<PhotoRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::TEACHER_ATTENDANCE_VIEW)?;
    let before = find(&db, id).await?;
    check_owner(&current_user, before.teacher_id as i64)?;

    let mut v = Validator::new();
    let photo_type = v.required_str("photo_type", &form.data.photo_type, "Tipe foto harus dipilih");
    v.one_of("photo_type", photo_type.as_deref(), &["in", "out"], "Tipe foto tidak valid (in/out)");
    let upload = form.file("photo");
    v.check("photo", upload.is_some(), "Foto harus diupload");
    v.finish()?;
    let (Some(photo_type), Some(upload)) = (photo_type, upload) else {
        return Err(AppError::invalid("photo", "Foto harus diupload"));
    };
    check_image("photo", &upload, MAX_PHOTO_SIZE, "Ukuran foto maksimal 5MB")?;

    let path = save_upload(&state, &photo_dir(before.date, before.teacher_id), &upload).await?;
    let mut active: teacher_attendance::ActiveModel = before.clone().into();
    let replaced = if photo_type == "in" {
        active.photo_in = Set(Some(path.clone()));
        before.photo_in.clone()
    } else {
        active.photo_out = Set(Some(path.clone()));
        before.photo_out.clone()
    };

    let result = async {
        let txn = db.begin().await?;
        let updated = active.update(&txn).await?;
        write_history(&txn, Some(id), current_user.id, attendance_history::PHOTO_UPLOADED, Some(&before), Some(&updated), None).await?;
        txn.commit().await?;
        Ok::<_, AppError>(updated)
    }
    .await;
    let updated = discard_on_error(&state, Some(&path), result).await?;

    if let Some(old) = replaced {
        remove_upload(&state, &old).await;
    }
    log_updated(teacher_attendance::QUERY.model, id, &before, &updated, current_user.id);
    respond(&db, "Foto berhasil diunggah", &updated).await
}

/// GET /api/v1/teacher-attendances/:id/histories
pub async fn histories(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::TEACHER_ATTENDANCE_HISTORY)?;
    let found = find(&db, id).await?;
    check_owner(&current_user, found.teacher_id as i64)?;
    let rows = attendance_history::Entity::find()
        .filter(attendance_history::Column::TeacherAttendanceId.eq(id))
        .order_by_desc(attendance_history::Column::CreatedAt)
        .order_by_desc(attendance_history::Column::Id)
        .all(&*db)
        .await?;
    let data = records(&db, &attendance_history::QUERY, &rows).await?;
    Ok(Json(ApiResponse::with_message(
        "Riwayat kehadiran guru",
        json!({ "histories": data }),
    )))
}

/// DELETE /api/v1/teacher-attendances/:id
pub async fn delete_teacher_attendance(
    State(state): State<AppState>,
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require_admin()?;
    let found = find(&db, id).await?;

    let txn = db.begin().await?;
    // the entry outlives the row, so it is written unlinked
    write_history(&txn, None, current_user.id, attendance_history::DELETED, Some(&found), None, None).await?;
    teacher_attendance::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    for photo in [&found.photo_in, &found.photo_out].into_iter().flatten() {
        remove_upload(&state, photo).await;
    }
    log_deleted(teacher_attendance::QUERY.model, id, &found, current_user.id);
    Ok(Json(ApiResponse::with_message(
        "Data kehadiran guru berhasil dihapus",
        json!({ "teacher_attendance": found }),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> teacher_attendance::Model {
        let now = chrono::Utc::now();
        teacher_attendance::Model {
            id: 1,
            teacher_id: 1,
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            time_in: None,
            time_out: None,
            photo_in: None,
            photo_out: None,
            status: status.to_string(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_month_range() {
        let (first, last) = month_range("2024-02").unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let (_, last) = month_range("2023-12").unwrap();
        assert_eq!(last, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());

        assert!(month_range("2024-13").is_none());
        assert!(month_range("maret").is_none());
    }

    #[test]
    fn test_monthly_stats() {
        let rows = vec![
            row(teacher_attendance::CHECK_IN),
            row(teacher_attendance::CHECK_OUT),
            row(teacher_attendance::SICK),
            row(teacher_attendance::ON_LEAVE),
        ];
        let stats = MonthlyStats::of(&rows);
        assert_eq!(
            stats,
            MonthlyStats { total_days: 4, present_days: 2, absent_days: 2 }
        );
        assert_eq!(MonthlyStats::of(&[]), MonthlyStats::default());
    }
}
