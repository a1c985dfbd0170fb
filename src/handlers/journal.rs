//! Teacher journal handlers
//!
//! A journal records what was taught in one class on one day; it links to
//! one or more subjects through `journal_subjects`.

use axum::{extract::Path, response::Json, Extension};
use chrono::{Datelike, Duration, NaiveDate};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;

use super::schedule::{attendance_filled, schedules_on};
use super::{record, records, require_active_year, today};
use crate::entity::{classroom, journal, journal_subject, schedule};
use crate::error::{AppError, AppResult, OptionExt};
use crate::extract::{AppJson, AppQuery};
use crate::handlers::audit::service::{log_created, log_deleted, log_updated};
use crate::middleware::{CurrentUser, DbConn};
use crate::permission::perm;
use crate::query::{self, ListQuery, ListResponse};
use crate::routes::ApiResponse;
use crate::validation::{self, de, Validator};

const NOT_FOUND: &str = "Jurnal guru tidak ditemukan";

/// Days looked back for missing journals, today included
const PENDING_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Deserialize)]
pub struct JournalRequest {
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub teacher_id: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub class_id: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub theme: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub activity: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "de::opt_bool")]
    pub active: Option<bool>,
    #[serde(default)]
    pub subject_ids: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize)]
pub struct FormDataQuery {
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub class_id: Option<i64>,
}

struct JournalInput {
    teacher_id: i32,
    class_id: i32,
    date: NaiveDate,
    theme: String,
    activity: String,
    notes: Option<String>,
    active: Option<bool>,
    subject_ids: Vec<i32>,
}

async fn validate(db: &DatabaseConnection, req: JournalRequest, current_user: &CurrentUser) -> AppResult<JournalInput> {
    let mut v = Validator::new();

    let teacher_id = req.teacher_id.unwrap_or(current_user.id as i64);
    let found = validation::exists(db, "users", teacher_id).await?;
    v.check("teacher_id", found, "Guru tidak ditemukan");

    let class_id = v.required("class_id", &req.class_id, "Kelas wajib diisi");
    if let Some(id) = class_id {
        let found = validation::exists(db, "classes", id).await?;
        v.check("class_id", found, "Kelas tidak ditemukan");
    }

    v.required_str("date", &req.date, "Tanggal wajib diisi");
    let date = v.date("date", req.date.as_deref(), "Format tanggal tidak valid");

    let theme = v.required_str("theme", &req.theme, "Tema wajib diisi");
    v.max_len("theme", theme.as_deref(), 255, "Tema maksimal 255 karakter");
    let activity = v.required_str("activity", &req.activity, "Kegiatan wajib diisi");

    let mut subject_ids = v.array_min("subject_ids", &req.subject_ids, 1, "Minimal satu mata pelajaran harus dipilih");
    subject_ids.sort_unstable();
    subject_ids.dedup();
    for id in &subject_ids {
        if !validation::exists(db, "subjects", *id).await? {
            v.error("subject_ids", format!("Mata pelajaran {} tidak ditemukan", id));
        }
    }
    v.finish()?;

    let date = date.ok_or_else(|| AppError::invalid("date", "Tanggal wajib diisi"))?;
    Ok(JournalInput {
        teacher_id: teacher_id as i32,
        class_id: class_id.unwrap_or_default() as i32,
        date,
        theme: theme.unwrap_or_default(),
        activity: activity.unwrap_or_default(),
        notes: req.notes.filter(|s| !s.trim().is_empty()),
        active: req.active,
        subject_ids: subject_ids.into_iter().map(|id| id as i32).collect(),
    })
}

async fn link_subjects<C: ConnectionTrait>(db: &C, journal_id: i32, subject_ids: &[i32]) -> AppResult<()> {
    for subject_id in subject_ids {
        journal_subject::ActiveModel {
            journal_id: Set(journal_id),
            subject_id: Set(*subject_id),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

/// `(class_id, subject_id)` pairs covered by journals of `teacher_id` on `date`
async fn journal_filled<C: ConnectionTrait>(db: &C, teacher_id: i32, date: NaiveDate) -> AppResult<HashSet<(i32, i32)>> {
    let journals = journal::Entity::find()
        .filter(journal::Column::TeacherId.eq(teacher_id))
        .filter(journal::Column::Date.eq(date))
        .all(db)
        .await?;
    if journals.is_empty() {
        return Ok(HashSet::new());
    }
    let links = journal_subject::Entity::find()
        .filter(journal_subject::Column::JournalId.is_in(journals.iter().map(|j| j.id).collect::<Vec<_>>()))
        .all(db)
        .await?;
    Ok(links
        .iter()
        .filter_map(|l| {
            journals
                .iter()
                .find(|j| j.id == l.journal_id)
                .map(|j| (j.class_id, l.subject_id))
        })
        .collect())
}

fn time_range(row: &Value) -> String {
    format!(
        "{} - {}",
        row["start_time"].as_str().unwrap_or_default(),
        row["end_time"].as_str().unwrap_or_default()
    )
}

/// Distinct subjects of serialized schedule rows, in schedule order
fn subjects_of(rows: &[Value]) -> Vec<Value> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter(|row| seen.insert(row["subject_id"].as_i64()))
        .map(|row| {
            json!({
                "id": row["subject_id"],
                "name": row["subject"]["name"],
                "class_id": row["class_id"],
                "class_name": row["classroom"]["name"],
                "time": time_range(row),
            })
        })
        .collect()
}

/// Days in the look-back window on which some scheduled class and subject has no journal
async fn pending_days<C: ConnectionTrait>(db: &C, teacher_id: i32, today: NaiveDate) -> AppResult<(Vec<Value>, usize)> {
    let mut pending = Vec::new();
    let mut scheduled_days = 0;
    for offset in 0..=PENDING_WINDOW_DAYS {
        let date = today - Duration::days(offset);
        let Some(day_name) = schedule::day_name(date) else {
            continue;
        };
        let schedules = schedules_on(db, teacher_id, date).await?;
        if schedules.is_empty() {
            continue;
        }
        scheduled_days += 1;
        let covered = journal_filled(db, teacher_id, date).await?;
        if schedules.iter().any(|s| !covered.contains(&(s.class_id, s.subject_id))) {
            pending.push(json!({
                "date": date.format("%Y-%m-%d").to_string(),
                "day_name": day_name,
                "day_date": date.format("%d/%m").to_string(),
            }));
        }
    }
    Ok((pending, scheduled_days))
}

/// Share of scheduled days that have complete journals, one decimal
fn completion_rate(scheduled_days: usize, pending_days: usize) -> f64 {
    if scheduled_days == 0 {
        return 0.0;
    }
    let done = scheduled_days.saturating_sub(pending_days) as f64;
    (done / scheduled_days as f64 * 1000.0).round() / 10.0
}

/// GET /api/v1/journals
pub async fn list_journals(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    query: ListQuery,
) -> AppResult<Json<ListResponse>> {
    current_user.require(perm::JOURNALS_VIEW)?;
    let result = query::list(&db, journal::Entity::find(), &journal::QUERY, &query).await?;
    Ok(Json(result))
}

/// POST /api/v1/journals
pub async fn create_journal(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppJson(req): AppJson<JournalRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::JOURNALS_CREATE)?;
    let input = validate(&db, req, &current_user).await?;

    let txn = db.begin().await?;
    let year = require_active_year(&txn).await?;
    let created = journal::ActiveModel {
        teacher_id: Set(input.teacher_id),
        class_id: Set(input.class_id),
        academic_year_id: Set(Some(year.id)),
        date: Set(input.date),
        theme: Set(input.theme),
        activity: Set(input.activity),
        notes: Set(input.notes),
        active: Set(input.active.unwrap_or(true)),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    link_subjects(&txn, created.id, &input.subject_ids).await?;
    txn.commit().await?;

    log_created(journal::QUERY.model, created.id, &created, current_user.id);
    let data = record(&db, &journal::QUERY, &created, &[]).await?;
    Ok(Json(ApiResponse::with_message(
        "Jurnal guru berhasil dibuat",
        json!({ "journal": data }),
    )))
}

/// GET /api/v1/journals/:id
pub async fn get_journal(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::JOURNALS_VIEW)?;
    let found = journal::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;
    let data = record(&db, &journal::QUERY, &found, &["academic_year"]).await?;
    Ok(Json(ApiResponse::success(data)))
}

/// PUT /api/v1/journals/:id
pub async fn update_journal(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
    AppJson(req): AppJson<JournalRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::JOURNALS_UPDATE)?;
    let before = journal::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;
    let input = validate(&db, req, &current_user).await?;

    let txn = db.begin().await?;
    let mut active: journal::ActiveModel = before.clone().into();
    active.teacher_id = Set(input.teacher_id);
    active.class_id = Set(input.class_id);
    active.date = Set(input.date);
    active.theme = Set(input.theme);
    active.activity = Set(input.activity);
    active.notes = Set(input.notes);
    if let Some(flag) = input.active {
        active.active = Set(flag);
    }
    let updated = active.update(&txn).await?;
    journal_subject::Entity::delete_many()
        .filter(journal_subject::Column::JournalId.eq(id))
        .exec(&txn)
        .await?;
    link_subjects(&txn, id, &input.subject_ids).await?;
    txn.commit().await?;

    log_updated(journal::QUERY.model, id, &before, &updated, current_user.id);
    let data = record(&db, &journal::QUERY, &updated, &[]).await?;
    Ok(Json(ApiResponse::with_message(
        "Jurnal guru berhasil diupdate",
        json!({ "journal": data }),
    )))
}

/// DELETE /api/v1/journals/:id
pub async fn delete_journal(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::JOURNALS_DELETE)?;
    let found = journal::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;

    let txn = db.begin().await?;
    journal_subject::Entity::delete_many()
        .filter(journal_subject::Column::JournalId.eq(id))
        .exec(&txn)
        .await?;
    journal::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    log_deleted(journal::QUERY.model, id, &found, current_user.id);
    Ok(Json(ApiResponse::with_message(
        "Jurnal guru berhasil dihapus",
        json!({ "journal": found }),
    )))
}

/// GET /api/v1/journals/dashboard
pub async fn dashboard(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::JOURNALS_VIEW)?;
    let today = today();
    let teacher_id = current_user.id;

    let homeroom = classroom::Entity::find()
        .filter(classroom::Column::TeacherId.eq(teacher_id))
        .filter(classroom::Column::Active.eq(true))
        .one(&*db)
        .await?;
    let homeroom_class = match &homeroom {
        Some(class) => Some(record(&db, &classroom::QUERY, class, &["academic_year"]).await?),
        None => None,
    };

    let schedules = schedules_on(&*db, teacher_id, today).await?;
    let attended = attendance_filled(&*db, today, Some(teacher_id)).await?;
    let journaled = journal_filled(&*db, teacher_id, today).await?;
    let mut today_schedule = records(&db, &schedule::QUERY, &schedules).await?;
    for (row, s) in today_schedule.iter_mut().zip(&schedules) {
        if let Value::Object(map) = row {
            let key = (s.class_id, s.subject_id);
            map.insert("is_attendance_filled".to_string(), json!(attended.contains(&key)));
            map.insert("is_journal_filled".to_string(), json!(journaled.contains(&key)));
        }
    }
    let today_subjects = subjects_of(&today_schedule);

    let journals = journal::Entity::find()
        .filter(journal::Column::TeacherId.eq(teacher_id))
        .filter(journal::Column::Date.eq(today))
        .all(&*db)
        .await?;
    let today_journals = records(&db, &journal::QUERY, &journals).await?;

    let (pending, scheduled_days) = pending_days(&*db, teacher_id, today).await?;

    let month_start = today.with_day(1).unwrap_or(today);
    let this_month_journals = journal::Entity::find()
        .filter(journal::Column::TeacherId.eq(teacher_id))
        .filter(journal::Column::Date.gte(month_start))
        .filter(journal::Column::Date.lte(today))
        .all(&*db)
        .await?
        .len();
    let teaching_days: HashSet<String> = schedule::Entity::find()
        .filter(schedule::Column::TeacherId.eq(teacher_id))
        .filter(schedule::Column::Active.eq(true))
        .all(&*db)
        .await?
        .into_iter()
        .map(|s| s.day)
        .collect();
    let working_days_this_month = month_start
        .iter_days()
        .take_while(|d| *d <= today)
        .filter(|d| schedule::day_name(*d).is_some_and(|name| teaching_days.contains(name)))
        .count();

    Ok(Json(ApiResponse::success(json!({
        "user": {
            "id": current_user.id,
            "name": current_user.name,
            "email": current_user.email,
            "is_homeroom_teacher": homeroom.is_some(),
            "homeroom_class": homeroom_class,
        },
        "today_schedule": today_schedule,
        "today_subjects": today_subjects,
        "today_journals": today_journals,
        "has_submitted_today": !journals.is_empty(),
        "pending_days": pending,
        "stats": {
            "this_month_journals": this_month_journals,
            "pending_journals": pending.len(),
            "working_days_this_month": working_days_this_month,
            "completion_rate": completion_rate(scheduled_days, pending.len()),
        },
    }))))
}

/// GET /api/v1/journals/today-subjects
pub async fn today_subjects(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::JOURNALS_VIEW)?;
    let schedules = schedules_on(&*db, current_user.id, today()).await?;
    let rows = records(&db, &schedule::QUERY, &schedules).await?;
    Ok(Json(ApiResponse::success(json!({ "subjects": subjects_of(&rows) }))))
}

/// GET /api/v1/journals/form-data?class_id=
pub async fn form_data(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppQuery(params): AppQuery<FormDataQuery>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::JOURNALS_CREATE)?;
    let today = today();
    let schedules = schedules_on(&*db, current_user.id, today).await?;
    let rows = records(&db, &schedule::QUERY, &schedules).await?;

    let mut seen = HashSet::new();
    let classes: Vec<Value> = rows
        .iter()
        .filter(|row| seen.insert(row["class_id"].as_i64()))
        .map(|row| {
            json!({
                "value": row["class_id"],
                "label": row["classroom"]["name"],
                "id": row["class_id"],
                "name": row["classroom"]["name"],
            })
        })
        .collect();

    let mut subjects = Vec::new();
    if let Some(class_id) = params.class_id {
        let filled = journal_filled(&*db, current_user.id, today).await?;
        let mut seen = HashSet::new();
        for row in rows.iter().filter(|r| r["class_id"].as_i64() == Some(class_id)) {
            let subject_id = row["subject_id"].as_i64().unwrap_or_default();
            if !seen.insert(subject_id) {
                continue;
            }
            subjects.push(json!({
                "id": subject_id,
                "name": row["subject"]["name"],
                "value": subject_id,
                "label": row["subject"]["name"],
                "time": time_range(row),
                "is_filled": filled.contains(&(class_id as i32, subject_id as i32)),
            }));
        }
    }

    Ok(Json(ApiResponse::with_message(
        "Data form jurnal",
        json!({ "classes": classes, "subjects": subjects }),
    )))
}

async fn journals_where(
    db: &DbConn,
    filter: sea_orm::Condition,
) -> AppResult<Vec<Value>> {
    let journals = journal::Entity::find()
        .filter(filter)
        .order_by_desc(journal::Column::Date)
        .all(&**db)
        .await?;
    let with = journal::QUERY.with_defaults(&["academic_year".to_string()]);
    query::fetch_rows(db, &journal::QUERY, &journals, &with).await
}

/// GET /api/v1/journals/teacher/:id
pub async fn journals_by_teacher(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(teacher_id): Path<i32>,
) -> AppResult<Json<ApiResponse<Vec<Value>>>> {
    current_user.require(perm::JOURNALS_VIEW)?;
    let cond = sea_orm::Condition::all().add(journal::Column::TeacherId.eq(teacher_id));
    Ok(Json(ApiResponse::success(journals_where(&db, cond).await?)))
}

/// GET /api/v1/journals/class/:id
pub async fn journals_by_class(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(class_id): Path<i32>,
) -> AppResult<Json<ApiResponse<Vec<Value>>>> {
    current_user.require(perm::JOURNALS_VIEW)?;
    let cond = sea_orm::Condition::all().add(journal::Column::ClassId.eq(class_id));
    Ok(Json(ApiResponse::success(journals_where(&db, cond).await?)))
}

/// GET /api/v1/journals/date/:date
pub async fn journals_by_date(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(date): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<Value>>>> {
    current_user.require(perm::JOURNALS_VIEW)?;
    let date = validation::parse_date(&date).ok_or_else(|| AppError::invalid("date", "Format tanggal tidak valid"))?;
    let cond = sea_orm::Condition::all().add(journal::Column::Date.eq(date));
    Ok(Json(ApiResponse::success(journals_where(&db, cond).await?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_rate() {
        assert_eq!(completion_rate(0, 0), 0.0);
        assert_eq!(completion_rate(4, 1), 75.0);
        assert_eq!(completion_rate(3, 1), 66.7);
        assert_eq!(completion_rate(2, 5), 0.0);
    }

    #[test]
    fn test_subjects_of_is_distinct() {
        let rows = vec![
            json!({"subject_id": 1, "class_id": 3, "start_time": "07:00", "end_time": "08:30",
                   "subject": {"name": "Matematika"}, "classroom": {"name": "X IPA 1"}}),
            json!({"subject_id": 1, "class_id": 4, "start_time": "09:00", "end_time": "10:30",
                   "subject": {"name": "Matematika"}, "classroom": {"name": "X IPA 2"}}),
            json!({"subject_id": 2, "class_id": 4, "start_time": "10:30", "end_time": "12:00",
                   "subject": {"name": "Fisika"}, "classroom": {"name": "X IPA 2"}}),
        ];
        let subjects = subjects_of(&rows);
        assert_eq!(subjects.len(), 2);
        assert_eq!(subjects[0]["time"], "07:00 - 08:30");
        assert_eq!(subjects[1]["name"], "Fisika");
    }
}
