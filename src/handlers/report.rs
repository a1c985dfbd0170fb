//! Attendance and journal reports
//!
//! Each report shares one filter set and offers a paginated listing, a
//! summary and PDF/CSV exports built from the same query.

use axum::{response::Json, response::Response, Extension};
use chrono::{Local, NaiveDate};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};

use super::teacher_attendance::month_range;
use crate::entity::{
    academic_year, classroom, journal, journal_subject, student_attendance, student_attendance_detail,
    subject, teacher_attendance, user,
};
use crate::error::{AppError, AppResult};
use crate::export::{self, Table};
use crate::extract::AppQuery;
use crate::middleware::{CurrentUser, DbConn};
use crate::permission::perm;
use crate::query::{self, ListQuery, Paginated, Resource};
use crate::routes::ApiResponse;
use crate::validation::{self, de};

const DEFAULT_PER_PAGE: i64 = 15;
const MAX_PER_PAGE: i64 = 100;
const BREAKDOWN_SIZE: usize = 5;

const STUDENT_PREFIX: &str = "laporan-absensi-siswa";
const TEACHER_PREFIX: &str = "laporan-absensi-guru";
const JOURNAL_PREFIX: &str = "laporan-jurnal-guru";

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub start_date: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub end_date: Option<String>,
    /// `YYYY-MM`
    #[serde(default, deserialize_with = "de::opt_string")]
    pub month: Option<String>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub academic_year_id: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub class_id: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub teacher_id: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub subject_id: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub per_page: Option<i64>,
}

/// Parsed filters of a report request
#[derive(Debug, Default)]
struct Filters {
    period: Option<(NaiveDate, NaiveDate)>,
    month: Option<(NaiveDate, NaiveDate)>,
    academic_year: Option<academic_year::Model>,
    academic_year_id: Option<i32>,
    class_id: Option<i32>,
    teacher_id: Option<i32>,
    subject_id: Option<i32>,
}

impl ReportQuery {
    fn page(&self) -> (u64, u64) {
        let per_page = self.per_page.filter(|n| *n > 0).unwrap_or(DEFAULT_PER_PAGE).min(MAX_PER_PAGE);
        let page = self.page.filter(|n| *n > 0).unwrap_or(1);
        (page as u64, per_page as u64)
    }

    async fn filters(&self, db: &DatabaseConnection) -> AppResult<Filters> {
        let period = match (self.start_date.as_deref(), self.end_date.as_deref()) {
            (Some(start), Some(end)) => {
                let start = validation::parse_date(start)
                    .ok_or_else(|| AppError::invalid("start_date", "Format tanggal mulai tidak valid"))?;
                let end = validation::parse_date(end)
                    .ok_or_else(|| AppError::invalid("end_date", "Format tanggal selesai tidak valid"))?;
                Some((start, end))
            }
            _ => None,
        };
        let month = match self.month.as_deref() {
            Some(month) => {
                Some(month_range(month).ok_or_else(|| AppError::invalid("month", "Format bulan harus YYYY-MM"))?)
            }
            None => None,
        };
        let academic_year = match self.academic_year_id {
            Some(id) => academic_year::Entity::find_by_id(id as i32).one(db).await?,
            None => None,
        };
        Ok(Filters {
            period,
            month,
            academic_year,
            academic_year_id: self.academic_year_id.map(|id| id as i32),
            class_id: self.class_id.map(|id| id as i32),
            teacher_id: self.teacher_id.map(|id| id as i32),
            subject_id: self.subject_id.map(|id| id as i32),
        })
    }
}

/// Date-range conditions shared by every report
fn dated<C: ColumnTrait>(column: C, f: &Filters) -> Condition {
    let mut cond = Condition::all();
    if let Some((start, end)) = f.period {
        cond = cond.add(column.between(start, end));
    }
    if let Some((first, last)) = f.month {
        cond = cond.add(column.between(first, last));
    }
    cond
}

fn student_select(f: &Filters) -> Select<student_attendance::Entity> {
    use student_attendance::Column;

    let mut cond = dated(Column::Date, f);
    if let Some(id) = f.academic_year_id {
        cond = cond.add(Column::AcademicYearId.eq(id));
    }
    if let Some(id) = f.class_id {
        cond = cond.add(Column::ClassId.eq(id));
    }
    if let Some(id) = f.teacher_id {
        cond = cond.add(Column::TeacherId.eq(id));
    }
    student_attendance::Entity::find()
        .filter(cond)
        .order_by_desc(Column::Date)
        .order_by_desc(Column::Id)
}

/// Teacher attendance has no year column, so the year filter uses its date range
fn teacher_select(f: &Filters) -> Select<teacher_attendance::Entity> {
    use teacher_attendance::Column;

    let mut cond = dated(Column::Date, f);
    if let Some(year) = &f.academic_year {
        cond = cond.add(Column::Date.between(year.start_date, year.end_date));
    }
    if let Some(id) = f.teacher_id {
        cond = cond.add(Column::TeacherId.eq(id));
    }
    teacher_attendance::Entity::find()
        .filter(cond)
        .order_by_desc(Column::Date)
        .order_by_desc(Column::Id)
}

async fn journal_select(db: &DatabaseConnection, f: &Filters) -> AppResult<Select<journal::Entity>> {
    use journal::Column;

    let mut cond = dated(Column::Date, f);
    if let Some(id) = f.academic_year_id {
        cond = cond.add(Column::AcademicYearId.eq(id));
    }
    if let Some(id) = f.class_id {
        cond = cond.add(Column::ClassId.eq(id));
    }
    if let Some(id) = f.teacher_id {
        cond = cond.add(Column::TeacherId.eq(id));
    }
    if let Some(id) = f.subject_id {
        let ids: Vec<i32> = journal_subject::Entity::find()
            .select_only()
            .column(journal_subject::Column::JournalId)
            .filter(journal_subject::Column::SubjectId.eq(id))
            .into_tuple()
            .all(db)
            .await?;
        cond = cond.add(Column::Id.is_in(ids));
    }
    Ok(journal::Entity::find()
        .filter(cond)
        .order_by_desc(Column::Date)
        .order_by_desc(Column::Id))
}

fn with(relations: &[&str]) -> Vec<String> {
    relations.iter().map(|s| s.to_string()).collect()
}

const STUDENT_WITH: [&str; 5] = ["teacher", "classroom", "academic_year", "subjects.subject", "details.student"];
const TEACHER_WITH: [&str; 1] = ["teacher"];
const JOURNAL_WITH: [&str; 4] = ["teacher", "classroom", "academic_year", "subjects.subject"];

async fn page_of<E>(
    db: &DatabaseConnection,
    select: Select<E>,
    resource: &Resource,
    relations: &[&str],
    params: &ReportQuery,
    list: &ListQuery,
) -> AppResult<Paginated>
where
    E: EntityTrait,
    E::Model: Serialize + Send + Sync,
{
    let (page, per_page) = params.page();
    let paginator = select.paginate(db, per_page);
    let total = paginator.num_items().await?;
    let models = paginator.fetch_page(page - 1).await?;
    let data = query::fetch_rows(db, resource, &models, &with(relations)).await?;
    Ok(Paginated::new(data, total, page, per_page, list))
}

/// `part / total` as a percentage with two decimals, 0 for an empty total
pub fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 10000.0).round() / 100.0
}

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct StudentSummary {
    pub total_records: u64,
    pub total_students: u64,
    pub present_count: u64,
    pub absent_count: u64,
    pub sick_count: u64,
    pub permission_count: u64,
    pub late_count: u64,
    pub attendance_percentage: f64,
}

impl StudentSummary {
    pub fn new(total_records: u64, details: &[student_attendance_detail::Model]) -> Self {
        let count = |status: &str| details.iter().filter(|d| d.status == status).count() as u64;
        let students: HashSet<i32> = details.iter().map(|d| d.student_id).collect();
        let present = count("hadir");
        Self {
            total_records,
            total_students: students.len() as u64,
            present_count: present,
            absent_count: count("alpa"),
            sick_count: count("sakit"),
            permission_count: count("ijin"),
            late_count: count("telat"),
            attendance_percentage: percentage(present, details.len() as u64),
        }
    }

    fn lines(&self) -> Vec<(String, String)> {
        vec![
            ("Total Data".to_string(), self.total_records.to_string()),
            ("Total Siswa".to_string(), self.total_students.to_string()),
            (
                "Hadir / Alpa / Sakit / Izin / Terlambat".to_string(),
                format!(
                    "{} / {} / {} / {} / {}",
                    self.present_count, self.absent_count, self.sick_count, self.permission_count, self.late_count
                ),
            ),
            ("Persentase Kehadiran".to_string(), format!("{}%", self.attendance_percentage)),
        ]
    }
}

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct TeacherSummary {
    pub total_records: u64,
    pub unique_teachers: u64,
    pub present_days: u64,
    pub absent_days: u64,
    pub sick_days: u64,
    pub permission_days: u64,
    pub leave_days: u64,
    pub attendance_percentage: f64,
}

impl TeacherSummary {
    pub fn new(rows: &[teacher_attendance::Model]) -> Self {
        let count = |statuses: &[&str]| {
            rows.iter()
                .filter(|r| statuses.iter().any(|s| *s == r.status))
                .count() as u64
        };
        let teachers: HashSet<i32> = rows.iter().map(|r| r.teacher_id).collect();
        let present = count(&[teacher_attendance::CHECK_IN, teacher_attendance::CHECK_OUT]);
        let sick = count(&[teacher_attendance::SICK]);
        let permission = count(&[teacher_attendance::PERMISSION]);
        let leave = count(&[teacher_attendance::ON_LEAVE]);
        Self {
            total_records: rows.len() as u64,
            unique_teachers: teachers.len() as u64,
            present_days: present,
            absent_days: sick + permission + leave,
            sick_days: sick,
            permission_days: permission,
            leave_days: leave,
            attendance_percentage: percentage(present, rows.len() as u64),
        }
    }

    fn lines(&self) -> Vec<(String, String)> {
        vec![
            ("Total Data".to_string(), self.total_records.to_string()),
            ("Jumlah Guru".to_string(), self.unique_teachers.to_string()),
            (
                "Hadir / Sakit / Izin / Cuti".to_string(),
                format!(
                    "{} / {} / {} / {}",
                    self.present_days, self.sick_days, self.permission_days, self.leave_days
                ),
            ),
            ("Persentase Kehadiran".to_string(), format!("{}%", self.attendance_percentage)),
        ]
    }
}

#[derive(Debug, PartialEq, Serialize)]
pub struct SubjectCount {
    pub subject_name: String,
    pub count: u64,
}

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct JournalSummary {
    pub total_journals: u64,
    pub unique_teachers: u64,
    pub unique_classes: u64,
    pub total_subjects: u64,
    pub subject_breakdown: Vec<SubjectCount>,
}

impl JournalSummary {
    /// `links` are the subject rows of `journals`; `names` maps subject ids to names
    pub fn new(
        journals: &[journal::Model],
        links: &[journal_subject::Model],
        names: &HashMap<i32, String>,
    ) -> Self {
        let teachers: HashSet<i32> = journals.iter().map(|j| j.teacher_id).collect();
        let classes: HashSet<i32> = journals.iter().map(|j| j.class_id).collect();

        let mut counts: HashMap<i32, u64> = HashMap::new();
        for link in links {
            *counts.entry(link.subject_id).or_default() += 1;
        }
        let mut breakdown: Vec<SubjectCount> = counts
            .iter()
            .map(|(id, count)| SubjectCount {
                subject_name: names.get(id).cloned().unwrap_or_else(|| "Unknown".to_string()),
                count: *count,
            })
            .collect();
        breakdown.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.subject_name.cmp(&b.subject_name)));
        breakdown.truncate(BREAKDOWN_SIZE);

        Self {
            total_journals: journals.len() as u64,
            unique_teachers: teachers.len() as u64,
            unique_classes: classes.len() as u64,
            total_subjects: counts.len() as u64,
            subject_breakdown: breakdown,
        }
    }

    fn lines(&self) -> Vec<(String, String)> {
        let top = self
            .subject_breakdown
            .iter()
            .map(|s| format!("{} ({})", s.subject_name, s.count))
            .collect::<Vec<_>>()
            .join(", ");
        vec![
            ("Total Jurnal".to_string(), self.total_journals.to_string()),
            ("Jumlah Guru".to_string(), self.unique_teachers.to_string()),
            ("Jumlah Kelas".to_string(), self.unique_classes.to_string()),
            ("Mata Pelajaran Terbanyak".to_string(), if top.is_empty() { "-".to_string() } else { top }),
        ]
    }
}

async fn student_summary(db: &DatabaseConnection, f: &Filters) -> AppResult<StudentSummary> {
    let headers = student_select(f).all(db).await?;
    let ids: Vec<i32> = headers.iter().map(|h| h.id).collect();
    let details = if ids.is_empty() {
        Vec::new()
    } else {
        student_attendance_detail::Entity::find()
            .filter(student_attendance_detail::Column::StudentAttendanceId.is_in(ids))
            .all(db)
            .await?
    };
    Ok(StudentSummary::new(headers.len() as u64, &details))
}

async fn teacher_summary(db: &DatabaseConnection, f: &Filters) -> AppResult<TeacherSummary> {
    let rows = teacher_select(f).all(db).await?;
    Ok(TeacherSummary::new(&rows))
}

async fn journal_summary(db: &DatabaseConnection, f: &Filters) -> AppResult<JournalSummary> {
    let journals = journal_select(db, f).await?.all(db).await?;
    let ids: Vec<i32> = journals.iter().map(|j| j.id).collect();
    let links = if ids.is_empty() {
        Vec::new()
    } else {
        journal_subject::Entity::find()
            .filter(journal_subject::Column::JournalId.is_in(ids))
            .all(db)
            .await?
    };
    let names: HashMap<i32, String> = subject::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();
    Ok(JournalSummary::new(&journals, &links, &names))
}

/// Text of a JSON cell, `-` when missing or empty
fn cell(value: &Value) -> String {
    match value {
        Value::String(s) if !s.trim().is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => "-".to_string(),
    }
}

/// `2024-03-01` -> `01/03/2024`
fn dmy(value: &Value) -> String {
    value
        .as_str()
        .and_then(validation::parse_date)
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn student_status_label(status: &str) -> &str {
    match status {
        "hadir" => "Hadir",
        "ijin" => "Izin",
        "sakit" => "Sakit",
        "alpa" => "Alpa",
        "telat" => "Terlambat",
        other => other,
    }
}

/// Heading lines describing the active filters
async fn filter_lines(
    db: &DatabaseConnection,
    f: &Filters,
    params: &ReportQuery,
    by_class: bool,
) -> AppResult<Vec<(String, String)>> {
    let mut lines = Vec::new();
    if let Some((start, end)) = f.period {
        lines.push((
            "Periode".to_string(),
            format!("{} - {}", start.format("%d/%m/%Y"), end.format("%d/%m/%Y")),
        ));
    }
    if let Some(month) = &params.month {
        lines.push(("Bulan".to_string(), month.clone()));
    }
    if let Some(year) = &f.academic_year {
        lines.push(("Tahun Ajaran".to_string(), year.label()));
    }
    if by_class {
        let class_name = match f.class_id {
            Some(id) => classroom::Entity::find_by_id(id).one(db).await?.map(|c| c.name),
            None => None,
        };
        lines.push(("Kelas".to_string(), class_name.unwrap_or_else(|| "Semua Kelas".to_string())));
    }
    let teacher_name = match f.teacher_id {
        Some(id) => user::Entity::find_by_id(id).one(db).await?.map(|u| u.name),
        None => None,
    };
    lines.push(("Guru".to_string(), teacher_name.unwrap_or_else(|| "Semua Guru".to_string())));
    lines.push(("Dicetak".to_string(), Local::now().format("%d/%m/%Y %H:%M:%S").to_string()));
    Ok(lines)
}

async fn student_table(db: &DatabaseConnection, params: &ReportQuery) -> AppResult<Table> {
    let f = params.filters(db).await?;
    let models = student_select(&f).all(db).await?;
    let rows = query::fetch_rows(db, &student_attendance::QUERY, &models, &with(&STUDENT_WITH)).await?;

    let mut table_rows = Vec::new();
    for row in &rows {
        for detail in row["details"].as_array().into_iter().flatten() {
            table_rows.push(vec![
                (table_rows.len() + 1).to_string(),
                dmy(&row["date"]),
                cell(&row["classroom"]["name"]),
                cell(&row["teacher"]["name"]),
                cell(&detail["student"]["name"]),
                student_status_label(detail["status"].as_str().unwrap_or("-")).to_string(),
                cell(&detail["note"]),
            ]);
        }
    }

    let mut info = filter_lines(db, &f, params, true).await?;
    info.extend(student_summary(db, &f).await?.lines());
    Ok(Table {
        title: "Laporan Absensi Siswa".to_string(),
        info,
        headings: vec!["No", "Tanggal", "Kelas", "Guru", "Nama Siswa", "Status", "Catatan"],
        widths: vec![0.5, 1.2, 1.5, 2.0, 2.5, 1.0, 2.5],
        rows: table_rows,
    })
}

async fn teacher_table(db: &DatabaseConnection, params: &ReportQuery) -> AppResult<Table> {
    let f = params.filters(db).await?;
    let models = teacher_select(&f).all(db).await?;
    let rows = query::fetch_rows(db, &teacher_attendance::QUERY, &models, &with(&TEACHER_WITH)).await?;

    let table_rows = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            vec![
                (i + 1).to_string(),
                dmy(&row["date"]),
                cell(&row["teacher"]["name"]),
                cell(&row["teacher"]["nip"]),
                cell(&row["time_in"]),
                cell(&row["time_out"]),
                teacher_attendance::status_label(row["status"].as_str().unwrap_or("")).to_string(),
                cell(&row["notes"]),
            ]
        })
        .collect();

    let mut info = filter_lines(db, &f, params, false).await?;
    info.extend(teacher_summary(db, &f).await?.lines());
    Ok(Table {
        title: "Laporan Absensi Guru".to_string(),
        info,
        headings: vec!["No", "Tanggal", "Nama Guru", "NIP", "Waktu Masuk", "Waktu Keluar", "Status", "Catatan"],
        widths: vec![0.5, 1.2, 2.5, 1.5, 1.0, 1.0, 1.0, 2.5],
        rows: table_rows,
    })
}

async fn journal_table(db: &DatabaseConnection, params: &ReportQuery) -> AppResult<Table> {
    let f = params.filters(db).await?;
    let models = journal_select(db, &f).await?.all(db).await?;
    let rows = query::fetch_rows(db, &journal::QUERY, &models, &with(&JOURNAL_WITH)).await?;

    let table_rows = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let subjects = row["subjects"]
                .as_array()
                .into_iter()
                .flatten()
                .map(|s| cell(&s["subject"]["name"]))
                .collect::<Vec<_>>()
                .join(", ");
            vec![
                (i + 1).to_string(),
                dmy(&row["date"]),
                cell(&row["teacher"]["name"]),
                cell(&row["classroom"]["name"]),
                if subjects.is_empty() { "-".to_string() } else { subjects },
                cell(&row["theme"]),
                cell(&row["activity"]),
                cell(&row["notes"]),
            ]
        })
        .collect();

    let mut info = filter_lines(db, &f, params, true).await?;
    info.extend(journal_summary(db, &f).await?.lines());
    Ok(Table {
        title: "Laporan Jurnal Guru".to_string(),
        info,
        headings: vec!["No", "Tanggal", "Nama Guru", "Kelas", "Mata Pelajaran", "Tema", "Kegiatan", "Catatan"],
        widths: vec![0.5, 1.1, 2.0, 1.3, 2.0, 2.2, 2.8, 2.0],
        rows: table_rows,
    })
}

fn pdf(table: &Table, prefix: &str) -> AppResult<Response> {
    let bytes = export::to_pdf(table)?;
    let name = export::filename(prefix, "pdf", Local::now());
    tracing::info!("Exported {} ({} rows)", name, table.rows.len());
    Ok(export::attachment(&name, "application/pdf", bytes))
}

fn spreadsheet(table: &Table, prefix: &str) -> AppResult<Response> {
    let bytes = export::to_csv(table)?;
    let name = export::filename(prefix, "csv", Local::now());
    tracing::info!("Exported {} ({} rows)", name, table.rows.len());
    Ok(export::attachment(&name, "text/csv; charset=utf-8", bytes))
}

/// GET /api/v1/reports/student-attendance
pub async fn student_attendance_report(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppQuery(params): AppQuery<ReportQuery>,
    list: ListQuery,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::REPORT_STUDENT_ATTENDANCE)?;
    let f = params.filters(&db).await?;
    let page = page_of(&db, student_select(&f), &student_attendance::QUERY, &STUDENT_WITH, &params, &list).await?;
    Ok(Json(ApiResponse::with_message(
        "Data laporan absensi siswa",
        json!({ "attendances": page }),
    )))
}

/// GET /api/v1/reports/student-attendance/summary
pub async fn student_attendance_summary(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppQuery(params): AppQuery<ReportQuery>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::REPORT_STUDENT_ATTENDANCE)?;
    let f = params.filters(&db).await?;
    let summary = student_summary(&db, &f).await?;
    Ok(Json(ApiResponse::with_message(
        "Summary laporan absensi siswa",
        json!({ "summary": summary }),
    )))
}

/// GET /api/v1/reports/student-attendance/export/pdf
pub async fn student_attendance_pdf(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppQuery(params): AppQuery<ReportQuery>,
) -> AppResult<Response> {
    current_user.require(perm::REPORT_STUDENT_ATTENDANCE)?;
    pdf(&student_table(&db, &params).await?, STUDENT_PREFIX)
}

/// GET /api/v1/reports/student-attendance/export/excel
pub async fn student_attendance_excel(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppQuery(params): AppQuery<ReportQuery>,
) -> AppResult<Response> {
    current_user.require(perm::REPORT_STUDENT_ATTENDANCE)?;
    spreadsheet(&student_table(&db, &params).await?, STUDENT_PREFIX)
}

/// GET /api/v1/reports/teacher-attendance
pub async fn teacher_attendance_report(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppQuery(params): AppQuery<ReportQuery>,
    list: ListQuery,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::REPORT_TEACHER_ATTENDANCE)?;
    let f = params.filters(&db).await?;
    let page = page_of(&db, teacher_select(&f), &teacher_attendance::QUERY, &TEACHER_WITH, &params, &list).await?;
    Ok(Json(ApiResponse::with_message(
        "Data laporan absensi guru",
        json!({ "attendances": page }),
    )))
}

/// GET /api/v1/reports/teacher-attendance/summary
pub async fn teacher_attendance_summary(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppQuery(params): AppQuery<ReportQuery>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::REPORT_TEACHER_ATTENDANCE)?;
    let f = params.filters(&db).await?;
    let summary = teacher_summary(&db, &f).await?;
    Ok(Json(ApiResponse::with_message(
        "Summary laporan absensi guru",
        json!({ "summary": summary }),
    )))
}

/// GET /api/v1/reports/teacher-attendance/export/pdf
pub async fn teacher_attendance_pdf(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppQuery(params): AppQuery<ReportQuery>,
) -> AppResult<Response> {
    current_user.require(perm::REPORT_TEACHER_ATTENDANCE)?;
    pdf(&teacher_table(&db, &params).await?, TEACHER_PREFIX)
}

/// GET /api/v1/reports/teacher-attendance/export/excel
pub async fn teacher_attendance_excel(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppQuery(params): AppQuery<ReportQuery>,
) -> AppResult<Response> {
    current_user.require(perm::REPORT_TEACHER_ATTENDANCE)?;
    spreadsheet(&teacher_table(&db, &params).await?, TEACHER_PREFIX)
}

/// GET /api/v1/reports/teacher-journals
pub async fn teacher_journal_report(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppQuery(params): AppQuery<ReportQuery>,
    list: ListQuery,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::REPORT_TEACHER_JOURNALS)?;
    let f = params.filters(&db).await?;
    let select = journal_select(&db, &f).await?;
    let page = page_of(&db, select, &journal::QUERY, &JOURNAL_WITH, &params, &list).await?;
    Ok(Json(ApiResponse::with_message(
        "Data laporan jurnal guru",
        json!({ "journals": page }),
    )))
}

/// GET /api/v1/reports/teacher-journals/summary
pub async fn teacher_journal_summary(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppQuery(params): AppQuery<ReportQuery>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::REPORT_TEACHER_JOURNALS)?;
    let f = params.filters(&db).await?;
    let summary = journal_summary(&db, &f).await?;
    Ok(Json(ApiResponse::with_message(
        "Summary laporan jurnal guru",
        json!({ "summary": summary }),
    )))
}

/// GET /api/v1/reports/teacher-journals/export/pdf
pub async fn teacher_journal_pdf(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppQuery(params): AppQuery<ReportQuery>,
) -> AppResult<Response> {
    current_user.require(perm::REPORT_TEACHER_JOURNALS)?;
    pdf(&journal_table(&db, &params).await?, JOURNAL_PREFIX)
}

/// GET /api/v1/reports/teacher-journals/export/excel
pub async fn teacher_journal_excel(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppQuery(params): AppQuery<ReportQuery>,
) -> AppResult<Response> {
    current_user.require(perm::REPORT_TEACHER_JOURNALS)?;
    spreadsheet(&journal_table(&db, &params).await?, JOURNAL_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn detail(student_id: i32, status: &str) -> student_attendance_detail::Model {
        student_attendance_detail::Model {
            id: 0,
            student_attendance_id: 1,
            student_id,
            status: status.to_string(),
            note: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn journal_row(id: i32, teacher_id: i32, class_id: i32) -> journal::Model {
        journal::Model {
            id,
            teacher_id,
            class_id,
            academic_year_id: None,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            theme: "Tema".to_string(),
            activity: "Kegiatan".to_string(),
            notes: None,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn link(journal_id: i32, subject_id: i32) -> journal_subject::Model {
        journal_subject::Model {
            id: 0,
            journal_id,
            subject_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 2), 50.0);
        assert_eq!(percentage(2, 3), 66.67);
    }

    #[test]
    fn test_student_summary() {
        let details = vec![detail(1, "hadir"), detail(2, "alpa"), detail(1, "telat"), detail(3, "hadir")];
        let summary = StudentSummary::new(2, &details);
        assert_eq!(summary.total_records, 2);
        assert_eq!(summary.total_students, 3);
        assert_eq!(summary.present_count, 2);
        assert_eq!(summary.absent_count, 1);
        assert_eq!(summary.late_count, 1);
        assert_eq!(summary.attendance_percentage, 50.0);
        assert_eq!(StudentSummary::new(0, &[]).attendance_percentage, 0.0);
    }

    #[test]
    fn test_journal_summary_breakdown() {
        let journals = vec![journal_row(1, 10, 100), journal_row(2, 10, 101), journal_row(3, 11, 100)];
        let links: Vec<_> = [(1, 1), (2, 1), (3, 1), (1, 2), (2, 3), (3, 3), (1, 4), (1, 5), (2, 6)]
            .into_iter()
            .map(|(j, s)| link(j, s))
            .collect();
        let names: HashMap<i32, String> = (1..=6).map(|id| (id, format!("Mapel {}", id))).collect();

        let summary = JournalSummary::new(&journals, &links, &names);
        assert_eq!(summary.total_journals, 3);
        assert_eq!(summary.unique_teachers, 2);
        assert_eq!(summary.unique_classes, 2);
        assert_eq!(summary.total_subjects, 6);
        assert_eq!(summary.subject_breakdown.len(), 5);
        assert_eq!(summary.subject_breakdown[0], SubjectCount { subject_name: "Mapel 1".into(), count: 3 });
        assert_eq!(summary.subject_breakdown[1].subject_name, "Mapel 3");
    }

    #[test]
    fn test_cells() {
        assert_eq!(cell(&json!(null)), "-");
        assert_eq!(cell(&json!("  ")), "-");
        assert_eq!(cell(&json!(12)), "12");
        assert_eq!(dmy(&json!("2024-03-01")), "01/03/2024");
        assert_eq!(student_status_label("telat"), "Terlambat");
    }
}
