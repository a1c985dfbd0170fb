//! Teacher attendance entity - 教师考勤
//!
//! One row per teacher per day: either a check-in/check-out pair or an
//! absence (sick, permission, on_leave) without times.

use chrono::NaiveTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use super::{hm, timestamped};
use crate::query::{self, EntityLoader, Field, Resource, Row};
use crate::validation::parse_time_hm;

pub const CHECK_IN: &str = "check_in";
pub const CHECK_OUT: &str = "check_out";
pub const SICK: &str = "sick";
pub const PERMISSION: &str = "permission";
pub const ON_LEAVE: &str = "on_leave";

pub const STATUSES: [&str; 5] = [CHECK_IN, CHECK_OUT, SICK, PERMISSION, ON_LEAVE];
pub const ABSENCES: [&str; 3] = [SICK, PERMISSION, ON_LEAVE];

/// Display label of a status
pub fn status_label(status: &str) -> &'static str {
    match status {
        CHECK_IN => "Masuk",
        CHECK_OUT => "Pulang",
        SICK => "Sakit",
        PERMISSION => "Izin",
        ON_LEAVE => "Cuti",
        _ => "Tidak diketahui",
    }
}

/// `HH:MM` between two times, `-` unless both are present and ordered
pub fn work_duration(time_in: Option<NaiveTime>, time_out: Option<NaiveTime>) -> String {
    match (time_in, time_out) {
        (Some(start), Some(end)) if end >= start => {
            let minutes = (end - start).num_minutes();
            format!("{:02}:{:02}", minutes / 60, minutes % 60)
        }
        _ => "-".to_string(),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "teacher_attendances")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub teacher_id: i32,
    pub date: Date,

    #[serde(serialize_with = "hm::serialize_opt")]
    pub time_in: Option<Time>,
    #[serde(serialize_with = "hm::serialize_opt")]
    pub time_out: Option<Time>,

    #[sea_orm(column_type = "String(Some(255))", nullable)]
    pub photo_in: Option<String>,
    #[sea_orm(column_type = "String(Some(255))", nullable)]
    pub photo_out: Option<String>,

    #[sea_orm(column_type = "String(Some(20))")]
    pub status: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::TeacherId",
        to = "super::user::Column::Id",
        on_delete = "Restrict"
    )]
    Teacher,
}

timestamped!();

fn appends(row: &mut Row) {
    let time = |key: &str| row.get(key).and_then(Json::as_str).and_then(parse_time_hm);
    let duration = work_duration(time("time_in"), time("time_out"));
    let label = status_label(row.get("status").and_then(Json::as_str).unwrap_or(""));
    row.insert("work_duration".into(), Json::String(duration));
    row.insert("status_label".into(), Json::String(label.to_string()));
    super::append_flags(row);
}

static LOADER: EntityLoader<Entity> = EntityLoader::new();

pub static QUERY: Resource = Resource {
    model: "TeacherAttendance",
    table: "teacher_attendances",
    fields: &[
        Field::int("id"),
        Field::int("teacher_id"),
        Field::date("date"),
        Field::time("time_in"),
        Field::time("time_out"),
        Field::text("status"),
        Field::text("notes"),
        Field::timestamp("created_at"),
        Field::timestamp("updated_at"),
    ],
    relations: &[
        query::Relation::belongs_to("teacher", "teacher_id", super::user::query),
        query::Relation::has_many("histories", "teacher_attendance_id", super::attendance_history::query),
    ],
    searchable: &["date", "teacher.name", "status"],
    default_with: &["teacher", "histories"],
    default_sort: "-created_at",
    loader: &LOADER,
    appends: Some(appends),
};

pub fn query() -> &'static Resource {
    &QUERY
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Option<NaiveTime> {
        parse_time_hm(s)
    }

    #[test]
    fn test_work_duration() {
        assert_eq!(work_duration(t("07:00"), t("14:00")), "07:00");
        assert_eq!(work_duration(t("07:15"), t("15:50")), "08:35");
        assert_eq!(work_duration(t("07:00"), None), "-");
        assert_eq!(work_duration(None, None), "-");
    }

    #[test]
    fn test_appends() {
        let mut row = Row::new();
        row.insert("time_in".into(), Json::String("07:00".into()));
        row.insert("time_out".into(), Json::String("14:00".into()));
        row.insert("status".into(), Json::String(CHECK_OUT.into()));
        QUERY.decorate(&mut row);
        assert_eq!(row["work_duration"], "07:00");
        assert_eq!(row["status_label"], "Pulang");
        assert_eq!(row["editable"], true);
    }
}
