//! Schedule entity - 课程表

use chrono::{Datelike, NaiveDate, Weekday};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{hm, timestamped};
use crate::query::{self, EntityLoader, Field, Resource};

/// School days, Monday first
pub const DAYS: [&str; 6] = ["Senin", "Selasa", "Rabu", "Kamis", "Jumat", "Sabtu"];

/// Indonesian day name of `date`, `None` on Sunday
pub fn day_name(date: NaiveDate) -> Option<&'static str> {
    match date.weekday() {
        Weekday::Sun => None,
        day => DAYS.get(day.num_days_from_monday() as usize).copied(),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "schedules")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub teacher_id: i32,
    pub class_id: i32,
    pub subject_id: i32,
    pub academic_year_id: Option<i32>,

    #[sea_orm(column_type = "String(Some(10))")]
    pub day: String,

    #[serde(serialize_with = "hm::serialize")]
    pub start_time: Time,
    #[serde(serialize_with = "hm::serialize")]
    pub end_time: Time,

    pub active: bool,

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
    #[sea_orm(
        belongs_to = "super::classroom::Entity",
        from = "Column::ClassId",
        to = "super::classroom::Column::Id",
        on_delete = "Restrict"
    )]
    Classroom,
    #[sea_orm(
        belongs_to = "super::subject::Entity",
        from = "Column::SubjectId",
        to = "super::subject::Column::Id",
        on_delete = "Restrict"
    )]
    Subject,
    #[sea_orm(
        belongs_to = "super::academic_year::Entity",
        from = "Column::AcademicYearId",
        to = "super::academic_year::Column::Id",
        on_delete = "SetNull"
    )]
    AcademicYear,
}

timestamped!();

static LOADER: EntityLoader<Entity> = EntityLoader::new();

pub static QUERY: Resource = Resource {
    model: "Schedule",
    table: "schedules",
    fields: &[
        Field::int("id"),
        Field::int("teacher_id"),
        Field::int("class_id"),
        Field::int("subject_id"),
        Field::int("academic_year_id"),
        Field::text("day"),
        Field::time("start_time"),
        Field::time("end_time"),
        Field::boolean("active"),
        Field::timestamp("created_at"),
        Field::timestamp("updated_at"),
    ],
    relations: &[
        query::Relation::belongs_to("teacher", "teacher_id", super::user::query),
        query::Relation::belongs_to("subject", "subject_id", super::subject::query),
        query::Relation::belongs_to("classroom", "class_id", super::classroom::query),
        query::Relation::belongs_to("class", "class_id", super::classroom::query),
        query::Relation::belongs_to("academic_year", "academic_year_id", super::academic_year::query),
    ],
    searchable: &["day", "teacher.name", "subject.name", "classroom.name"],
    default_with: &["teacher", "subject", "classroom", "academic_year"],
    default_sort: "-created_at",
    loader: &LOADER,
    appends: Some(super::append_flags),
};

pub fn query() -> &'static Resource {
    &QUERY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_name() {
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(day_name(monday), Some("Senin"));
        assert_eq!(day_name(monday + chrono::Duration::days(4)), Some("Jumat"));
        assert_eq!(day_name(monday + chrono::Duration::days(5)), Some("Sabtu"));
        assert_eq!(day_name(monday + chrono::Duration::days(6)), None);
    }
}
