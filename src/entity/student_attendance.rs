//! Student attendance header: one per class per day

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::timestamped;
use crate::query::{self, EntityLoader, Field, Resource};

/// hadir, ijin, sakit, alpa, telat
pub const STATUSES: [&str; 5] = ["hadir", "ijin", "sakit", "alpa", "telat"];

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "student_attendances")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub date: Date,
    pub teacher_id: i32,
    pub class_id: i32,
    pub academic_year_id: Option<i32>,

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
        belongs_to = "super::academic_year::Entity",
        from = "Column::AcademicYearId",
        to = "super::academic_year::Column::Id",
        on_delete = "Restrict"
    )]
    AcademicYear,
    #[sea_orm(has_many = "super::student_attendance_detail::Entity")]
    Detail,
    #[sea_orm(has_many = "super::student_attendance_subject::Entity")]
    Subject,
}

impl Related<super::student_attendance_detail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Detail.def()
    }
}

impl Related<super::student_attendance_subject::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subject.def()
    }
}

timestamped!();

static LOADER: EntityLoader<Entity> = EntityLoader::new();

pub static QUERY: Resource = Resource {
    model: "StudentAttendance",
    table: "student_attendances",
    fields: &[
        Field::int("id"),
        Field::date("date"),
        Field::int("teacher_id"),
        Field::int("class_id"),
        Field::int("academic_year_id"),
        Field::timestamp("created_at"),
        Field::timestamp("updated_at"),
    ],
    relations: &[
        query::Relation::belongs_to("teacher", "teacher_id", super::user::query),
        query::Relation::belongs_to("academic_year", "academic_year_id", super::academic_year::query),
        query::Relation::belongs_to("classroom", "class_id", super::classroom::query),
        query::Relation::has_many("subjects", "student_attendance_id", super::student_attendance_subject::query),
        query::Relation::has_many("details", "student_attendance_id", super::student_attendance_detail::query),
    ],
    searchable: &["date", "teacher.name", "academic_year.name", "classroom.name"],
    default_with: &["teacher", "academic_year", "classroom", "subjects.subject", "details.student"],
    default_sort: "-created_at",
    loader: &LOADER,
    appends: Some(super::append_flags),
};

pub fn query() -> &'static Resource {
    &QUERY
}
