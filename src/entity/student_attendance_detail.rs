//! Per-student status within a student attendance

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::timestamped;
use crate::query::{self, EntityLoader, Field, Resource};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "student_attendance_details")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub student_attendance_id: i32,
    pub student_id: i32,

    #[sea_orm(column_type = "String(Some(10))")]
    pub status: String,

    #[sea_orm(column_type = "String(Some(500))", nullable)]
    pub note: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::student_attendance::Entity",
        from = "Column::StudentAttendanceId",
        to = "super::student_attendance::Column::Id",
        on_delete = "Cascade"
    )]
    StudentAttendance,
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id",
        on_delete = "Cascade"
    )]
    Student,
}

impl Related<super::student_attendance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StudentAttendance.def()
    }
}

timestamped!();

static LOADER: EntityLoader<Entity> = EntityLoader::new();

pub static QUERY: Resource = Resource {
    model: "StudentAttendanceDetail",
    table: "student_attendance_details",
    fields: &[
        Field::int("id"),
        Field::int("student_attendance_id"),
        Field::int("student_id"),
        Field::text("status"),
        Field::text("note"),
    ],
    relations: &[query::Relation::belongs_to("student", "student_id", super::student::query)],
    searchable: &["status", "student.name"],
    default_with: &[],
    default_sort: "id",
    loader: &LOADER,
    appends: None,
};

pub fn query() -> &'static Resource {
    &QUERY
}
