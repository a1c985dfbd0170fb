//! Subjects covered by a student attendance

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::timestamped;
use crate::query::{self, EntityLoader, Field, Resource};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "student_attendance_subjects")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub student_attendance_id: i32,
    pub subject_id: i32,
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
        belongs_to = "super::subject::Entity",
        from = "Column::SubjectId",
        to = "super::subject::Column::Id",
        on_delete = "Restrict"
    )]
    Subject,
}

impl Related<super::student_attendance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StudentAttendance.def()
    }
}

timestamped!();

static LOADER: EntityLoader<Entity> = EntityLoader::new();

pub static QUERY: Resource = Resource {
    model: "StudentAttendanceSubject",
    table: "student_attendance_subjects",
    fields: &[Field::int("id"), Field::int("student_attendance_id"), Field::int("subject_id")],
    relations: &[query::Relation::belongs_to("subject", "subject_id", super::subject::query)],
    searchable: &["subject.name"],
    default_with: &[],
    default_sort: "id",
    loader: &LOADER,
    appends: None,
};

pub fn query() -> &'static Resource {
    &QUERY
}
