//! Teacher journal entity - 教学日志

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::timestamped;
use crate::query::{self, EntityLoader, Field, Resource};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "journals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub teacher_id: i32,
    pub class_id: i32,
    pub academic_year_id: Option<i32>,

    pub date: Date,

    #[sea_orm(column_type = "Text")]
    pub theme: String,

    #[sea_orm(column_type = "Text")]
    pub activity: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,

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
        belongs_to = "super::academic_year::Entity",
        from = "Column::AcademicYearId",
        to = "super::academic_year::Column::Id",
        on_delete = "Restrict"
    )]
    AcademicYear,
    #[sea_orm(has_many = "super::journal_subject::Entity")]
    JournalSubject,
}

impl Related<super::journal_subject::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JournalSubject.def()
    }
}

timestamped!();

static LOADER: EntityLoader<Entity> = EntityLoader::new();

pub static QUERY: Resource = Resource {
    model: "Journal",
    table: "journals",
    fields: &[
        Field::int("id"),
        Field::int("teacher_id"),
        Field::int("class_id"),
        Field::int("academic_year_id"),
        Field::date("date"),
        Field::text("theme"),
        Field::text("activity"),
        Field::text("notes"),
        Field::boolean("active"),
        Field::timestamp("created_at"),
        Field::timestamp("updated_at"),
    ],
    relations: &[
        query::Relation::belongs_to("teacher", "teacher_id", super::user::query),
        query::Relation::belongs_to("classroom", "class_id", super::classroom::query),
        query::Relation::belongs_to("academic_year", "academic_year_id", super::academic_year::query),
        query::Relation::has_many("subjects", "journal_id", super::journal_subject::query),
    ],
    searchable: &["theme", "activity", "date", "teacher.name", "classroom.name"],
    default_with: &["teacher", "subjects.subject", "classroom"],
    default_sort: "-created_at",
    loader: &LOADER,
    appends: Some(super::append_flags),
};

pub fn query() -> &'static Resource {
    &QUERY
}
