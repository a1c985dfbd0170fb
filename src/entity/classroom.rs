//! Classroom entity (table `classes`)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::timestamped;
use crate::query::{self, EntityLoader, Field, Resource};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "classes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "String(Some(255))", unique)]
    pub name: String,

    /// Homeroom teacher
    pub teacher_id: Option<i32>,

    pub academic_year_id: Option<i32>,

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
        on_delete = "SetNull"
    )]
    Teacher,
    #[sea_orm(
        belongs_to = "super::academic_year::Entity",
        from = "Column::AcademicYearId",
        to = "super::academic_year::Column::Id",
        on_delete = "SetNull"
    )]
    AcademicYear,
    #[sea_orm(has_many = "super::student::Entity")]
    Student,
}

impl Related<super::academic_year::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AcademicYear.def()
    }
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

timestamped!();

static LOADER: EntityLoader<Entity> = EntityLoader::new();

pub static QUERY: Resource = Resource {
    model: "Classroom",
    table: "classes",
    fields: &[
        Field::int("id"),
        Field::text("name"),
        Field::int("teacher_id"),
        Field::int("academic_year_id"),
        Field::boolean("active"),
        Field::timestamp("created_at"),
        Field::timestamp("updated_at"),
    ],
    relations: &[
        query::Relation::belongs_to("teacher", "teacher_id", super::user::query),
        query::Relation::belongs_to("academic_year", "academic_year_id", super::academic_year::query),
        query::Relation::has_many("students", "class_id", super::student::query),
    ],
    searchable: &["name"],
    default_with: &[],
    default_sort: "-created_at",
    loader: &LOADER,
    appends: Some(super::append_flags),
};

pub fn query() -> &'static Resource {
    &QUERY
}
