//! Which class a student belonged to, per academic year

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::timestamped;
use crate::query::{self, EntityLoader, Field, Resource};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "student_class_histories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub class_id: i32,
    pub student_id: i32,
    pub academic_year_id: i32,

    pub start_date: Option<Date>,
    /// Open while `None`
    pub end_date: Option<Date>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::classroom::Entity",
        from = "Column::ClassId",
        to = "super::classroom::Column::Id",
        on_delete = "Restrict"
    )]
    Classroom,
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id",
        on_delete = "Cascade"
    )]
    Student,
    #[sea_orm(
        belongs_to = "super::academic_year::Entity",
        from = "Column::AcademicYearId",
        to = "super::academic_year::Column::Id",
        on_delete = "Restrict"
    )]
    AcademicYear,
}

timestamped!();

static LOADER: EntityLoader<Entity> = EntityLoader::new();

pub static QUERY: Resource = Resource {
    model: "StudentClassHistory",
    table: "student_class_histories",
    fields: &[
        Field::int("id"),
        Field::int("class_id"),
        Field::int("student_id"),
        Field::int("academic_year_id"),
        Field::date("start_date"),
        Field::date("end_date"),
        Field::timestamp("created_at"),
        Field::timestamp("updated_at"),
    ],
    relations: &[
        query::Relation::belongs_to("class", "class_id", super::classroom::query),
        query::Relation::belongs_to("student", "student_id", super::student::query),
        query::Relation::belongs_to("academic_year", "academic_year_id", super::academic_year::query),
    ],
    searchable: &["student.name", "class.name", "academic_year.name"],
    default_with: &["class", "student", "academic_year"],
    default_sort: "-created_at",
    loader: &LOADER,
    appends: Some(super::append_flags),
};

pub fn query() -> &'static Resource {
    &QUERY
}
