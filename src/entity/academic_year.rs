//! Academic year entity
//!
//! At most one year is active; classrooms follow the active year.

use sea_orm::entity::prelude::*;
use sea_orm::QueryOrder;
use serde::{Deserialize, Serialize};

use super::timestamped;
use crate::query::{self, EntityLoader, Field, Resource};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "academic_years")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// e.g. `2024/2025`
    #[sea_orm(column_type = "String(Some(255))")]
    pub name: String,

    /// 1 or 2
    pub semester: i32,

    pub start_date: Date,
    pub end_date: Date,

    pub active: bool,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// `2024/2025 (Semester 1)`
    pub fn label(&self) -> String {
        format!("{} (Semester {})", self.name, self.semester)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::classroom::Entity")]
    Classroom,
}

impl Related<super::classroom::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Classroom.def()
    }
}

timestamped!();

static LOADER: EntityLoader<Entity> = EntityLoader::new();

pub static QUERY: Resource = Resource {
    model: "AcademicYear",
    table: "academic_years",
    fields: &[
        Field::int("id"),
        Field::text("name"),
        Field::int("semester"),
        Field::date("start_date"),
        Field::date("end_date"),
        Field::boolean("active"),
        Field::timestamp("created_at"),
        Field::timestamp("updated_at"),
    ],
    relations: &[query::Relation::has_many("classrooms", "academic_year_id", super::classroom::query)],
    searchable: &["name"],
    default_with: &[],
    default_sort: "-created_at",
    loader: &LOADER,
    appends: Some(super::append_flags),
};

pub fn query() -> &'static Resource {
    &QUERY
}

/// The active year, if any
pub async fn active<C: ConnectionTrait>(db: &C) -> Result<Option<Model>, DbErr> {
    Entity::find()
        .filter(Column::Active.eq(true))
        .order_by_desc(Column::Id)
        .one(db)
        .await
}
