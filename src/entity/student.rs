//! Student entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::timestamped;
use crate::query::{self, EntityLoader, Field, Resource};

pub const GENDERS: [&str; 2] = ["L", "P"];

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "students")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// 学号 (唯一)
    #[sea_orm(column_type = "String(Some(50))", unique)]
    pub nis: String,

    #[sea_orm(column_type = "String(Some(255))")]
    pub name: String,

    /// `L` or `P`
    #[sea_orm(column_type = "String(Some(1))")]
    pub gender: String,

    pub class_id: i32,

    #[sea_orm(column_type = "String(Some(20))", nullable, unique)]
    pub phone: Option<String>,

    pub active: bool,

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
}

impl Related<super::classroom::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Classroom.def()
    }
}

timestamped!();

static LOADER: EntityLoader<Entity> = EntityLoader::new();

pub static QUERY: Resource = Resource {
    model: "Student",
    table: "students",
    fields: &[
        Field::int("id"),
        Field::text("nis"),
        Field::text("name"),
        Field::text("gender"),
        Field::int("class_id"),
        Field::text("phone"),
        Field::boolean("active"),
        Field::timestamp("created_at"),
        Field::timestamp("updated_at"),
    ],
    relations: &[query::Relation::belongs_to("classroom", "class_id", super::classroom::query)],
    searchable: &["name", "nis", "classroom.name"],
    default_with: &[],
    default_sort: "-created_at",
    loader: &LOADER,
    appends: Some(super::append_flags),
};

pub fn query() -> &'static Resource {
    &QUERY
}
