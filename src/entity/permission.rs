//! Permission entity - 权限表

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::timestamped;
use crate::query::{EntityLoader, Field, Resource};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "permissions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Dotted name, e.g. `master_data.users.view`
    #[sea_orm(column_type = "String(Some(255))", unique)]
    pub name: String,

    #[sea_orm(column_type = "String(Some(255))")]
    pub label: String,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::permission_role::Entity")]
    PermissionRole,
}

timestamped!();

static LOADER: EntityLoader<Entity> = EntityLoader::new();

pub static QUERY: Resource = Resource {
    model: "Permission",
    table: "permissions",
    fields: &[
        Field::int("id"),
        Field::text("name"),
        Field::text("label"),
        Field::timestamp("created_at"),
        Field::timestamp("updated_at"),
    ],
    relations: &[],
    searchable: &["name", "label"],
    default_with: &[],
    default_sort: "name",
    loader: &LOADER,
    appends: None,
};

pub fn query() -> &'static Resource {
    &QUERY
}
