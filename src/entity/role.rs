//! Role entity - 角色表

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::timestamped;
use crate::query::{self, EntityLoader, Field, Resource};

/// Role granted every permission during seeding
pub const ADMIN: &str = "admin";
pub const TEACHER: &str = "teacher";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "roles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// snake_case of the label (unique)
    #[sea_orm(column_type = "String(Some(255))", unique)]
    pub name: String,

    #[sea_orm(column_type = "String(Some(255))")]
    pub label: String,

    pub active: bool,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user::Entity")]
    User,
    #[sea_orm(has_many = "super::permission_role::Entity")]
    PermissionRole,
}

timestamped!();

static LOADER: EntityLoader<Entity> = EntityLoader::new();

pub static QUERY: Resource = Resource {
    model: "Role",
    table: "roles",
    fields: &[
        Field::int("id"),
        Field::text("name"),
        Field::text("label"),
        Field::boolean("active"),
        Field::timestamp("created_at"),
        Field::timestamp("updated_at"),
    ],
    relations: &[
        query::Relation::belongs_to_many(
            "permissions",
            "permission_roles",
            "role_id",
            "permission_id",
            super::permission::query,
        ),
        query::Relation::has_many("users", "role_id", super::user::query),
    ],
    searchable: &["name", "label"],
    default_with: &[],
    default_sort: "-created_at",
    loader: &LOADER,
    appends: Some(super::append_flags),
};

pub fn query() -> &'static Resource {
    &QUERY
}
