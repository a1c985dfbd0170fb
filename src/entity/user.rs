//! User entity - 用户表
//!
//! Teachers and administrators share this table; the role decides which.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::timestamped;
use crate::query::{self, EntityLoader, Field, Resource};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "String(Some(255))")]
    pub name: String,

    /// 邮箱 (唯一, 登录名)
    #[sea_orm(column_type = "String(Some(255))", unique)]
    pub email: String,

    /// 密码 (bcrypt 哈希)
    #[sea_orm(column_type = "String(Some(255))")]
    #[serde(skip_serializing)]
    pub password: String,

    /// Employee number
    #[sea_orm(column_type = "String(Some(50))", nullable, unique)]
    pub nip: Option<String>,

    #[sea_orm(column_type = "String(Some(20))", nullable, unique)]
    pub phone: Option<String>,

    /// Path under the storage directory
    #[sea_orm(column_type = "String(Some(255))", nullable)]
    pub photo: Option<String>,

    pub role_id: Option<i32>,

    pub active: bool,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::role::Entity",
        from = "Column::RoleId",
        to = "super::role::Column::Id",
        on_delete = "SetNull"
    )]
    Role,
}

impl Related<super::role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Role.def()
    }
}

timestamped!();

static LOADER: EntityLoader<Entity> = EntityLoader::new();

pub static QUERY: Resource = Resource {
    model: "User",
    table: "users",
    fields: &[
        Field::int("id"),
        Field::text("name"),
        Field::text("email"),
        Field::text("nip"),
        Field::text("phone"),
        Field::int("role_id"),
        Field::boolean("active"),
        Field::timestamp("created_at"),
        Field::timestamp("updated_at"),
    ],
    relations: &[
        query::Relation::belongs_to("role", "role_id", super::role::query),
        query::Relation::has_many("classes", "teacher_id", super::classroom::query),
        query::Relation::has_many("schedules", "teacher_id", super::schedule::query),
    ],
    searchable: &["name", "email", "role.label"],
    default_with: &[],
    default_sort: "-created_at",
    loader: &LOADER,
    appends: Some(super::append_flags),
};

pub fn query() -> &'static Resource {
    &QUERY
}
