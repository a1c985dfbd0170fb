//! ModelLog entity - 数据变更日志

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::timestamped;
use crate::query::{self, EntityLoader, Field, Resource};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "model_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// e.g. `Student`
    #[sea_orm(column_type = "String(Some(100))")]
    pub model_type: String,

    pub model_id: Option<i32>,

    /// created, updated or deleted
    #[sea_orm(column_type = "String(Some(20))")]
    pub event: String,

    /// `{before, after}`
    pub changes: Option<Json>,

    pub user_id: Option<i32>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

timestamped!();

static LOADER: EntityLoader<Entity> = EntityLoader::new();

pub static QUERY: Resource = Resource {
    model: "ModelLog",
    table: "model_logs",
    fields: &[
        Field::int("id"),
        Field::text("model_type"),
        Field::int("model_id"),
        Field::text("event"),
        Field::int("user_id"),
        Field::timestamp("created_at"),
    ],
    relations: &[query::Relation::belongs_to("user", "user_id", super::user::query)],
    searchable: &["model_type", "event", "user.name"],
    default_with: &[],
    default_sort: "-created_at",
    loader: &LOADER,
    appends: None,
};
