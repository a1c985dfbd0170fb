//! RequestLog entity - 请求日志

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::timestamped;
use crate::query::{self, EntityLoader, Field, Resource};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "request_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "String(Some(10))")]
    pub method: String,

    #[sea_orm(column_type = "Text")]
    pub url: String,

    #[sea_orm(column_type = "String(Some(64))", nullable)]
    pub ip: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub user_agent: Option<String>,

    pub payload: Option<Json>,

    pub user_id: Option<i32>,

    pub response_code: i32,

    #[sea_orm(column_type = "Text", nullable)]
    pub response_body: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

timestamped!();

static LOADER: EntityLoader<Entity> = EntityLoader::new();

pub static QUERY: Resource = Resource {
    model: "RequestLog",
    table: "request_logs",
    fields: &[
        Field::int("id"),
        Field::text("method"),
        Field::text("url"),
        Field::text("ip"),
        Field::int("user_id"),
        Field::int("response_code"),
        Field::timestamp("created_at"),
    ],
    relations: &[query::Relation::belongs_to("user", "user_id", super::user::query)],
    searchable: &["method", "url", "ip", "user.name"],
    default_with: &[],
    default_sort: "-created_at",
    loader: &LOADER,
    appends: None,
};
