//! Bearer tokens issued at login
//!
//! Only the sha256 of the secret part is stored; clients send `<id>|<secret>`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::timestamped;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "personal_access_tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    #[sea_orm(column_type = "String(Some(255))")]
    pub name: String,

    #[sea_orm(column_type = "String(Some(64))", unique)]
    #[serde(skip_serializing)]
    pub token: String,

    pub last_used_at: Option<DateTimeUtc>,
    pub expires_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

timestamped!();
