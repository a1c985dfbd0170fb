//! Key-value settings read by the front end (school name, logo ...)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Defaults inserted by seeding when missing
pub const DEFAULTS: [(&str, &str); 2] = [("school_name", "AdaJago"), ("school_logo", "logo-jago.png")];

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "configuration_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "String(Some(255))")]
    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub value: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
