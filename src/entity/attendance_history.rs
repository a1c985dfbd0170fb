//! Audit trail of teacher attendance changes

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::timestamped;
use crate::query::{self, EntityLoader, Field, Resource};

pub const CREATED: &str = "created";
pub const CHECKED_IN: &str = "checked_in";
pub const CHECKED_OUT: &str = "checked_out";
pub const STATUS_UPDATED: &str = "status_updated";
pub const PHOTO_UPLOADED: &str = "photo_uploaded";
pub const DELETED: &str = "deleted";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendance_histories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Cleared when the attendance is deleted, so the `deleted` entry survives
    pub teacher_attendance_id: Option<i32>,

    pub changed_by: Option<i32>,

    #[sea_orm(column_type = "String(Some(20))")]
    pub action: String,

    pub old_values: Option<Json>,
    pub new_values: Option<Json>,

    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::teacher_attendance::Entity",
        from = "Column::TeacherAttendanceId",
        to = "super::teacher_attendance::Column::Id",
        on_delete = "SetNull"
    )]
    TeacherAttendance,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ChangedBy",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    ChangedBy,
}

timestamped!();

static LOADER: EntityLoader<Entity> = EntityLoader::new();

pub static QUERY: Resource = Resource {
    model: "AttendanceHistory",
    table: "attendance_histories",
    fields: &[
        Field::int("id"),
        Field::int("teacher_attendance_id"),
        Field::int("changed_by"),
        Field::text("action"),
        Field::text("notes"),
        Field::timestamp("created_at"),
        Field::timestamp("updated_at"),
    ],
    relations: &[
        query::Relation::belongs_to("teacher_attendance", "teacher_attendance_id", super::teacher_attendance::query),
        query::Relation::belongs_to("changed_by_user", "changed_by", super::user::query),
    ],
    searchable: &["action", "changed_by_user.name", "teacher_attendance.date"],
    default_with: &["changed_by_user"],
    default_sort: "-created_at",
    loader: &LOADER,
    appends: None,
};

pub fn query() -> &'static Resource {
    &QUERY
}
