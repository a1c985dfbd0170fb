//! Subjects taught in a journal entry

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::timestamped;
use crate::query::{self, EntityLoader, Field, Resource};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "journal_subjects")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub journal_id: i32,
    pub subject_id: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::journal::Entity",
        from = "Column::JournalId",
        to = "super::journal::Column::Id",
        on_delete = "Cascade"
    )]
    Journal,
    #[sea_orm(
        belongs_to = "super::subject::Entity",
        from = "Column::SubjectId",
        to = "super::subject::Column::Id",
        on_delete = "Restrict"
    )]
    Subject,
}

impl Related<super::journal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Journal.def()
    }
}

timestamped!();

static LOADER: EntityLoader<Entity> = EntityLoader::new();

pub static QUERY: Resource = Resource {
    model: "JournalSubject",
    table: "journal_subjects",
    fields: &[Field::int("id"), Field::int("journal_id"), Field::int("subject_id")],
    relations: &[query::Relation::belongs_to("subject", "subject_id", super::subject::query)],
    searchable: &["subject.name"],
    default_with: &["subject"],
    default_sort: "id",
    loader: &LOADER,
    appends: None,
};

pub fn query() -> &'static Resource {
    &QUERY
}
