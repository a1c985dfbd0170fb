//! Entity module - SeaORM entity definitions
//!
//! Each entity also exposes a static `QUERY` describing how list endpoints may
//! filter, search, sort and eager-load it.

/// Stamp `created_at` on insert and `updated_at` on every save
macro_rules! timestamped {
    () => {
        #[async_trait::async_trait]
        impl ActiveModelBehavior for ActiveModel {
            async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
            where
                C: ConnectionTrait,
            {
                let now = chrono::Utc::now();
                if insert {
                    self.created_at = sea_orm::ActiveValue::Set(now);
                }
                self.updated_at = sea_orm::ActiveValue::Set(now);
                Ok(self)
            }
        }
    };
}
pub(crate) use timestamped;

pub mod academic_year;
pub mod attendance_history;
pub mod classroom;
pub mod configuration_setting;
pub mod journal;
pub mod journal_subject;
pub mod model_log;
pub mod permission;
pub mod permission_role;
pub mod personal_access_token;
pub mod request_log;
pub mod role;
pub mod schedule;
pub mod student;
pub mod student_attendance;
pub mod student_attendance_detail;
pub mod student_attendance_subject;
pub mod student_class_history;
pub mod subject;
pub mod teacher_attendance;
pub mod user;

use serde_json::Value as Json;

use crate::query::Row;

/// `editable` / `deleteable` flags shown by the admin tables
pub fn append_flags(row: &mut Row) {
    row.entry("editable").or_insert(Json::Bool(true));
    row.entry("deleteable").or_insert(Json::Bool(true));
}

/// Serialize times as `HH:MM`
pub mod hm {
    use chrono::NaiveTime;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn serialize_opt<S: Serializer>(time: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => serialize(t, serializer),
            None => serializer.serialize_none(),
        }
    }
}
