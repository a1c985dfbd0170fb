//! Request validation
//!
//! Field-level error collection rendered as `{message, errors: {field: [..]}}`
//! with status 422, plus the database-backed `exists` / `unique` rules.

use chrono::{NaiveDate, NaiveTime};
use sea_orm::sea_query::{Alias, Expr, Query};
use sea_orm::{ConnectionTrait, DatabaseConnection, Value};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

use crate::error::{AppError, AppResult};

/// Collected validation messages, in the order they were raised
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    entries: Vec<(String, Vec<String>)>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let field = field.into();
        let message = message.into();
        match self.entries.iter_mut().find(|(f, _)| *f == field) {
            Some((_, messages)) => messages.push(message),
            None => self.entries.push((field, vec![message])),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.entries.iter().any(|(f, _)| f == field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, m)| m.as_slice())
    }

    fn count(&self) -> usize {
        self.entries.iter().map(|(_, m)| m.len()).sum()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first = self
            .entries
            .first()
            .and_then(|(_, m)| m.first())
            .map(String::as_str)
            .unwrap_or("Data tidak valid");
        let rest = self.count().saturating_sub(1);
        if rest > 0 {
            write!(f, "{} (dan {} kesalahan lainnya)", first, rest)
        } else {
            f.write_str(first)
        }
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, messages) in &self.entries {
            map.serialize_entry(field, messages)?;
        }
        map.end()
    }
}

/// Parse `YYYY-MM-DD`
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Parse `HH:MM`
pub fn parse_time_hm(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    if value.len() != 5 {
        return None;
    }
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

/// Rule-by-rule checker that keeps going after the first failure
#[derive(Debug, Default)]
pub struct Validator {
    errors: ValidationErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    /// Record `message` unless `ok` holds
    pub fn check(&mut self, field: &str, ok: bool, message: impl Into<String>) {
        if !ok {
            self.error(field, message);
        }
    }

    pub fn required<T: Clone>(&mut self, field: &str, value: &Option<T>, message: &str) -> Option<T> {
        if value.is_none() {
            self.error(field, message);
        }
        value.clone()
    }

    /// Like `required` but blank strings count as missing
    pub fn required_str(&mut self, field: &str, value: &Option<String>, message: &str) -> Option<String> {
        match value.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => Some(v.to_string()),
            _ => {
                self.error(field, message);
                None
            }
        }
    }

    pub fn max_len(&mut self, field: &str, value: Option<&str>, max: usize, message: &str) {
        if let Some(v) = value {
            self.check(field, v.chars().count() <= max, message);
        }
    }

    pub fn min_len(&mut self, field: &str, value: Option<&str>, min: usize, message: &str) {
        if let Some(v) = value {
            self.check(field, v.chars().count() >= min, message);
        }
    }

    pub fn email(&mut self, field: &str, value: Option<&str>, message: &str) {
        if let Some(v) = value {
            let valid = match v.split_once('@') {
                Some((local, domain)) => {
                    !local.is_empty()
                        && domain.contains('.')
                        && !domain.starts_with('.')
                        && !domain.ends_with('.')
                        && !v.contains(char::is_whitespace)
                }
                None => false,
            };
            self.check(field, valid, message);
        }
    }

    pub fn one_of(&mut self, field: &str, value: Option<&str>, allowed: &[&str], message: &str) {
        if let Some(v) = value {
            self.check(field, allowed.contains(&v), message);
        }
    }

    /// Parse an optional date, recording `message` when it is malformed
    pub fn date(&mut self, field: &str, value: Option<&str>, message: &str) -> Option<NaiveDate> {
        let v = value?;
        let parsed = parse_date(v);
        if parsed.is_none() {
            self.error(field, message);
        }
        parsed
    }

    /// Parse an optional `HH:MM` time, recording `message` when it is malformed
    pub fn time_hm(&mut self, field: &str, value: Option<&str>, message: &str) -> Option<NaiveTime> {
        let v = value?;
        let parsed = parse_time_hm(v);
        if parsed.is_none() {
            self.error(field, message);
        }
        parsed
    }

    /// `value` strictly after `other`; skipped when either is missing
    pub fn after<T: PartialOrd>(&mut self, field: &str, value: Option<T>, other: Option<T>, message: &str) {
        if let (Some(v), Some(o)) = (value, other) {
            self.check(field, v > o, message);
        }
    }

    pub fn after_or_equal<T: PartialOrd>(&mut self, field: &str, value: Option<T>, other: Option<T>, message: &str) {
        if let (Some(v), Some(o)) = (value, other) {
            self.check(field, v >= o, message);
        }
    }

    pub fn array_min<T: Clone>(&mut self, field: &str, value: &Option<Vec<T>>, min: usize, message: &str) -> Vec<T> {
        match value {
            Some(items) if items.len() >= min => items.clone(),
            _ => {
                self.error(field, message);
                Vec::new()
            }
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn into_error(self) -> AppError {
        AppError::Validation(self.errors)
    }

    pub fn finish(self) -> AppResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}

/// `exists:table,id`
pub async fn exists(db: &DatabaseConnection, table: &str, id: i64) -> AppResult<bool> {
    exists_where(db, table, "id", Value::from(id), None).await
}

/// `unique:table,column` with an optional row id to ignore (for updates)
pub async fn is_unique(
    db: &DatabaseConnection,
    table: &str,
    column: &str,
    value: impl Into<Value>,
    ignore_id: Option<i64>,
) -> AppResult<bool> {
    Ok(!exists_where(db, table, column, value.into(), ignore_id).await?)
}

async fn exists_where(
    db: &DatabaseConnection,
    table: &str,
    column: &str,
    value: Value,
    ignore_id: Option<i64>,
) -> AppResult<bool> {
    let mut stmt = Query::select();
    stmt.expr(Expr::col(Alias::new("id")))
        .from(Alias::new(table))
        .and_where(Expr::col(Alias::new(column)).eq(value))
        .limit(1);
    if let Some(id) = ignore_id {
        stmt.and_where(Expr::col(Alias::new("id")).ne(id));
    }
    let backend = db.get_database_backend();
    Ok(db.query_one(backend.build(&stmt)).await?.is_some())
}

/// Lenient deserializers for form-style payloads (`"1"`, `1`, `true` ...)
pub mod de {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn opt_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::Bool(b)) => Some(b),
            Some(Value::Number(n)) => n.as_i64().map(|n| n != 0),
            Some(Value::String(s)) => match s.as_str() {
                "1" | "true" | "on" => Some(true),
                "0" | "false" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        })
    }

    pub fn opt_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        })
    }

    /// Scalars are accepted and stringified, so `"nis": 12345` still reads as text
    pub fn opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_counts_remaining_errors() {
        let mut v = Validator::new();
        v.error("name", "Nama tahun ajaran wajib diisi");
        v.error("semester", "Semester harus 1 atau 2");
        v.error("semester", "Semester wajib diisi");
        let AppError::Validation(errors) = v.into_error() else {
            panic!("expected validation error");
        };
        assert_eq!(
            errors.to_string(),
            "Nama tahun ajaran wajib diisi (dan 2 kesalahan lainnya)"
        );
        assert_eq!(errors.get("semester").map(|m| m.len()), Some(2));

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["name"][0], "Nama tahun ajaran wajib diisi");
    }

    #[test]
    fn test_rules() {
        let mut v = Validator::new();
        assert_eq!(v.required_str("name", &Some("  ".into()), "wajib"), None);
        v.email("email", Some("guru@sekolah.id"), "email");
        v.email("email2", Some("not-an-email"), "email");
        v.one_of("day", Some("Minggu"), &["Senin", "Selasa"], "hari");
        assert!(v.time_hm("time_in", Some("7:5"), "jam").is_none());
        assert!(v.time_hm("time_out", Some("14:00"), "jam").is_some());
        assert!(v.date("date", Some("2024-02-30"), "tanggal").is_none());
        let ids: Vec<i64> = v.array_min("subject_ids", &Some(vec![]), 1, "minimal");
        assert!(ids.is_empty());

        let AppError::Validation(errors) = v.into_error() else {
            panic!("expected validation error");
        };
        for field in ["name", "email2", "day", "time_in", "date", "subject_ids"] {
            assert!(errors.has(field), "missing error for {}", field);
        }
        assert!(!errors.has("email"));
        assert!(!errors.has("time_out"));
    }

    #[test]
    fn test_lenient_deserializers() {
        #[derive(serde::Deserialize)]
        struct Form {
            #[serde(default, deserialize_with = "de::opt_bool")]
            active: Option<bool>,
            #[serde(default, deserialize_with = "de::opt_i64")]
            class_id: Option<i64>,
            #[serde(default, deserialize_with = "de::opt_string")]
            nis: Option<String>,
        }

        let form: Form =
            serde_json::from_str(r#"{"active": "1", "class_id": "7", "nis": 1001}"#).unwrap();
        assert_eq!(form.active, Some(true));
        assert_eq!(form.class_id, Some(7));
        assert_eq!(form.nis.as_deref(), Some("1001"));

        let empty: Form = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.active, None);
    }
}
