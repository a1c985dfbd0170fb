//! Generic list query helper
//!
//! Every listable entity declares a static [`Resource`] describing its table,
//! typed columns, relations and searchable fields. Request parameters
//! (`filter[..]`, `search`, `sort`, `with`, `page`/`per_page`, `all`) are then
//! translated into sea-orm queries against that description.

mod apply;
mod list;
mod load;
mod params;

pub use apply::apply;
pub use list::{fetch_rows, list, ListQuery, ListResponse, Meta, Paginated};
pub use load::{load_relations, to_map, EntityLoader, Row, RowLoader};
pub use params::{Filter, FilterOp, ListParams};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sea_orm::Value;

/// Column type, used to parse filter values
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Text,
    Boolean,
    Date,
    Time,
    Timestamp,
}

impl FieldKind {
    /// Parse a raw query-string value into a bindable value
    pub fn parse(self, raw: &str) -> Result<Value, String> {
        let raw = raw.trim();
        match self {
            FieldKind::Integer => raw
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("'{}' bukan angka yang valid", raw)),
            FieldKind::Text => Ok(Value::from(raw.to_string())),
            FieldKind::Boolean => match raw {
                "1" | "true" => Ok(Value::from(true)),
                "0" | "false" => Ok(Value::from(false)),
                _ => Err(format!("'{}' bukan boolean yang valid", raw)),
            },
            FieldKind::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(Value::from)
                .map_err(|_| format!("'{}' bukan tanggal yang valid", raw)),
            FieldKind::Time => NaiveTime::parse_from_str(raw, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
                .map(Value::from)
                .map_err(|_| format!("'{}' bukan waktu yang valid", raw)),
            FieldKind::Timestamp => parse_timestamp(raw)
                .map(Value::from)
                .ok_or_else(|| format!("'{}' bukan waktu yang valid", raw)),
        }
    }

    fn is_temporal(self) -> bool {
        matches!(self, FieldKind::Date | FieldKind::Timestamp)
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` or a bare date (midnight UTC)
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[derive(Clone, Copy, Debug)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl Field {
    pub const fn int(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Integer }
    }

    pub const fn text(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Text }
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Boolean }
    }

    pub const fn date(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Date }
    }

    pub const fn time(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Time }
    }

    pub const fn timestamp(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Timestamp }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum RelationKind {
    /// `main.foreign_key` references `related.owner_key`
    BelongsTo {
        foreign_key: &'static str,
        owner_key: &'static str,
    },
    /// `related.foreign_key` references `main.local_key`, at most one row
    HasOne {
        foreign_key: &'static str,
        local_key: &'static str,
    },
    /// `related.foreign_key` references `main.local_key`
    HasMany {
        foreign_key: &'static str,
        local_key: &'static str,
    },
    /// Linked through `pivot(foreign_pivot_key -> main.id, related_pivot_key -> related.id)`
    BelongsToMany {
        pivot: &'static str,
        foreign_pivot_key: &'static str,
        related_pivot_key: &'static str,
    },
}

impl RelationKind {
    /// (column on the main table, column on the related table)
    pub fn keys(&self) -> (&'static str, &'static str) {
        match *self {
            RelationKind::BelongsTo { foreign_key, owner_key } => (foreign_key, owner_key),
            RelationKind::HasOne { foreign_key, local_key }
            | RelationKind::HasMany { foreign_key, local_key } => (local_key, foreign_key),
            RelationKind::BelongsToMany { .. } => ("id", "id"),
        }
    }

    pub fn is_many(&self) -> bool {
        matches!(self, RelationKind::HasMany { .. } | RelationKind::BelongsToMany { .. })
    }
}

pub struct Relation {
    pub name: &'static str,
    pub kind: RelationKind,
    pub target: fn() -> &'static Resource,
}

impl Relation {
    pub const fn belongs_to(
        name: &'static str,
        foreign_key: &'static str,
        target: fn() -> &'static Resource,
    ) -> Self {
        Self {
            name,
            kind: RelationKind::BelongsTo { foreign_key, owner_key: "id" },
            target,
        }
    }

    pub const fn has_many(
        name: &'static str,
        foreign_key: &'static str,
        target: fn() -> &'static Resource,
    ) -> Self {
        Self {
            name,
            kind: RelationKind::HasMany { foreign_key, local_key: "id" },
            target,
        }
    }

    pub const fn belongs_to_many(
        name: &'static str,
        pivot: &'static str,
        foreign_pivot_key: &'static str,
        related_pivot_key: &'static str,
        target: fn() -> &'static Resource,
    ) -> Self {
        Self {
            name,
            kind: RelationKind::BelongsToMany { pivot, foreign_pivot_key, related_pivot_key },
            target,
        }
    }

    pub const fn has_one(
        name: &'static str,
        foreign_key: &'static str,
        target: fn() -> &'static Resource,
    ) -> Self {
        Self {
            name,
            kind: RelationKind::HasOne { foreign_key, local_key: "id" },
            target,
        }
    }
}

/// Declarative query configuration of one model
pub struct Resource {
    /// Model name recorded in audit logs
    pub model: &'static str,
    pub table: &'static str,
    pub fields: &'static [Field],
    pub relations: &'static [Relation],
    /// Plain column names or `relation.column`
    pub searchable: &'static [&'static str],
    /// Relations always eager-loaded by list endpoints
    pub default_with: &'static [&'static str],
    /// `column` or `-column`
    pub default_sort: &'static str,
    pub loader: &'static dyn RowLoader,
    /// Computed attributes added to every serialized row
    pub appends: Option<fn(&mut Row)>,
}

/// Where a filter/sort path points
pub(crate) enum Target<'a> {
    Own(&'a Field),
    Related(&'a Relation, &'static Resource, &'static Field),
}

impl Resource {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        let name = snake_case(name);
        self.relations.iter().find(|r| r.name == name)
    }

    pub(crate) fn resolve(&self, path: &str) -> Option<Target<'_>> {
        match path.split_once('.') {
            None => self.field(path).map(Target::Own),
            Some((rel, column)) => {
                let relation = self.relation(rel)?;
                let target = (relation.target)();
                let field = target.fields.iter().find(|f| f.name == column)?;
                Some(Target::Related(relation, target, field))
            }
        }
    }

    /// `default_with` followed by the requested relations, without duplicates
    pub fn with_defaults(&self, requested: &[String]) -> Vec<String> {
        let mut with: Vec<String> = self.default_with.iter().map(|s| s.to_string()).collect();
        for name in requested {
            if !with.contains(name) {
                with.push(name.clone());
            }
        }
        with
    }

    pub fn decorate(&self, row: &mut Row) {
        if let Some(appends) = self.appends {
            appends(row);
        }
    }
}

/// `academicYear` -> `academic_year`
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("academicYear"), "academic_year");
        assert_eq!(snake_case("classroom"), "classroom");
        assert_eq!(snake_case("details"), "details");
    }

    #[test]
    fn test_parse_values() {
        assert_eq!(FieldKind::Integer.parse("42"), Ok(Value::from(42i64)));
        assert!(FieldKind::Integer.parse("4x").is_err());
        assert_eq!(FieldKind::Boolean.parse("1"), Ok(Value::from(true)));
        assert!(FieldKind::Date.parse("2024-13-01").is_err());
        assert!(FieldKind::Time.parse("07:30").is_ok());
        assert!(FieldKind::Timestamp.parse("2024-01-05").is_ok());
        assert!(FieldKind::Timestamp.parse("2024-01-05T10:00:00Z").is_ok());
    }

    #[test]
    fn test_relation_keys() {
        let belongs = RelationKind::BelongsTo { foreign_key: "class_id", owner_key: "id" };
        assert_eq!(belongs.keys(), ("class_id", "id"));
        let many = RelationKind::HasMany { foreign_key: "journal_id", local_key: "id" };
        assert_eq!(many.keys(), ("id", "journal_id"));
        assert!(many.is_many());
        let pivot = RelationKind::BelongsToMany {
            pivot: "permission_roles",
            foreign_pivot_key: "role_id",
            related_pivot_key: "permission_id",
        };
        assert_eq!(pivot.keys(), ("id", "id"));
        assert!(pivot.is_many());
    }
}
