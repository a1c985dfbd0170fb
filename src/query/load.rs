use async_trait::async_trait;
use sea_orm::sea_query::{Alias, Expr, Query};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use serde::Serialize;
use serde_json::{Map, Value as Json};
use std::marker::PhantomData;

use super::{Relation, RelationKind, Resource};

/// A serialized row
pub type Row = Map<String, Json>;

/// Serialize a model into a JSON object
pub fn to_map<T: Serialize>(model: &T) -> Result<Row, DbErr> {
    match serde_json::to_value(model) {
        Ok(Json::Object(map)) => Ok(map),
        Ok(_) => Err(DbErr::Custom("model did not serialize to an object".to_string())),
        Err(e) => Err(DbErr::Custom(e.to_string())),
    }
}

/// Fetches rows of one table by a key column, used for eager loading
#[async_trait]
pub trait RowLoader: Send + Sync {
    async fn load(&self, db: &DatabaseConnection, column: &str, keys: Vec<i64>) -> Result<Vec<Row>, DbErr>;
}

pub struct EntityLoader<E>(PhantomData<fn() -> E>);

impl<E> EntityLoader<E> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

#[async_trait]
impl<E> RowLoader for EntityLoader<E>
where
    E: EntityTrait,
    E::Model: Serialize + Send + Sync,
{
    async fn load(&self, db: &DatabaseConnection, column: &str, keys: Vec<i64>) -> Result<Vec<Row>, DbErr> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let models = E::find()
            .filter(Expr::col(Alias::new(column)).is_in(keys))
            .all(db)
            .await?;
        models.iter().map(to_map).collect()
    }
}

fn key_of(row: &Row, column: &str) -> Option<i64> {
    row.get(column).and_then(Json::as_i64)
}

/// `(main id, related id)` pairs of a pivot table
type Pairs = Vec<(i64, i64)>;

async fn pivot_pairs(
    db: &DatabaseConnection,
    pivot: &str,
    foreign_pivot_key: &str,
    related_pivot_key: &str,
    keys: Vec<i64>,
) -> Result<Pairs, DbErr> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }
    let mut stmt = Query::select();
    stmt.columns([Alias::new(foreign_pivot_key), Alias::new(related_pivot_key)])
        .from(Alias::new(pivot))
        .and_where(Expr::col(Alias::new(foreign_pivot_key)).is_in(keys));
    let backend = db.get_database_backend();
    db.query_all(backend.build(&stmt))
        .await?
        .iter()
        .map(|r| {
            let main: i32 = r.try_get("", foreign_pivot_key)?;
            let related: i32 = r.try_get("", related_pivot_key)?;
            Ok((main as i64, related as i64))
        })
        .collect()
}

/// Rows of `relation` referenced by `rows`, with computed attributes applied
async fn fetch_related(
    db: &DatabaseConnection,
    relation: &Relation,
    rows: &[Row],
) -> Result<(Vec<Row>, Option<Pairs>), DbErr> {
    let target = (relation.target)();
    let (main_key, related_key) = relation.kind.keys();

    let mut keys: Vec<i64> = rows.iter().filter_map(|r| key_of(r, main_key)).collect();
    keys.sort_unstable();
    keys.dedup();

    let (mut related, pairs) = match relation.kind {
        RelationKind::BelongsToMany { pivot, foreign_pivot_key, related_pivot_key } => {
            let pairs = pivot_pairs(db, pivot, foreign_pivot_key, related_pivot_key, keys).await?;
            let mut ids: Vec<i64> = pairs.iter().map(|(_, id)| *id).collect();
            ids.sort_unstable();
            ids.dedup();
            (target.loader.load(db, related_key, ids).await?, Some(pairs))
        }
        _ => (target.loader.load(db, related_key, keys).await?, None),
    };
    for row in related.iter_mut() {
        target.decorate(row);
    }
    Ok((related, pairs))
}

/// Attach `related` to each row under the relation name
fn join(relation: &Relation, rows: &mut [Row], related: &[Row], pairs: Option<&Pairs>) {
    let (main_key, related_key) = relation.kind.keys();
    for row in rows.iter_mut() {
        let key = key_of(row, main_key);
        let linked = |r: &&Row| match (key, key_of(r, related_key)) {
            (Some(k), Some(rk)) => match pairs {
                Some(pairs) => pairs.contains(&(k, rk)),
                None => k == rk,
            },
            _ => false,
        };
        let mut matches = related.iter().filter(linked).cloned().map(Json::Object);
        let value = if relation.kind.is_many() {
            Json::Array(matches.collect())
        } else {
            matches.next().unwrap_or(Json::Null)
        };
        row.insert(relation.name.to_string(), value);
    }
}

async fn attach(
    db: &DatabaseConnection,
    relation: &Relation,
    rows: &mut [Row],
    nested: &[&str],
) -> Result<(), DbErr> {
    let target = (relation.target)();
    let (mut related, pairs) = fetch_related(db, relation, rows).await?;

    for name in nested {
        match target.relation(name) {
            Some(inner) => {
                let (inner_rows, inner_pairs) = fetch_related(db, inner, &related).await?;
                join(inner, &mut related, &inner_rows, inner_pairs.as_ref());
            }
            None => tracing::debug!("Ignoring unknown relation {}.{}", relation.name, name),
        }
    }

    join(relation, rows, &related, pairs.as_ref());
    Ok(())
}

/// Eager-load `with` (e.g. `["teacher", "details.student"]`) into `rows`
pub async fn load_relations(
    db: &DatabaseConnection,
    resource: &Resource,
    rows: &mut [Row],
    with: &[String],
) -> Result<(), DbErr> {
    if rows.is_empty() {
        return Ok(());
    }

    // group nested paths under their top-level relation
    let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
    for path in with {
        let (head, tail) = match path.split_once('.') {
            Some((head, tail)) => (head, Some(tail)),
            None => (path.as_str(), None),
        };
        let idx = match groups.iter().position(|(h, _)| *h == head) {
            Some(i) => i,
            None => {
                groups.push((head, Vec::new()));
                groups.len() - 1
            }
        };
        // only one nested level is supported
        if let Some(tail) = tail.map(|t| t.split('.').next().unwrap_or(t)) {
            if !groups[idx].1.contains(&tail) {
                groups[idx].1.push(tail);
            }
        }
    }

    for (name, nested) in groups {
        match resource.relation(name) {
            Some(relation) => attach(db, relation, rows, &nested).await?,
            None => tracing::debug!("Ignoring unknown relation {}.{}", resource.table, name),
        }
    }
    Ok(())
}
