use chrono::Duration;
use sea_orm::sea_query::{Alias, Expr, Func, JoinType, Query, SimpleExpr};
use sea_orm::{Condition, EntityTrait, Order, QueryFilter, QueryTrait, Select, Value};

use super::params::{Filter, FilterOp, ListParams};
use super::{parse_timestamp, Field, FieldKind, Relation, RelationKind, Resource, Target};
use crate::error::{AppError, AppResult};
use crate::validation::ValidationErrors;

fn column(table: &str, name: &str) -> Expr {
    Expr::col((Alias::new(table), Alias::new(name)))
}

/// Case-insensitive LIKE, casting non-text columns to text first
fn like(table: &str, field: &Field, pattern: &str) -> SimpleExpr {
    let col: SimpleExpr = match field.kind {
        FieldKind::Text => column(table, field.name).into(),
        _ => Func::cast_as(column(table, field.name), Alias::new("TEXT")).into(),
    };
    Expr::expr(Func::lower(col)).like(pattern.to_lowercase())
}

/// Build the condition for one filter on a column of `table`
fn condition(table: &str, field: &Field, filter: &Filter) -> Result<Condition, String> {
    let col = || column(table, field.name);

    match filter {
        Filter::Compare { op, value } => {
            if let Some(pattern) = op.pattern(value) {
                return Ok(Condition::all().add(like(table, field, &pattern)));
            }
            // A bare date on a timestamp column matches the whole day
            if *op == FilterOp::Eq && field.kind == FieldKind::Timestamp && value.trim().len() == 10 {
                let start = parse_timestamp(value.trim())
                    .ok_or_else(|| format!("'{}' bukan tanggal yang valid", value))?;
                let end = start + Duration::days(1);
                return Ok(Condition::all().add(col().gte(start)).add(col().lt(end)));
            }
            let v = field.kind.parse(value)?;
            let expr = match op {
                FilterOp::Eq => col().eq(v),
                FilterOp::Ne => col().ne(v),
                FilterOp::Gt => col().gt(v),
                FilterOp::Lt => col().lt(v),
                FilterOp::Gte => col().gte(v),
                FilterOp::Lte => col().lte(v),
                // pattern operators handled above
                _ => col().eq(v),
            };
            Ok(Condition::all().add(expr))
        }
        Filter::In(values) => {
            let parsed = values
                .iter()
                .map(|v| field.kind.parse(v))
                .collect::<Result<Vec<Value>, String>>()?;
            Ok(Condition::all().add(col().is_in(parsed)))
        }
        Filter::Range { from, to } => {
            if !field.kind.is_temporal() {
                return Err(format!("{} bukan kolom tanggal", field.name));
            }
            let mut cond = Condition::all();
            if let Some(from) = from.as_deref().filter(|s| !s.is_empty()) {
                cond = cond.add(col().gte(field.kind.parse(from)?));
            }
            if let Some(to) = to.as_deref().filter(|s| !s.is_empty()) {
                cond = match field.kind {
                    // inclusive end of day
                    FieldKind::Timestamp => {
                        let end = parse_timestamp(to)
                            .ok_or_else(|| format!("'{}' bukan tanggal yang valid", to))?
                            + Duration::days(1);
                        cond.add(col().lt(end))
                    }
                    _ => cond.add(col().lte(field.kind.parse(to)?)),
                };
            }
            Ok(cond)
        }
    }
}

/// `main.key IN (SELECT related_key FROM related WHERE cond)`
fn where_has(resource: &Resource, relation: &Relation, target: &Resource, cond: Condition) -> SimpleExpr {
    let (main_key, related_key) = relation.kind.keys();
    let mut sub = Query::select();
    sub.column((Alias::new(target.table), Alias::new(related_key)))
        .from(Alias::new(target.table))
        .cond_where(cond);

    if let RelationKind::BelongsToMany { pivot, foreign_pivot_key, related_pivot_key } = relation.kind {
        let mut through = Query::select();
        through
            .column((Alias::new(pivot), Alias::new(foreign_pivot_key)))
            .from(Alias::new(pivot))
            .and_where(column(pivot, related_pivot_key).in_subquery(sub));
        return column(resource.table, main_key).in_subquery(through);
    }
    column(resource.table, main_key).in_subquery(sub)
}

/// Apply filters, search and sort of `params` to `select`
pub fn apply<E: EntityTrait>(
    mut select: Select<E>,
    resource: &Resource,
    params: &ListParams,
) -> AppResult<Select<E>> {
    let mut errors = ValidationErrors::new();

    for (path, filter) in &params.filters {
        match resource.resolve(path) {
            Some(Target::Own(field)) => match condition(resource.table, field, filter) {
                Ok(cond) => select = select.filter(cond),
                Err(msg) => errors.add(format!("filter.{}", path), msg),
            },
            Some(Target::Related(relation, target, field)) => {
                match condition(target.table, field, filter) {
                    Ok(cond) => select = select.filter(where_has(resource, relation, target, cond)),
                    Err(msg) => errors.add(format!("filter.{}", path), msg),
                }
            }
            None => tracing::debug!("Ignoring filter on unknown field {}.{}", resource.table, path),
        }
    }

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    if let Some(search) = &params.search {
        select = select.filter(search_condition(resource, search));
    }

    apply_sort(select, resource, params.sort.as_deref())
}

fn search_condition(resource: &Resource, search: &str) -> Condition {
    let pattern = format!("%{}%", search);
    let mut any = Condition::any();
    for path in resource.searchable {
        match resource.resolve(path) {
            Some(Target::Own(field)) => any = any.add(like(resource.table, field, &pattern)),
            Some(Target::Related(relation, target, field)) => {
                let cond = Condition::all().add(like(target.table, field, &pattern));
                any = any.add(where_has(resource, relation, target, cond));
            }
            None => tracing::warn!("Searchable field {}.{} is not declared", resource.table, path),
        }
    }
    any
}

fn apply_sort<E: EntityTrait>(
    mut select: Select<E>,
    resource: &Resource,
    sort: Option<&str>,
) -> AppResult<Select<E>> {
    let requested = sort.and_then(|s| {
        let path = s.trim_start_matches('-');
        match resource.resolve(path) {
            // joining a to-many relation would repeat rows
            Some(Target::Related(relation, ..)) if relation.kind.is_many() => {
                tracing::debug!("Ignoring sort on to-many relation {}.{}", resource.table, path);
                None
            }
            Some(_) => Some(s),
            None => {
                tracing::debug!("Ignoring sort on unknown field {}.{}", resource.table, path);
                None
            }
        }
    });
    let sort = requested.unwrap_or(resource.default_sort);
    if sort.is_empty() {
        return Ok(select);
    }

    let (path, order) = match sort.strip_prefix('-') {
        Some(path) => (path, Order::Desc),
        None => (sort, Order::Asc),
    };

    match resource.resolve(path) {
        Some(Target::Own(field)) => {
            QueryTrait::query(&mut select).order_by_expr(column(resource.table, field.name).into(), order.clone());
        }
        Some(Target::Related(relation, target, field)) => {
            let alias = format!("sort_{}", relation.name);
            let (main_key, related_key) = relation.kind.keys();
            QueryTrait::query(&mut select).join_as(
                JoinType::LeftJoin,
                Alias::new(target.table),
                Alias::new(alias.as_str()),
                Expr::col((Alias::new(alias.as_str()), Alias::new(related_key)))
                    .equals((Alias::new(resource.table), Alias::new(main_key))),
            );
            QueryTrait::query(&mut select).order_by_expr(column(&alias, field.name).into(), order.clone());
        }
        None => return Ok(select),
    }

    // stable pages when the sort column has ties
    if path != "id" && resource.field("id").is_some() {
        QueryTrait::query(&mut select).order_by_expr(column(resource.table, "id").into(), order);
    }
    Ok(select)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{journal, role, student};
    use sea_orm::{DbBackend, EntityTrait};

    fn sql<E: EntityTrait>(select: Select<E>) -> String {
        select.build(DbBackend::Postgres).to_string()
    }

    fn params(items: &[(&str, &str)]) -> ListParams {
        let pairs: Vec<(String, String)> =
            items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ListParams::from_pairs(&pairs)
    }

    #[test]
    fn test_own_filters() {
        let p = params(&[("filter[class_id]", "3"), ("filter[name][like]", "Bud")]);
        let s = sql(apply(student::Entity::find(), &student::QUERY, &p).unwrap());
        assert!(s.contains(r#""students"."class_id" = 3"#), "{}", s);
        assert!(s.contains(r#"LOWER("students"."name") LIKE '%bud%'"#), "{}", s);
    }

    #[test]
    fn test_relation_filter_uses_subquery() {
        let p = params(&[("filter[classroom.name]", "X IPA 1")]);
        let s = sql(apply(student::Entity::find(), &student::QUERY, &p).unwrap());
        assert!(s.contains(r#""students"."class_id" IN (SELECT "classes"."id" FROM "classes""#), "{}", s);
    }

    #[test]
    fn test_invalid_value_is_validation_error() {
        let p = params(&[("filter[class_id]", "abc")]);
        let err = apply(student::Entity::find(), &student::QUERY, &p).unwrap_err();
        match err {
            AppError::Validation(errors) => assert!(errors.has("filter.class_id")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_relation_sort_joins() {
        let p = params(&[("sort", "-classroom.name")]);
        let s = sql(apply(student::Entity::find(), &student::QUERY, &p).unwrap());
        assert!(s.contains(r#"LEFT JOIN "classes" AS "sort_classroom""#), "{}", s);
        assert!(s.contains(r#"ORDER BY "sort_classroom"."name" DESC"#), "{}", s);
    }

    #[test]
    fn test_default_sort_and_unknown_sort() {
        let p = params(&[("sort", "password")]);
        let s = sql(apply(student::Entity::find(), &student::QUERY, &p).unwrap());
        assert!(s.contains(r#"ORDER BY "students"."created_at" DESC"#), "{}", s);
    }

    #[test]
    fn test_search_spans_relations() {
        let p = params(&[("search", "matematika")]);
        let s = sql(apply(journal::Entity::find(), &journal::QUERY, &p).unwrap());
        assert!(s.contains(r#"LOWER("journals"."theme") LIKE '%matematika%'"#), "{}", s);
        assert!(s.contains(" OR "), "{}", s);
        assert!(s.contains(r#"SELECT "users"."id" FROM "users""#), "{}", s);
    }

    #[test]
    fn test_pivot_filter() {
        let p = params(&[("filter[permissions.name]", "dashboard")]);
        let s = sql(apply(role::Entity::find(), &role::QUERY, &p).unwrap());
        assert!(
            s.contains(r#""roles"."id" IN (SELECT "permission_roles"."role_id" FROM "permission_roles""#),
            "{}",
            s
        );
        assert!(s.contains(r#"SELECT "permissions"."id" FROM "permissions""#), "{}", s);
    }

    #[test]
    fn test_date_range() {
        let p = params(&[("filter[date][from]", "2024-01-01"), ("filter[date][to]", "2024-01-31")]);
        let s = sql(apply(journal::Entity::find(), &journal::QUERY, &p).unwrap());
        assert!(s.contains(r#""journals"."date" >= '2024-01-01'"#), "{}", s);
        assert!(s.contains(r#""journals"."date" <= '2024-01-31'"#), "{}", s);
    }
}
