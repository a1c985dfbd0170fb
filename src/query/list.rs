use axum::{
    async_trait,
    extract::{FromRequestParts, OriginalUri, Query},
    http::request::Parts,
};
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, Select};
use serde::Serialize;
use serde_json::Value as Json;

use super::apply::apply;
use super::load::{load_relations, to_map};
use super::params::ListParams;
use super::Resource;
use crate::error::{AppError, AppResult};

/// List parameters together with the request location, for page links
#[derive(Clone, Debug)]
pub struct ListQuery {
    pub params: ListParams,
    path: String,
    query: Option<String>,
}

impl ListQuery {
    pub fn new(params: ListParams) -> Self {
        Self { params, path: String::new(), query: None }
    }

    /// Same request with `page` replaced
    pub fn page_url(&self, page: u64) -> String {
        let mut parts: Vec<&str> = self
            .query
            .as_deref()
            .unwrap_or("")
            .split('&')
            .filter(|p| !p.is_empty() && !p.starts_with("page="))
            .collect();
        let page = format!("page={}", page);
        parts.push(&page);
        format!("{}?{}", self.path, parts.join("&"))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ListQuery
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::from_request_parts(parts, state).await?;
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|u| u.0.clone())
            .unwrap_or_else(|| parts.uri.clone());
        Ok(Self {
            params: ListParams::from_pairs(&pairs),
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Meta {
    All {
        total: u64,
        all: bool,
    },
    Page {
        total: u64,
        current_page: u64,
        last_page: u64,
        per_page: u64,
        next_page_url: Option<String>,
        prev_page_url: Option<String>,
    },
}

/// `{data, meta}` body of list endpoints
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub data: Vec<Json>,
    pub meta: Meta,
}

/// Paginator object with page links, used by reports
#[derive(Debug, Serialize)]
pub struct Paginated {
    pub current_page: u64,
    pub data: Vec<Json>,
    pub from: Option<u64>,
    pub last_page: u64,
    pub per_page: u64,
    pub to: Option<u64>,
    pub total: u64,
    pub next_page_url: Option<String>,
    pub prev_page_url: Option<String>,
}

fn last_page(total: u64, per_page: u64) -> u64 {
    total.div_ceil(per_page.max(1)).max(1)
}

impl Paginated {
    pub fn new(data: Vec<Json>, total: u64, page: u64, per_page: u64, query: &ListQuery) -> Self {
        let last_page = last_page(total, per_page);
        let offset = (page - 1) * per_page;
        let (from, to) = if data.is_empty() {
            (None, None)
        } else {
            (Some(offset + 1), Some(offset + data.len() as u64))
        };
        Self {
            current_page: page,
            from,
            to,
            last_page,
            per_page,
            total,
            next_page_url: (page < last_page).then(|| query.page_url(page + 1)),
            prev_page_url: (page > 1).then(|| query.page_url(page - 1)),
            data,
        }
    }
}

/// Serialize models, apply computed attributes and eager-load `with`
pub async fn fetch_rows<M: Serialize>(
    db: &DatabaseConnection,
    resource: &Resource,
    models: &[M],
    with: &[String],
) -> AppResult<Vec<Json>> {
    let mut rows = models.iter().map(to_map).collect::<Result<Vec<_>, _>>()?;
    for row in rows.iter_mut() {
        resource.decorate(row);
    }
    load_relations(db, resource, &mut rows, with).await?;
    Ok(rows.into_iter().map(Json::Object).collect())
}

/// Run a list query: filters, search, sort, then either everything or one page
pub async fn list<E>(
    db: &DatabaseConnection,
    select: Select<E>,
    resource: &Resource,
    query: &ListQuery,
) -> AppResult<ListResponse>
where
    E: EntityTrait,
    E::Model: Serialize + Send + Sync,
{
    let params = &query.params;
    let select = apply(select, resource, params)?;
    let with = resource.with_defaults(&params.with);

    if params.all {
        let models = select.all(db).await?;
        let data = fetch_rows(db, resource, &models, &with).await?;
        return Ok(ListResponse {
            meta: Meta::All { total: data.len() as u64, all: true },
            data,
        });
    }

    let paginator = select.paginate(db, params.per_page);
    let total = paginator.num_items().await?;
    let models = paginator.fetch_page(params.page - 1).await?;
    let data = fetch_rows(db, resource, &models, &with).await?;
    let last_page = last_page(total, params.per_page);

    Ok(ListResponse {
        data,
        meta: Meta::Page {
            total,
            current_page: params.page,
            last_page,
            per_page: params.per_page,
            next_page_url: (params.page < last_page).then(|| query.page_url(params.page + 1)),
            prev_page_url: (params.page > 1).then(|| query.page_url(params.page - 1)),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(path: &str, raw: &str) -> ListQuery {
        let pairs: Vec<(String, String)> = raw
            .split('&')
            .filter_map(|p| p.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ListQuery {
            params: ListParams::from_pairs(&pairs),
            path: path.to_string(),
            query: Some(raw.to_string()),
        }
    }

    #[test]
    fn test_page_url_replaces_page() {
        let q = query("/api/v1/students", "search=budi&page=2&per_page=5");
        assert_eq!(q.page_url(3), "/api/v1/students?search=budi&per_page=5&page=3");
        assert_eq!(q.params.search.as_deref(), Some("budi"));
    }

    #[test]
    fn test_paginated_bounds() {
        let q = query("/api/v1/reports/teacher-attendance", "per_page=15");
        let data = vec![Json::Null; 15];
        let page = Paginated::new(data, 40, 2, 15, &q);
        assert_eq!(page.last_page, 3);
        assert_eq!(page.from, Some(16));
        assert_eq!(page.to, Some(30));
        assert!(page.next_page_url.is_some());
        assert!(page.prev_page_url.is_some());

        let empty = Paginated::new(vec![], 0, 1, 15, &q);
        assert_eq!(empty.last_page, 1);
        assert_eq!(empty.from, None);
        assert!(empty.next_page_url.is_none());
    }
}
