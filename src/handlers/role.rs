//! Role handlers
//!
//! Roles carry a set of permission names, stored in `permission_roles`.

use axum::{extract::Path, response::Json, Extension};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::Value;

use super::record;
use crate::entity::{permission, permission_role, role};
use crate::error::{AppError, AppResult, OptionExt};
use crate::extract::AppJson;
use crate::handlers::audit::service::{log_created, log_deleted, log_updated};
use crate::middleware::{CurrentUser, DbConn};
use crate::permission::{options, sync_role};
use crate::query::{self, snake_case, ListQuery, ListResponse};
use crate::routes::ApiResponse;
use crate::validation::{self, de, Validator};

const NOT_FOUND: &str = "Role tidak ditemukan";

/// Create/update role request
#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub name: Option<String>,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
    #[serde(default, deserialize_with = "de::opt_bool")]
    pub active: Option<bool>,
}

/// `Wali Kelas` -> `wali_kelas`
fn role_name(label: &str) -> String {
    snake_case(label.trim())
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .to_ascii_lowercase()
}

struct RoleInput {
    name: String,
    label: String,
    permission_ids: Vec<i32>,
    active: Option<bool>,
}

async fn validate(db: &DbConn, req: RoleRequest, ignore_id: Option<i32>) -> AppResult<RoleInput> {
    let mut v = Validator::new();
    let label = v.required_str("name", &req.name, "Nama role wajib diisi");
    v.max_len("name", label.as_deref(), 255, "Nama role maksimal 255 karakter");

    let name = label.as_deref().map(role_name).unwrap_or_default();
    if label.is_some() {
        v.check("name", !name.is_empty(), "Nama role tidak valid");
        let free = validation::is_unique(db, "roles", "name", name.clone(), ignore_id.map(i64::from)).await?;
        v.check("name", free, "Nama role sudah digunakan");
    }

    let requested = req.permissions.unwrap_or_default();
    let found = if requested.is_empty() {
        Vec::new()
    } else {
        permission::Entity::find()
            .filter(permission::Column::Name.is_in(requested.clone()))
            .all(&**db)
            .await?
    };
    for name in &requested {
        if !found.iter().any(|p| &p.name == name) {
            v.error("permissions", format!("Permission {} tidak ditemukan", name));
        }
    }
    v.finish()?;

    Ok(RoleInput {
        name,
        label: label.unwrap_or_default(),
        permission_ids: found.into_iter().map(|p| p.id).collect(),
        active: req.active,
    })
}

/// GET /api/v1/roles
pub async fn list_roles(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    query: ListQuery,
) -> AppResult<Json<ListResponse>> {
    current_user.require_admin()?;
    let result = query::list(&db, role::Entity::find(), &role::QUERY, &query).await?;
    Ok(Json(result))
}

/// POST /api/v1/roles
pub async fn create_role(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppJson(req): AppJson<RoleRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require_admin()?;
    let input = validate(&db, req, None).await?;

    let txn = db.begin().await?;
    let created = role::ActiveModel {
        name: Set(input.name),
        label: Set(input.label),
        active: Set(input.active.unwrap_or(true)),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    sync_role(&txn, created.id, &input.permission_ids).await?;
    txn.commit().await?;

    tracing::info!("Role {} created by {}", created.name, current_user.email);
    log_created(role::QUERY.model, created.id, &created, current_user.id);
    let data = record(&db, &role::QUERY, &created, &["permissions"]).await?;
    Ok(Json(ApiResponse::with_message("Role berhasil dibuat", data)))
}

/// GET /api/v1/roles/:id
pub async fn get_role(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require_admin()?;
    let found = role::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;
    let data = record(&db, &role::QUERY, &found, &["permissions"]).await?;
    Ok(Json(ApiResponse::success(data)))
}

/// PUT /api/v1/roles/:id
pub async fn update_role(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
    AppJson(req): AppJson<RoleRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require_admin()?;
    let before = role::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;
    let input = validate(&db, req, Some(id)).await?;
    if before.name == role::ADMIN && input.name != role::ADMIN {
        return Err(AppError::invalid("name", "Role admin tidak dapat diubah namanya"));
    }

    let txn = db.begin().await?;
    let mut active: role::ActiveModel = before.clone().into();
    active.name = Set(input.name);
    active.label = Set(input.label);
    if let Some(flag) = input.active {
        active.active = Set(flag);
    }
    let updated = active.update(&txn).await?;
    sync_role(&txn, id, &input.permission_ids).await?;
    txn.commit().await?;

    log_updated(role::QUERY.model, id, &before, &updated, current_user.id);
    let data = record(&db, &role::QUERY, &updated, &["permissions"]).await?;
    Ok(Json(ApiResponse::with_message("Role berhasil diupdate", data)))
}

/// DELETE /api/v1/roles/:id
pub async fn delete_role(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require_admin()?;
    let found = role::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;
    if found.name == role::ADMIN {
        return Err(AppError::invalid("role", "Role admin tidak dapat dihapus"));
    }

    let txn = db.begin().await?;
    permission_role::Entity::delete_many()
        .filter(permission_role::Column::RoleId.eq(id))
        .exec(&txn)
        .await?;
    role::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!("Role {} deleted by {}", found.name, current_user.email);
    log_deleted(role::QUERY.model, id, &found, current_user.id);
    Ok(Json(ApiResponse::message("Role berhasil dihapus")))
}

/// GET /api/v1/permissions/options
pub async fn permission_options(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Vec<Value>>>> {
    current_user.require_admin()?;
    Ok(Json(ApiResponse::success(options(&*db).await?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_name() {
        assert_eq!(role_name("Wali Kelas"), "wali_kelas");
        assert_eq!(role_name("  Guru BK "), "guru_b_k");
        assert_eq!(role_name("admin"), "admin");
        assert_eq!(role_name("Kepala-Sekolah"), "kepala_sekolah");
    }
}
