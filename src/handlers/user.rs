//! User management handlers
//!
//! Teachers and administrators, with bcrypt passwords and an optional photo.

use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use sea_orm::{ActiveModelTrait, EntityTrait, Set, TransactionTrait};
use serde::Deserialize;
use serde_json::Value;

use super::{check_image, discard_on_error, record, remove_upload, save_upload};
use crate::entity::user;
use crate::error::{AppError, AppResult, OptionExt};
use crate::extract::FormOrJson;
use crate::handlers::audit::service::{log_created, log_deleted, log_updated};
use crate::middleware::{CurrentUser, DbConn};
use crate::permission::perm;
use crate::query::{self, ListQuery, ListResponse};
use crate::routes::ApiResponse;
use crate::state::AppState;
use crate::validation::{self, de, Validator};

const NOT_FOUND: &str = "Pengguna tidak ditemukan";
const MAX_PHOTO_SIZE: usize = 2 * 1024 * 1024;

/// Create/update user request
#[derive(Debug, Deserialize)]
pub struct UserRequest {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub nip: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub role_id: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub photo: Option<String>,
    #[serde(default, deserialize_with = "de::opt_bool")]
    pub active: Option<bool>,
}

/// Validated user fields
struct UserInput {
    name: String,
    email: String,
    nip: Option<String>,
    phone: Option<String>,
    password: Option<String>,
    role_id: Option<i32>,
    photo: Option<String>,
    active: Option<bool>,
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

async fn validate(db: &DbConn, req: UserRequest, ignore_id: Option<i32>) -> AppResult<UserInput> {
    let ignore = ignore_id.map(i64::from);
    let mut v = Validator::new();

    let name = v.required_str("name", &req.name, "Nama wajib diisi");
    v.max_len("name", name.as_deref(), 255, "Nama maksimal 255 karakter");

    let email = v.required_str("email", &req.email, "Email wajib diisi");
    v.email("email", email.as_deref(), "Format email tidak valid");
    if let Some(email) = &email {
        let free = validation::is_unique(db, "users", "email", email.clone(), ignore).await?;
        v.check("email", free, "Email sudah digunakan");
    }

    let nip = blank_to_none(req.nip);
    if let Some(nip) = &nip {
        let free = validation::is_unique(db, "users", "nip", nip.clone(), ignore).await?;
        v.check("nip", free, "NIP sudah digunakan");
    }
    let phone = blank_to_none(req.phone);
    if let Some(phone) = &phone {
        let free = validation::is_unique(db, "users", "phone", phone.clone(), ignore).await?;
        v.check("phone", free, "Nomor telepon sudah digunakan");
    }

    let password = req.password.filter(|s| !s.is_empty());
    if ignore_id.is_none() && password.is_none() {
        v.error("password", "Password wajib diisi");
    }
    v.min_len("password", password.as_deref(), 6, "Password minimal 6 karakter");

    if let Some(role_id) = req.role_id {
        let found = validation::exists(db, "roles", role_id).await?;
        v.check("role_id", found, "Role tidak ditemukan");
    }
    v.finish()?;

    Ok(UserInput {
        name: name.unwrap_or_default(),
        email: email.unwrap_or_default(),
        nip,
        phone,
        password,
        role_id: req.role_id.map(|id| id as i32),
        photo: blank_to_none(req.photo),
        active: req.active,
    })
}

fn hash_password(password: &str) -> AppResult<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// GET /api/v1/users
pub async fn list_users(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    query: ListQuery,
) -> AppResult<Json<ListResponse>> {
    current_user.require(perm::USERS_VIEW)?;
    let result = query::list(&db, user::Entity::find(), &user::QUERY, &query).await?;
    Ok(Json(result))
}

/// POST /api/v1/users
pub async fn create_user(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    FormOrJson { data, .. }: FormOrJson<UserRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::USERS_CREATE)?;
    let input = validate(&db, data, None).await?;
    let password = hash_password(input.password.as_deref().unwrap_or_default())?;

    let txn = db.begin().await?;
    let created = user::ActiveModel {
        name: Set(input.name),
        email: Set(input.email),
        password: Set(password),
        nip: Set(input.nip),
        phone: Set(input.phone),
        photo: Set(input.photo),
        role_id: Set(input.role_id),
        active: Set(input.active.unwrap_or(true)),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    tracing::info!("User {} created by {}", created.email, current_user.email);
    log_created(user::QUERY.model, created.id, &created, current_user.id);
    let data = record(&db, &user::QUERY, &created, &["role"]).await?;
    Ok(Json(ApiResponse::with_message("Pengguna berhasil dibuat", data)))
}

/// GET /api/v1/users/:id
pub async fn get_user(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::USERS_VIEW)?;
    let found = user::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;
    let data = record(&db, &user::QUERY, &found, &["role"]).await?;
    Ok(Json(ApiResponse::success(data)))
}

/// PUT /api/v1/users/:id
pub async fn update_user(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
    FormOrJson { data, .. }: FormOrJson<UserRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require(perm::USERS_UPDATE)?;
    let before = user::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;
    let input = validate(&db, data, Some(id)).await?;

    let txn = db.begin().await?;
    let mut active: user::ActiveModel = before.clone().into();
    active.name = Set(input.name);
    active.email = Set(input.email);
    active.nip = Set(input.nip);
    active.phone = Set(input.phone);
    active.role_id = Set(input.role_id);
    if let Some(flag) = input.active {
        active.active = Set(flag);
    }
    if input.photo.is_some() {
        active.photo = Set(input.photo);
    }
    if let Some(password) = input.password {
        active.password = Set(hash_password(&password)?);
    }
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    log_updated(user::QUERY.model, id, &before, &updated, current_user.id);
    let data = record(&db, &user::QUERY, &updated, &["role"]).await?;
    Ok(Json(ApiResponse::with_message("Pengguna berhasil diupdate", data)))
}

/// DELETE /api/v1/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require(perm::USERS_DELETE)?;
    if id == current_user.id {
        return Err(AppError::BadRequest("Tidak dapat menghapus akun sendiri".to_string()));
    }
    let found = user::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;

    let txn = db.begin().await?;
    user::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    if let Some(photo) = &found.photo {
        remove_upload(&state, photo).await;
    }
    tracing::info!("User {} deleted by {}", found.email, current_user.email);
    log_deleted(user::QUERY.model, id, &found, current_user.id);
    Ok(Json(ApiResponse::message("Pengguna berhasil dihapus")))
}

/// POST /api/v1/users/:id/photo
pub async fn upload_photo(
    State(state): State<AppState>,
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i32>,
    mut form: FormOrJson<Value>,
) -> AppResult<Json<ApiResponse<Value>>> {
    if id != current_user.id {
        current_user.require(perm::USERS_UPDATE)?;
    }
    let before = user::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(NOT_FOUND)?;
    let upload = form
        .file("photo")
        .ok_or_else(|| AppError::invalid("photo", "Foto wajib diunggah"))?;
    check_image("photo", &upload, MAX_PHOTO_SIZE, "Ukuran foto maksimal 2MB")?;

    let path = save_upload(&state, "users", &upload).await?;
    let mut active: user::ActiveModel = before.clone().into();
    active.photo = Set(Some(path.clone()));
    let result = active.update(&*db).await.map_err(AppError::from);
    let updated = discard_on_error(&state, Some(&path), result).await?;

    if let Some(old) = &before.photo {
        remove_upload(&state, old).await;
    }
    log_updated(user::QUERY.model, id, &before, &updated, current_user.id);
    let data = record(&db, &user::QUERY, &updated, &[]).await?;
    Ok(Json(ApiResponse::with_message("Foto berhasil diunggah", data)))
}
