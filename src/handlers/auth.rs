//! Authentication handlers
//!
//! Login issues a bearer token; logout revokes the token of the request.

use axum::{response::Json, Extension, extract::State};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::entity::{personal_access_token, user};
use crate::error::{AppError, AppResult, OptionExt};
use crate::extract::AppJson;
use crate::handlers::audit::service::log_updated;
use crate::middleware::auth::{issue_token, load_current_user};
use crate::middleware::{CurrentUser, DbConn};
use crate::routes::ApiResponse;
use crate::state::AppState;
use crate::validation::{self, de, Validator};

const INVALID_CREDENTIALS: &str = "Mail atau password salah.";

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Profile update request
#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub nip: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub password: Option<String>,
}

/// User with role and permission names, as returned by login and `/me`
async fn user_payload(db: &DbConn, current: &CurrentUser) -> AppResult<Value> {
    let model = user::Entity::find_by_id(current.id)
        .one(&**db)
        .await?
        .ok_or_not_found("Pengguna tidak ditemukan")?;
    let mut row = super::record(db, &user::QUERY, &model, &["role"]).await?;
    if let Value::Object(map) = &mut row {
        map.insert("permissions".to_string(), json!(current.permissions));
    }
    Ok(row)
}

/// POST /api/v1/login
pub async fn login(
    State(state): State<AppState>,
    Extension(db): Extension<DbConn>,
    AppJson(req): AppJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    let mut v = Validator::new();
    let email = v.required_str("email", &req.email, "Email wajib diisi");
    let password = v.required_str("password", &req.password, "Password wajib diisi");
    v.email("email", email.as_deref(), "Format email tidak valid");
    v.finish()?;
    let (email, password) = (email.unwrap_or_default(), password.unwrap_or_default());

    let found = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .filter(user::Column::Active.eq(true))
        .one(&*db)
        .await?;

    let Some(found) = found else {
        tracing::info!("Login failed for {}: no active user", email);
        return Err(AppError::invalid("email", INVALID_CREDENTIALS));
    };

    let valid = bcrypt::verify(&password, &found.password).unwrap_or(false);
    if !valid {
        tracing::info!("Login failed for {}: wrong password", email);
        return Err(AppError::invalid("email", INVALID_CREDENTIALS));
    }

    let token = issue_token(&db, found.id, state.config.token_ttl_hours).await?;
    let current = load_current_user(&db, found).await?;
    let user = user_payload(&db, &current).await?;

    tracing::info!("User {} logged in", current.email);
    Ok(Json(ApiResponse::with_message(
        "Login berhasil",
        json!({ "token": token, "user": user }),
    )))
}

/// POST /api/v1/logout
pub async fn logout(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<()>>> {
    if let Some(token_id) = current_user.token_id {
        personal_access_token::Entity::delete_by_id(token_id)
            .exec(&*db)
            .await?;
    }
    tracing::info!("User {} logged out", current_user.email);
    Ok(Json(ApiResponse::message("Logout berhasil")))
}

/// GET /api/v1/me
pub async fn me(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Value>>> {
    let user = user_payload(&db, &current_user).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// PUT /api/v1/profile
pub async fn update_profile(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    AppJson(req): AppJson<ProfileRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    let id = current_user.id as i64;
    let mut v = Validator::new();
    let name = v.required_str("name", &req.name, "Nama wajib diisi");
    v.max_len("name", name.as_deref(), 255, "Nama maksimal 255 karakter");
    let email = v.required_str("email", &req.email, "Email wajib diisi");
    v.email("email", email.as_deref(), "Format email tidak valid");
    if let Some(email) = &email {
        let free = validation::is_unique(&db, "users", "email", email.clone(), Some(id)).await?;
        v.check("email", free, "Email sudah digunakan");
    }
    let nip = req.nip.filter(|s| !s.trim().is_empty());
    if let Some(nip) = &nip {
        let free = validation::is_unique(&db, "users", "nip", nip.clone(), Some(id)).await?;
        v.check("nip", free, "NIP sudah digunakan");
    }
    let phone = req.phone.filter(|s| !s.trim().is_empty());
    if let Some(phone) = &phone {
        let free = validation::is_unique(&db, "users", "phone", phone.clone(), Some(id)).await?;
        v.check("phone", free, "Nomor telepon sudah digunakan");
    }
    let password = req.password.filter(|s| !s.is_empty());
    v.min_len("password", password.as_deref(), 6, "Password minimal 6 karakter");
    v.finish()?;

    let txn = db.begin().await?;
    let before = user::Entity::find_by_id(current_user.id)
        .one(&txn)
        .await?
        .ok_or_not_found("Pengguna tidak ditemukan")?;
    let mut active: user::ActiveModel = before.clone().into();
    active.name = Set(name.unwrap_or_default());
    active.email = Set(email.unwrap_or_default());
    active.nip = Set(nip);
    active.phone = Set(phone);
    if let Some(password) = password {
        let hashed = bcrypt::hash(&password, bcrypt::DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        active.password = Set(hashed);
    }
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    log_updated(user::QUERY.model, updated.id, &before, &updated, current_user.id);
    let user = user_payload(&db, &current_user).await?;
    Ok(Json(ApiResponse::with_message("Profil berhasil diupdate", user)))
}
