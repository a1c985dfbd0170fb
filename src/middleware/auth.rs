//! Authentication middleware
//!
//! Provides bearer-token authentication for API routes. Tokens have the form
//! `<id>|<secret>`; only the sha256 of the secret is stored.

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set};
use sha2::{Digest, Sha256};
use std::ops::Deref;

use crate::entity::{personal_access_token, role, user};
use crate::error::{AppError, AppResult};
use crate::permission::role_permissions;
use crate::state::AppState;

/// Database connection wrapper for use in handlers via Extension
#[derive(Clone)]
pub struct DbConn(pub DatabaseConnection);

impl Deref for DbConn {
    type Target = DatabaseConnection;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Id of the authenticated user, copied into response extensions for the request log
#[derive(Clone, Copy, Debug)]
pub struct AuthenticatedUser(pub i32);

/// Extension to store current user in request
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role_id: Option<i32>,
    pub role_name: Option<String>,
    /// Permission names granted through the role
    pub permissions: Vec<String>,
    /// Token used for this request
    pub token_id: Option<i32>,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role_name.as_deref() == Some(role::ADMIN)
    }

    /// Check if the user has a specific permission
    pub fn has_permission(&self, perm: &str) -> bool {
        self.is_admin() || self.permissions.iter().any(|p| p == perm)
    }

    /// `Forbidden` unless the user has `perm`
    pub fn require(&self, perm: &str) -> AppResult<()> {
        if self.has_permission(perm) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

/// Load role and permissions of `user`
pub async fn load_current_user(db: &DatabaseConnection, user: user::Model) -> Result<CurrentUser, DbErr> {
    let (role_name, permissions) = match user.role_id {
        Some(role_id) => {
            let role = role::Entity::find_by_id(role_id).one(db).await?;
            (role.map(|r| r.name), role_permissions(db, role_id).await?)
        }
        None => (None, Vec::new()),
    };
    Ok(CurrentUser {
        id: user.id,
        name: user.name,
        email: user.email,
        role_id: user.role_id,
        role_name,
        permissions,
        token_id: None,
    })
}

pub fn hash_token(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// Split `<id>|<secret>`
fn parse_token(raw: &str) -> Option<(i32, &str)> {
    let (id, secret) = raw.split_once('|')?;
    let id = id.parse().ok()?;
    (!secret.is_empty()).then_some((id, secret))
}

/// Create a token for `user_id`, returning the plain-text form given to the client
pub async fn issue_token(db: &DatabaseConnection, user_id: i32, ttl_hours: i64) -> Result<String, DbErr> {
    let secret = format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    );
    let expires_at = (ttl_hours > 0).then(|| Utc::now() + Duration::hours(ttl_hours));
    let token = personal_access_token::ActiveModel {
        user_id: Set(user_id),
        name: Set("auth_token".to_string()),
        token: Set(hash_token(&secret)),
        expires_at: Set(expires_at),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(format!("{}|{}", token.id, secret))
}

/// Resolve a bearer token to its active user
pub async fn authenticate(db: &DatabaseConnection, raw: &str) -> AppResult<CurrentUser> {
    let (id, secret) = parse_token(raw).ok_or(AppError::Unauthorized)?;
    let token = personal_access_token::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if token.token != hash_token(secret) {
        return Err(AppError::Unauthorized);
    }
    if token.expires_at.is_some_and(|at| at < Utc::now()) {
        return Err(AppError::Unauthorized);
    }

    let user = user::Entity::find_by_id(token.user_id)
        .one(db)
        .await?
        .filter(|u| u.active)
        .ok_or(AppError::Unauthorized)?;

    let mut active: personal_access_token::ActiveModel = token.into();
    active.last_used_at = Set(Some(Utc::now()));
    let token = active.update(db).await?;

    let mut current = load_current_user(db, user).await?;
    current.token_id = Some(token.id);
    Ok(current)
}

/// Paths that don't require authentication
fn is_public_path(method: &Method, path: &str) -> bool {
    // Uploaded files and anything outside the API
    if !path.starts_with("/api") {
        return true;
    }
    if path == "/api/health" {
        return true;
    }
    if method == Method::POST && path == "/api/v1/login" {
        return true;
    }
    // Settings are readable before login (school name, logo)
    method == Method::GET && (path == "/api/v1/configurations" || path.starts_with("/api/v1/configurations/"))
}

/// Authentication middleware
pub async fn auth_layer(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    // This allows all handlers to access db via Extension<DbConn>
    request.extensions_mut().insert(DbConn(state.db.clone()));

    if is_public_path(request.method(), &path) {
        return next.run(request).await;
    }

    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return AppError::Unauthorized.into_response();
    };

    match authenticate(&state.db, bearer.token()).await {
        Ok(current_user) => {
            let user_id = current_user.id;
            request.extensions_mut().insert(current_user);
            let mut response = next.run(request).await;
            response.extensions_mut().insert(AuthenticatedUser(user_id));
            response
        }
        Err(AppError::Unauthorized) => {
            tracing::debug!("Rejected bearer token for {}", path);
            AppError::Unauthorized.into_response()
        }
        Err(e) => {
            tracing::error!("Database error during auth: {}", e);
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token() {
        assert_eq!(parse_token("12|abc"), Some((12, "abc")));
        assert_eq!(parse_token("12|"), None);
        assert_eq!(parse_token("abc"), None);
        assert_eq!(parse_token("x|abc"), None);
    }

    #[test]
    fn test_hash_token_is_hex_sha256() {
        let hash = hash_token("secret");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token("secret"));
        assert_ne!(hash, hash_token("Secret"));
    }

    #[test]
    fn test_public_paths() {
        assert!(is_public_path(&Method::POST, "/api/v1/login"));
        assert!(is_public_path(&Method::GET, "/api/v1/configurations/school_name"));
        assert!(!is_public_path(&Method::PATCH, "/api/v1/configurations/school_name"));
        assert!(!is_public_path(&Method::GET, "/api/v1/users"));
        assert!(is_public_path(&Method::GET, "/storage/users/a.png"));
        assert!(is_public_path(&Method::GET, "/api/health"));
    }

    #[test]
    fn test_permissions() {
        let teacher = CurrentUser {
            id: 2,
            name: "Guru".into(),
            email: "guru@sekolah.test".into(),
            role_id: Some(2),
            role_name: Some(role::TEACHER.into()),
            permissions: vec!["teacher_journals.view".into()],
            token_id: None,
        };
        assert!(teacher.has_permission("teacher_journals.view"));
        assert!(teacher.require("master_data.users.view").is_err());
        assert!(teacher.require_admin().is_err());

        let admin = CurrentUser {
            role_name: Some(role::ADMIN.into()),
            permissions: vec![],
            ..teacher
        };
        assert!(admin.require("master_data.users.delete").is_ok());
    }
}
