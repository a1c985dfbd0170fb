//! Configuration setting handlers
//!
//! Key-value settings such as the school name; readable without login.

use axum::{extract::Path, response::Json, Extension};
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set, TransactionTrait};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::entity::configuration_setting;
use crate::error::{AppResult, OptionExt};
use crate::extract::AppJson;
use crate::handlers::audit::service::{log_created, log_updated};
use crate::middleware::{CurrentUser, DbConn};
use crate::routes::ApiResponse;
use crate::validation::{de, Validator};

#[derive(Debug, Deserialize)]
pub struct UpdateConfigurationRequest {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub value: Option<String>,
}

/// GET /api/v1/configurations
pub async fn list_configurations(Extension(db): Extension<DbConn>) -> AppResult<Json<ApiResponse<Value>>> {
    let settings = configuration_setting::Entity::find()
        .order_by_asc(configuration_setting::Column::Name)
        .all(&*db)
        .await?;
    let map: Map<String, Value> = settings
        .into_iter()
        .map(|s| (s.name, s.value.map(Value::String).unwrap_or(Value::Null)))
        .collect();
    Ok(Json(ApiResponse::success(Value::Object(map))))
}

/// GET /api/v1/configurations/:name
pub async fn get_configuration(
    Extension(db): Extension<DbConn>,
    Path(name): Path<String>,
) -> AppResult<Json<ApiResponse<Value>>> {
    let setting = configuration_setting::Entity::find_by_id(name)
        .one(&*db)
        .await?
        .ok_or_not_found("Konfigurasi tidak ditemukan")?;
    Ok(Json(ApiResponse::success(json!({ "name": setting.name, "value": setting.value }))))
}

/// PATCH /api/v1/configurations/:name
pub async fn update_configuration(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(name): Path<String>,
    AppJson(req): AppJson<UpdateConfigurationRequest>,
) -> AppResult<Json<ApiResponse<Value>>> {
    current_user.require_admin()?;
    let mut v = Validator::new();
    v.max_len("value", req.value.as_deref(), 65535, "Nilai konfigurasi terlalu panjang");
    v.finish()?;

    let txn = db.begin().await?;
    let existing = configuration_setting::Entity::find_by_id(name.clone())
        .one(&txn)
        .await?;
    let saved = match existing {
        Some(before) => {
            let mut active: configuration_setting::ActiveModel = before.clone().into();
            active.value = Set(req.value);
            let updated = active.update(&txn).await?;
            log_updated("ConfigurationSetting", None::<i32>, &before, &updated, current_user.id);
            updated
        }
        None => {
            let created = configuration_setting::ActiveModel {
                name: Set(name),
                value: Set(req.value),
            }
            .insert(&txn)
            .await?;
            log_created("ConfigurationSetting", None::<i32>, &created, current_user.id);
            created
        }
    };
    txn.commit().await?;

    tracing::info!("Configuration {} updated by {}", saved.name, current_user.email);
    Ok(Json(ApiResponse::with_message(
        "Konfigurasi berhasil disimpan",
        json!({ "name": saved.name, "value": saved.value }),
    )))
}
