//! Admin user management and notifications

use crate::{
    api::{AdminUser, AppState, ClientMeta, Json, Path, Query},
    core::{
        Page,
        notification::{self, AdminNotificationQuery, AdminNotificationRow, NewNotification},
        user::{self, AdminUserRow, UserPatch, UserQuery},
    },
    entities::{NotificationModel, UserModel},
    errors::Result,
};
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPassword {
    pub new_password: String,
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<UserQuery>,
) -> Result<Json<Page<AdminUserRow>>> {
    Ok(Json(user::list_users(&state.db, &query).await?))
}

/// PATCH /api/admin/users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ClientMeta(meta): ClientMeta,
    Path(id): Path<String>,
    Json(patch): Json<UserPatch>,
) -> Result<Json<UserModel>> {
    Ok(Json(user::admin_update_user(&state.db, &admin.id, &id, patch, &meta).await?))
}

/// POST /api/admin/users/{id}/password
pub async fn reset_password(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ClientMeta(meta): ClientMeta,
    Path(id): Path<String>,
    Json(body): Json<NewPassword>,
) -> Result<Json<Value>> {
    user::reset_password(&state.db, &admin.id, &id, &body.new_password, &meta).await?;
    Ok(Json(json!({ "success": true })))
}

/// DELETE /api/admin/users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ClientMeta(meta): ClientMeta,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    user::delete_user(&state.db, &admin.id, &id, &meta).await?;
    Ok(Json(json!({ "success": true })))
}

/// GET /api/admin/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<AdminNotificationQuery>,
) -> Result<Json<Page<AdminNotificationRow>>> {
    Ok(Json(notification::list_all(&state.db, &query).await?))
}

/// POST /api/admin/notifications
pub async fn create_notification(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ClientMeta(meta): ClientMeta,
    Json(new): Json<NewNotification>,
) -> Result<Json<NotificationModel>> {
    Ok(Json(notification::create_notification(&state.db, &admin.id, new, &meta).await?))
}

/// DELETE /api/admin/notifications/{id}
pub async fn delete_notification(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ClientMeta(meta): ClientMeta,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    notification::admin_delete_notification(&state.db, &admin.id, id, &meta).await?;
    Ok(Json(json!({ "success": true })))
}
