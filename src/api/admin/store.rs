//! Admin store configuration: coupons, email templates and site settings

use crate::{
    api::{AdminUser, AppState, ClientMeta, Json, Path, Query},
    core::{
        coupon::{self, CouponInput, CouponPage, CouponView},
        email_template::{self, NewTemplate, TemplateKind, TemplatePatch},
        settings::{self, SiteSettings},
    },
    entities::EmailTemplateModel,
    errors::Result,
};
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CouponListParams {
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TemplateFilter {
    #[serde(rename = "type")]
    pub kind: Option<TemplateKind>,
}

/// GET /api/admin/coupons
pub async fn list_coupons(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<CouponListParams>,
) -> Result<Json<CouponPage>> {
    Ok(Json(coupon::list_coupons(state.gateway.as_ref(), params.limit).await?))
}

/// POST /api/admin/coupons
pub async fn create_coupon(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ClientMeta(meta): ClientMeta,
    Json(input): Json<CouponInput>,
) -> Result<Json<CouponView>> {
    let created = coupon::create_coupon(&state.db, state.gateway.as_ref(), &admin.id, input, &meta).await?;
    Ok(Json(created))
}

/// DELETE /api/admin/coupons/{id}
pub async fn delete_coupon(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ClientMeta(meta): ClientMeta,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    coupon::delete_coupon(&state.db, state.gateway.as_ref(), &admin.id, &id, &meta).await?;
    Ok(Json(json!({ "success": true })))
}

/// GET /api/admin/email-templates
pub async fn list_templates(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(filter): Query<TemplateFilter>,
) -> Result<Json<Vec<EmailTemplateModel>>> {
    Ok(Json(email_template::list_templates(&state.db, filter.kind).await?))
}

/// GET /api/admin/email-templates/{id}
pub async fn get_template(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<EmailTemplateModel>> {
    Ok(Json(email_template::get_template(&state.db, id).await?))
}

/// POST /api/admin/email-templates
pub async fn create_template(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ClientMeta(meta): ClientMeta,
    Json(new): Json<NewTemplate>,
) -> Result<Json<EmailTemplateModel>> {
    Ok(Json(email_template::create_template(&state.db, &admin.id, new, &meta).await?))
}

/// PATCH /api/admin/email-templates/{id}
pub async fn update_template(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ClientMeta(meta): ClientMeta,
    Path(id): Path<i64>,
    Json(patch): Json<TemplatePatch>,
) -> Result<Json<EmailTemplateModel>> {
    Ok(Json(email_template::update_template(&state.db, &admin.id, id, patch, &meta).await?))
}

/// DELETE /api/admin/email-templates/{id}
pub async fn delete_template(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ClientMeta(meta): ClientMeta,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    email_template::delete_template(&state.db, &admin.id, id, &meta).await?;
    Ok(Json(json!({ "success": true })))
}

/// GET /api/admin/settings
pub async fn get_settings(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<SiteSettings>> {
    Ok(Json(settings::get_settings(&state.db).await?))
}

/// PUT /api/admin/settings
pub async fn update_settings(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ClientMeta(meta): ClientMeta,
    Json(body): Json<SiteSettings>,
) -> Result<Json<SiteSettings>> {
    Ok(Json(settings::update_settings(&state.db, &admin.id, body, &meta).await?))
}
