//! Admin dashboard figures, reports and the security log

use crate::{
    api::{AdminUser, AppState, ClientMeta, Json, Path, Query},
    core::{
        Page,
        analytics::{self, Analytics, DateRange},
        report::{self, ProductReport, SalesReport},
        security_log::{self, LogEntry, LogQuery},
    },
    errors::Result,
};
use axum::extract::State;
use serde_json::{Value, json};

/// GET /api/admin/analytics?startDate=&endDate=
pub async fn analytics(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(range): Query<DateRange>,
) -> Result<Json<Analytics>> {
    Ok(Json(analytics::analytics(&state.db, state.gateway.as_ref(), &range).await?))
}

/// GET /api/admin/reports/sales
pub async fn sales_report(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<SalesReport>> {
    Ok(Json(report::sales_report(&state.db, state.gateway.as_ref()).await?))
}

/// GET /api/admin/reports/products
pub async fn product_report(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<ProductReport>> {
    Ok(Json(report::product_report(&state.db).await?))
}

/// GET /api/admin/logs
pub async fn list_logs(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<LogQuery>,
) -> Result<Json<Page<LogEntry>>> {
    Ok(Json(security_log::list_logs(&state.db, &query).await?))
}

/// DELETE /api/admin/logs/{id}
pub async fn delete_log(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ClientMeta(meta): ClientMeta,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    security_log::delete_log(&state.db, &admin.id, id, &meta).await?;
    Ok(Json(json!({ "success": true })))
}
