//! Admin order actions

use super::{AdminUser, AppState, Json, Path};
use crate::{core::order, entities::OrderModel, errors::Result};
use axum::extract::State;
use serde_json::{Value, json};

/// POST /api/orders/{id}/refund
pub async fn refund(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    let (updated, refund) = order::refund_order(&state.db, state.gateway.as_ref(), id).await?;
    tracing::info!(admin_id = %admin.id, order_id = id, "Refund issued from admin panel");
    Ok(Json(json!({ "order": updated, "refund": refund })))
}

/// POST /api/orders/{id}/cancel
pub async fn cancel(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<OrderModel>> {
    let updated = order::cancel_order(&state.db, id).await?;
    tracing::info!(admin_id = %admin.id, order_id = id, "Order cancelled from admin panel");
    Ok(Json(updated))
}
