//! Signed-in customer: details, wishlist, notifications and orders

use super::{AppState, ClientMeta, CurrentUser, Json, Path, Query};
use crate::{
    core::{
        notification::{self, Inbox, InboxQuery},
        order,
        user::{self, DetailsInput},
        wishlist::{self, WishlistToggle},
    },
    entities::{OrderModel, ProductModel, UserModel},
    errors::Result,
};
use axum::extract::State;
use serde_json::{Value, json};

/// PUT /api/account/details
pub async fn set_details(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ClientMeta(meta): ClientMeta,
    Json(body): Json<DetailsInput>,
) -> Result<Json<UserModel>> {
    Ok(Json(user::set_details(&state.db, &caller.id, &body, &meta).await?))
}

/// GET /api/wishlist
pub async fn get_wishlist(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> Result<Json<Vec<ProductModel>>> {
    Ok(Json(wishlist::get_wishlist(&state.db, &caller.id).await?))
}

/// POST /api/wishlist/{product_id}/toggle
pub async fn toggle_wishlist(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(product_id): Path<i64>,
) -> Result<Json<WishlistToggle>> {
    Ok(Json(wishlist::toggle_wishlist(&state.db, &caller.id, product_id).await?))
}

/// GET /api/notifications
pub async fn notifications(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Query(query): Query<InboxQuery>,
) -> Result<Json<Inbox>> {
    Ok(Json(notification::list_notifications(&state.db, &caller.id, &query).await?))
}

/// POST /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    notification::mark_read(&state.db, &caller.id, id).await?;
    Ok(Json(json!({ "success": true })))
}

/// POST /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> Result<Json<Value>> {
    let updated = notification::mark_all_read(&state.db, &caller.id).await?;
    Ok(Json(json!({ "success": true, "updated": updated })))
}

/// DELETE /api/notifications/{id}
pub async fn delete_notification(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    notification::delete_own(&state.db, &caller.id, id).await?;
    Ok(Json(json!({ "success": true })))
}

/// GET /api/orders
pub async fn my_orders(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> Result<Json<Vec<OrderModel>>> {
    Ok(Json(order::my_orders(&state.db, &caller.id).await?))
}
