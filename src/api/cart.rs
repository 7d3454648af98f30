//! Customer cart and hosted checkout

use super::{AppState, ClientMeta, CurrentUser, Json, Path};
use crate::{
    core::{
        cart::{self, CartAdjustment, CartLine, CartMutation},
        checkout,
    },
    errors::Result,
};
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItem {
    pub product_id: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdjustItem {
    pub increment: bool,
    pub decrement: bool,
}

/// GET /api/cart
pub async fn get_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<CartLine>>> {
    Ok(Json(cart::get_cart(&state.db, &user.id).await?))
}

/// POST /api/cart/items
pub async fn add_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ClientMeta(meta): ClientMeta,
    Json(body): Json<AddItem>,
) -> Result<Json<CartMutation>> {
    let result = cart::add_to_cart(&state.db, &user.id, body.product_id, &meta).await?;
    Ok(Json(result))
}

/// PATCH /api/cart/items/{product_id}
pub async fn adjust_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ClientMeta(meta): ClientMeta,
    Path(product_id): Path<i64>,
    Json(body): Json<AdjustItem>,
) -> Result<Json<Vec<CartLine>>> {
    let adjustment = CartAdjustment::from_flags(body.increment, body.decrement)?;
    let lines = cart::update_cart_item(&state.db, &user.id, product_id, adjustment, &meta).await?;
    Ok(Json(lines))
}

/// DELETE /api/cart/items/{product_id}
pub async fn remove_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ClientMeta(meta): ClientMeta,
    Path(product_id): Path<i64>,
) -> Result<Json<Vec<CartLine>>> {
    let lines = cart::remove_from_cart(&state.db, &user.id, product_id, &meta).await?;
    Ok(Json(lines))
}

/// POST /api/cart/checkout
pub async fn checkout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ClientMeta(meta): ClientMeta,
) -> Result<Json<Value>> {
    let url = checkout::checkout_cart(
        &state.db,
        state.gateway.as_ref(),
        &state.config.store,
        &state.media,
        &user,
        &meta,
    )
    .await?;
    Ok(Json(json!({ "url": url })))
}
