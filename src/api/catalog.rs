//! Public product reads

use super::{AppState, Json, OptionalUser, Path, Query};
use crate::{
    core::{category, product, product::ProductDetails},
    entities::{CategoryModel, ProductModel},
    errors::Result,
};
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

/// GET /api/products/best
pub async fn best_products(State(state): State<AppState>) -> Result<Json<Vec<ProductModel>>> {
    Ok(Json(product::best_products(&state.db).await?))
}

/// GET /api/products/search?q=
pub async fn search_products(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<ProductModel>>> {
    Ok(Json(product::search_products(&state.db, &params.q).await?))
}

/// GET /api/products/highest-id
pub async fn highest_product_id(State(state): State<AppState>) -> Result<Json<Value>> {
    let id = product::highest_product_id(&state.db).await?;
    Ok(Json(json!({ "id": id })))
}

/// GET /api/products/{id}
pub async fn product_by_id(
    State(state): State<AppState>,
    OptionalUser(viewer): OptionalUser,
    Path(id): Path<i64>,
) -> Result<Json<ProductDetails>> {
    let viewer_id = viewer.as_ref().map(|u| u.id.as_str());
    let details = product::product_details(&state.db, &state.media, id, viewer_id).await?;
    Ok(Json(details))
}

/// GET /api/categories
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<CategoryModel>>> {
    Ok(Json(category::list_categories(&state.db).await?))
}
