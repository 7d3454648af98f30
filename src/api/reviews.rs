//! Customer reviews

use super::{AppState, CurrentUser, Json, Path};
use crate::{
    core::review::{self, ReviewSummary},
    errors::Result,
};
use axum::extract::State;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub product_id: i64,
    pub rating: i32,
}

#[derive(Debug, Deserialize)]
pub struct Rating {
    pub rating: i32,
}

/// POST /api/reviews
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<NewReview>,
) -> Result<Json<ReviewSummary>> {
    let summary = review::create_review(&state.db, &user.id, body.product_id, body.rating).await?;
    Ok(Json(summary))
}

/// PUT /api/reviews/{product_id}
pub async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<i64>,
    Json(body): Json<Rating>,
) -> Result<Json<ReviewSummary>> {
    let summary = review::update_review(&state.db, &user.id, product_id, body.rating).await?;
    Ok(Json(summary))
}

/// DELETE /api/reviews/{product_id}
pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<i64>,
) -> Result<Json<ReviewSummary>> {
    Ok(Json(review::delete_review(&state.db, &user.id, product_id).await?))
}
